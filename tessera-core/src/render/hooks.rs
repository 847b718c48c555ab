//! Hooks
//!
//! Hooks attach state and lifecycle callbacks to the component that is
//! currently rendering. They resolve that component through the render
//! context's scope stack, so calling one outside a render fails with
//! [`RenderError::MissingScope`].
//!
//! State hooks are matched to their previous values by call position: the
//! n-th hook call of a render gets the n-th slot of the component. Hooks must
//! therefore be called in the same order on every render.
//!
//! Lifecycle hooks (`on_mount`, `on_unmount`, `on_cleanup`) are only accepted
//! during the first render. Later registrations are ignored with a warning.

use std::any::Any;
use std::sync::Arc;

use super::context::RenderContext;
use crate::error::{RenderError, Result};
use crate::reactive::{Cleanup, ComputedSignal, Effect, Setter, WritableSignal};
use crate::vdom::{ComponentMode, VNode, VNodeKind};

#[derive(Clone, Copy)]
enum Lifecycle {
    Mount,
    Unmount,
    Cleanup,
}

impl RenderContext {
    /// A signal owned by the rendering component, kept across re-renders.
    pub fn signal<T>(&self, initial: T) -> Result<WritableSignal<T>>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let (signal, _) = self.hook_slot("signal", || WritableSignal::new(initial))?;
        Ok(signal)
    }

    /// The current value of a component-owned signal and its setter.
    ///
    /// Reading the value subscribes the component, so setting it re-renders.
    pub fn state<T>(&self, initial: T) -> Result<(T, Setter<T>)>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let (signal, _) = self.hook_slot("state", || WritableSignal::new(initial))?;
        Ok((signal.get(), Setter::new(signal)))
    }

    /// A computed signal owned by the rendering component.
    ///
    /// `compute` is only used on the first render.
    pub fn computed<T, F>(&self, compute: F) -> Result<ComputedSignal<T>>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let (computed, _) = self.hook_slot("computed", || ComputedSignal::new(compute))?;
        Ok(computed)
    }

    /// An effect owned by the rendering component, disposed with it.
    pub fn effect<F>(&self, run: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (effect, created) = self.hook_slot("effect", || Effect::new(run))?;
        if created {
            self.current_component("effect")?.add_cleanup(effect.disposer());
        }
        Ok(())
    }

    /// Run `f` once the component's nodes are attached to the live tree.
    pub fn on_mount<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.lifecycle("on_mount", Lifecycle::Mount, Cleanup::new(f))
    }

    /// Run `f` when the component is removed from the live tree.
    pub fn on_unmount<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.lifecycle("on_unmount", Lifecycle::Unmount, Cleanup::new(f))
    }

    /// Run `f` when the component is torn down, mounted or not.
    pub fn on_cleanup<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.lifecycle("on_cleanup", Lifecycle::Cleanup, Cleanup::new(f))
    }

    fn lifecycle(&self, hook: &'static str, which: Lifecycle, callback: Cleanup) -> Result<()> {
        // Later renders reach the same call again; only the first one counts.
        let ((), first) = self.hook_slot(hook, || ())?;
        if !first {
            return Ok(());
        }
        let vnode = self.current_component(hook)?;
        let mut guard = vnode.lock();
        let data = &mut *guard;
        let VNodeKind::Component(c) = &mut data.kind else {
            return Err(RenderError::MissingScope { hook });
        };
        if c.mode != ComponentMode::NotCreated {
            tracing::warn!(
                hook,
                component = c.component.name(),
                "lifecycle hook registered after the first render; ignored"
            );
            return Ok(());
        }

        match which {
            Lifecycle::Mount => c.on_mount.push(callback),
            Lifecycle::Unmount => c.on_unmount.push(callback),
            Lifecycle::Cleanup => data.cleanups.push(callback),
        }
        Ok(())
    }

    /// Resolve the next hook slot of the rendering component.
    ///
    /// Returns the stored value, or the result of `init` (stored for later
    /// renders) together with `true`.
    fn hook_slot<T, F>(&self, hook: &'static str, init: F) -> Result<(T, bool)>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let vnode = self.current_component(hook)?;
        let (index, existing) = {
            let mut data = vnode.lock();
            let VNodeKind::Component(c) = &mut data.kind else {
                return Err(RenderError::MissingScope { hook });
            };
            let index = c.slot_cursor;
            c.slot_cursor += 1;
            let existing = c
                .slots
                .get(index)
                .cloned()
                .and_then(|slot| slot.downcast::<T>().ok());
            (index, existing)
        };

        if let Some(value) = existing {
            return Ok(((*value).clone(), false));
        }

        // Runs without the node lock: initializers may run user code.
        let value = init();
        store_slot(&vnode, index, Arc::new(value.clone()));
        Ok((value, true))
    }
}

fn store_slot(vnode: &VNode, index: usize, value: Arc<dyn Any + Send + Sync>) {
    let mut data = vnode.lock();
    if let VNodeKind::Component(c) = &mut data.kind {
        if index < c.slots.len() {
            // A different hook at this position: hook order changed.
            tracing::warn!(index, component = c.component.name(), "hook slot type changed");
            c.slots[index] = value;
        } else {
            c.slots.push(value);
        }
    }
}
