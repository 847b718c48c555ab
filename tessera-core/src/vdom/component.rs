//! Component Registration
//!
//! Components are identified by an opaque [`ComponentId`] assigned when they
//! are defined, never by comparing closures. The reconciler reuses a component
//! VNode only if the new node names the same id (and key).
//!
//! Whether a render function may suspend is part of the registration
//! ([`RenderMode`]); synchronous render paths reject `MayBeAsync` components up
//! front instead of inspecting what the function returned.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::node::{ComponentNode, Node};
use super::props::Props;
use crate::error::Result;
use crate::render::RenderContext;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type SyncRender = Arc<dyn Fn(&RenderContext, &Props) -> Result<Node> + Send + Sync>;
type AsyncRender = Arc<dyn Fn(RenderContext, Props) -> BoxFuture<'static, Result<Node>> + Send + Sync>;

/// Stable identifier of a component definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Whether a component's render function may suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    SyncOnly,
    MayBeAsync,
}

#[derive(Clone)]
pub(crate) enum RenderFn {
    Sync(SyncRender),
    Async(AsyncRender),
}

struct ComponentDef {
    id: ComponentId,
    name: String,
    render: RenderFn,
    island: Option<Arc<str>>,
}

/// A component definition.
#[derive(Clone)]
pub struct Component(Arc<ComponentDef>);

impl Component {
    /// Define a synchronous component.
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&RenderContext, &Props) -> Result<Node> + Send + Sync + 'static,
    {
        Self::define(name.into(), RenderFn::Sync(Arc::new(render)), None)
    }

    /// Define a component whose render function may suspend.
    ///
    /// Such components can only be created by the asynchronous server render.
    pub fn new_async<F, Fut>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(RenderContext, Props) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Node>> + Send + 'static,
    {
        let boxed: AsyncRender = Arc::new(
            move |cx: RenderContext, props: Props| -> BoxFuture<'static, Result<Node>> {
                Box::pin(render(cx, props))
            },
        );
        Self::define(name.into(), RenderFn::Async(boxed), None)
    }

    fn define(name: String, render: RenderFn, island: Option<Arc<str>>) -> Self {
        Self(Arc::new(ComponentDef {
            id: ComponentId::new(),
            name,
            render,
            island,
        }))
    }

    pub fn id(&self) -> ComponentId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn mode(&self) -> RenderMode {
        match self.0.render {
            RenderFn::Sync(_) => RenderMode::SyncOnly,
            RenderFn::Async(_) => RenderMode::MayBeAsync,
        }
    }

    /// Source path of an island component.
    pub fn island(&self) -> Option<&str> {
        self.0.island.as_deref()
    }

    /// A node invoking this component without props.
    pub fn node(&self) -> ComponentNode {
        ComponentNode::new(self.clone())
    }

    pub fn with_props(&self, props: Props) -> ComponentNode {
        ComponentNode::new(self.clone()).props(props)
    }

    pub(crate) fn render_fn(&self) -> &RenderFn {
        &self.0.render
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("mode", &self.mode())
            .field("island", &self.0.island)
            .finish()
    }
}

#[derive(Default)]
struct RegistryInner {
    by_id: DashMap<ComponentId, Component>,
    islands: DashMap<String, Component>,
}

/// Table of known components, shared by every render of an application.
///
/// Island components are additionally indexed by their source path so the
/// hydration walker can find them from the island manifest.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    inner: Arc<RegistryInner>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define and register a synchronous component.
    pub fn register<F>(&self, name: impl Into<String>, render: F) -> Component
    where
        F: Fn(&RenderContext, &Props) -> Result<Node> + Send + Sync + 'static,
    {
        self.insert(Component::new(name, render))
    }

    /// Define and register a component that may suspend.
    pub fn register_async<F, Fut>(&self, name: impl Into<String>, render: F) -> Component
    where
        F: Fn(RenderContext, Props) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Node>> + Send + 'static,
    {
        self.insert(Component::new_async(name, render))
    }

    /// Define and register a client-hydratable component.
    ///
    /// Islands are always synchronous: they re-render on the client.
    pub fn register_island<F>(&self, source_path: impl Into<String>, render: F) -> Component
    where
        F: Fn(&RenderContext, &Props) -> Result<Node> + Send + Sync + 'static,
    {
        let source_path = source_path.into();
        let component = Component::define(
            source_path.clone(),
            RenderFn::Sync(Arc::new(render)),
            Some(Arc::from(source_path.as_str())),
        );
        if self.inner.islands.contains_key(&source_path) {
            tracing::warn!(source_path = %source_path, "island registered twice; replacing");
        }
        self.inner.islands.insert(source_path, component.clone());
        self.insert(component)
    }

    /// Register an already defined component.
    pub fn insert(&self, component: Component) -> Component {
        self.inner.by_id.insert(component.id(), component.clone());
        component
    }

    pub fn get(&self, id: ComponentId) -> Option<Component> {
        self.inner.by_id.get(&id).map(|entry| entry.value().clone())
    }

    /// Island component registered under `source_path`.
    pub fn island(&self, source_path: &str) -> Option<Component> {
        self.inner
            .islands
            .get(source_path)
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.by_id.is_empty()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.inner.by_id.len())
            .field("islands", &self.inner.islands.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_and_distinct() {
        let a = Component::new("A", |_, _| Ok(Node::Empty));
        let b = Component::new("A", |_, _| Ok(Node::Empty));

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.mode(), RenderMode::SyncOnly);
    }

    #[test]
    fn registry_indexes_islands_by_path() {
        let registry = ComponentRegistry::new();
        let counter = registry.register_island("islands/counter.rs", |_, _| Ok(Node::Empty));
        registry.register("Plain", |_, _| Ok(Node::Empty));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.island("islands/counter.rs"), Some(counter.clone()));
        assert_eq!(counter.island(), Some("islands/counter.rs"));
        assert_eq!(registry.get(counter.id()), Some(counter));
        assert!(registry.island("missing").is_none());
    }

    #[test]
    fn async_components_report_their_mode() {
        let registry = ComponentRegistry::new();
        let slow = registry.register_async("Slow", |_, _| async { Ok(Node::Empty) });
        assert_eq!(slow.mode(), RenderMode::MayBeAsync);
    }
}
