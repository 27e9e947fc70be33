//! Component - Definitions the renderer can instantiate.
//!
//! A [`Component`] is either an options definition (props, data, render,
//! mixins, hooks, local registrations, provides) or a functional component
//! (a bare render function without an instance). Identity is pointer
//! identity: two clones of the same `Component` are the same component.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::dom::{Document, NodeId};
use super::instance::{Instance, RenderContext};
use super::template;
use super::vnode::{Slots, VNode};
use crate::error::TemplateError;
use crate::types::{InjectionKey, PropsMap, Value};

pub type RenderFn = Rc<dyn Fn(&RenderContext<'_>) -> VNode>;
pub type FunctionalRenderFn = Rc<dyn Fn(&PropsMap, &Slots) -> VNode>;
pub type DataFn = Rc<dyn Fn() -> PropsMap>;
pub type HookFn = Rc<dyn Fn(&mut Instance)>;
pub type DirectiveHook = Rc<dyn Fn(&mut Document, NodeId, &DirectiveBinding)>;

// =============================================================================
// Hooks and mixins
// =============================================================================

/// Lifecycle hooks. `before_create` runs before data is initialized,
/// `created` after; `mounted` runs once the nodes are in the document.
#[derive(Clone, Default)]
pub struct Hooks {
    pub before_create: Option<HookFn>,
    pub created: Option<HookFn>,
    pub mounted: Option<HookFn>,
    pub unmounted: Option<HookFn>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_create", &self.before_create.is_some())
            .field("created", &self.created.is_some())
            .field("mounted", &self.mounted.is_some())
            .field("unmounted", &self.unmounted.is_some())
            .finish()
    }
}

/// Reusable data and hooks merged into a component. App mixins run before
/// component mixins, which run before the component's own hooks.
#[derive(Clone, Default)]
pub struct Mixin {
    pub name: Option<String>,
    pub data: Option<DataFn>,
    pub hooks: Hooks,
}

impl fmt::Debug for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mixin")
            .field("name", &self.name)
            .field("data", &self.data.is_some())
            .field("hooks", &self.hooks)
            .finish()
    }
}

impl Mixin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn data(mut self, data: impl Fn() -> PropsMap + 'static) -> Self {
        self.data = Some(Rc::new(data));
        self
    }

    pub fn before_create(mut self, hook: impl Fn(&mut Instance) + 'static) -> Self {
        self.hooks.before_create = Some(Rc::new(hook));
        self
    }

    pub fn created(mut self, hook: impl Fn(&mut Instance) + 'static) -> Self {
        self.hooks.created = Some(Rc::new(hook));
        self
    }

    pub fn mounted(mut self, hook: impl Fn(&mut Instance) + 'static) -> Self {
        self.hooks.mounted = Some(Rc::new(hook));
        self
    }

    pub fn unmounted(mut self, hook: impl Fn(&mut Instance) + 'static) -> Self {
        self.hooks.unmounted = Some(Rc::new(hook));
        self
    }
}

// =============================================================================
// Options components
// =============================================================================

#[derive(Clone, Default)]
pub struct ComponentOptions {
    pub name: Option<String>,
    /// Declared prop names. Anything else passed in lands in attrs.
    pub props: Vec<String>,
    pub emits: Vec<String>,
    pub data: Option<DataFn>,
    pub render: Option<RenderFn>,
    pub mixins: Vec<Mixin>,
    /// Locally registered child components.
    pub components: IndexMap<String, Component>,
    /// Values provided to descendants.
    pub provide: IndexMap<InjectionKey, Value>,
    pub hooks: Hooks,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn prop(mut self, name: impl Into<String>) -> Self {
        self.props.push(name.into());
        self
    }

    pub fn props<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.props.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn emits(mut self, event: impl Into<String>) -> Self {
        self.emits.push(event.into());
        self
    }

    pub fn data(mut self, data: impl Fn() -> PropsMap + 'static) -> Self {
        self.data = Some(Rc::new(data));
        self
    }

    pub fn render(mut self, render: impl Fn(&RenderContext<'_>) -> VNode + 'static) -> Self {
        self.render = Some(Rc::new(render));
        self
    }

    /// Compile template markup into the render function.
    pub fn with_template(mut self, markup: &str) -> Result<Self, TemplateError> {
        let compiled = template::compile(markup)?;
        self.render = Some(compiled.into_render_fn());
        Ok(self)
    }

    pub fn mixin(mut self, mixin: Mixin) -> Self {
        self.mixins.push(mixin);
        self
    }

    pub fn component(mut self, name: impl Into<String>, component: impl Into<Component>) -> Self {
        self.components.insert(name.into(), component.into());
        self
    }

    pub fn provide(mut self, key: impl Into<InjectionKey>, value: impl Into<Value>) -> Self {
        self.provide.insert(key.into(), value.into());
        self
    }

    pub fn before_create(mut self, hook: impl Fn(&mut Instance) + 'static) -> Self {
        self.hooks.before_create = Some(Rc::new(hook));
        self
    }

    pub fn created(mut self, hook: impl Fn(&mut Instance) + 'static) -> Self {
        self.hooks.created = Some(Rc::new(hook));
        self
    }

    pub fn mounted(mut self, hook: impl Fn(&mut Instance) + 'static) -> Self {
        self.hooks.mounted = Some(Rc::new(hook));
        self
    }

    pub fn unmounted(mut self, hook: impl Fn(&mut Instance) + 'static) -> Self {
        self.hooks.unmounted = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("name", &self.name)
            .field("props", &self.props)
            .field("emits", &self.emits)
            .field("has_render", &self.render.is_some())
            .field("mixins", &self.mixins.len())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks)
            .finish()
    }
}

// =============================================================================
// Functional components
// =============================================================================

/// A render function without an instance, state or hooks.
#[derive(Clone)]
pub struct FunctionalComponent {
    name: Option<String>,
    render: FunctionalRenderFn,
}

impl FunctionalComponent {
    pub fn new(render: impl Fn(&PropsMap, &Slots) -> VNode + 'static) -> Self {
        Self {
            name: None,
            render: Rc::new(render),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn render(&self, props: &PropsMap, slots: &Slots) -> VNode {
        (self.render)(props, slots)
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.render), Rc::as_ptr(&other.render))
    }
}

// =============================================================================
// Component
// =============================================================================

#[derive(Clone)]
pub enum Component {
    Options(Rc<ComponentOptions>),
    Functional(FunctionalComponent),
}

impl Component {
    /// Same definition, not structural equality.
    pub fn ptr_eq(&self, other: &Component) -> bool {
        match (self, other) {
            (Component::Options(a), Component::Options(b)) => Rc::ptr_eq(a, b),
            (Component::Functional(a), Component::Functional(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Component::Options(options) => options.name.as_deref(),
            Component::Functional(functional) => functional.name(),
        }
    }

    pub fn is_functional(&self) -> bool {
        matches!(self, Component::Functional(_))
    }

    pub fn options(&self) -> Option<&ComponentOptions> {
        match self {
            Component::Options(options) => Some(options),
            Component::Functional(_) => None,
        }
    }

    /// Declared prop names; functional components declare none.
    pub fn declared_props(&self) -> &[String] {
        match self {
            Component::Options(options) => &options.props,
            Component::Functional(_) => &[],
        }
    }

    pub fn local_components(&self) -> Option<&IndexMap<String, Component>> {
        self.options().map(|options| &options.components)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Options(options) => f
                .debug_tuple("Component::Options")
                .field(&options.name)
                .finish(),
            Component::Functional(functional) => f
                .debug_tuple("Component::Functional")
                .field(&functional.name)
                .finish(),
        }
    }
}

impl From<ComponentOptions> for Component {
    fn from(value: ComponentOptions) -> Self {
        Component::Options(Rc::new(value))
    }
}

impl From<Rc<ComponentOptions>> for Component {
    fn from(value: Rc<ComponentOptions>) -> Self {
        Component::Options(value)
    }
}

impl From<FunctionalComponent> for Component {
    fn from(value: FunctionalComponent) -> Self {
        Component::Functional(value)
    }
}

// =============================================================================
// Directives
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveBinding {
    pub value: Value,
    pub arg: Option<String>,
}

/// Custom element directive. `mounted` runs once the element is built.
#[derive(Clone, Default)]
pub struct Directive {
    pub mounted: Option<DirectiveHook>,
}

impl Directive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mounted(mut self, hook: impl Fn(&mut Document, NodeId, &DirectiveBinding) + 'static) -> Self {
        self.mounted = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("mounted", &self.mounted.is_some())
            .finish()
    }
}

// =============================================================================
// Names
// =============================================================================

/// Case-insensitive form shared by kebab-case and PascalCase names:
/// `my-child`, `MyChild` and `my_child` all normalize to `mychild`.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// `MyChild` → `my-child`. Already-kebab names pass through.
pub fn to_kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(c.to_lowercase());
        } else if c == '_' {
            out.push('-');
        } else {
            out.push(c);
        }
    }
    out
}

/// Find a registration by any spelling of its name.
pub fn find_registered<'a>(
    registry: &'a IndexMap<String, Component>,
    name: &str,
) -> Option<(&'a String, &'a Component)> {
    if let Some(entry) = registry.get_key_value(name) {
        return Some(entry);
    }
    let wanted = normalize_name(name);
    registry
        .iter()
        .find(|(registered, _)| normalize_name(registered) == wanted)
}
