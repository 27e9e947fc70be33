//! Stub substitution.
//!
//! Installs a vnode transform that swaps matching components for inert
//! placeholders. A placeholder renders `<{kebab-name}-stub>` with a
//! `data-stub` attribute, the props it received as attributes, and its
//! default slot content inside.
//!
//! Stubs are cached per original component, so a placeholder keeps its
//! instance across re-renders.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::constants::MOUNT_PARENT_NAME;
use crate::engine::component::{normalize_name, to_kebab_case};
use crate::engine::{h, Component, ComponentOptions, ComponentVNode, Instance, VNodeTransform};
use crate::types::PropsMap;

#[derive(Debug, Clone)]
pub enum StubKey {
    /// Matches any spelling of a registered or declared name.
    Name(String),
    /// Matches one definition by identity.
    Component(Component),
}

impl StubKey {
    fn same_key(&self, other: &StubKey) -> bool {
        match (self, other) {
            (StubKey::Name(a), StubKey::Name(b)) => normalize_name(a) == normalize_name(b),
            (StubKey::Component(a), StubKey::Component(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<&str> for StubKey {
    fn from(value: &str) -> Self {
        StubKey::Name(value.to_string())
    }
}

impl From<String> for StubKey {
    fn from(value: String) -> Self {
        StubKey::Name(value)
    }
}

impl From<Component> for StubKey {
    fn from(value: Component) -> Self {
        StubKey::Component(value)
    }
}

#[derive(Debug, Clone)]
pub enum StubValue {
    /// Render a generated placeholder.
    Stub,
    /// Render this definition instead.
    Replace(Component),
    /// Never stub, even when mounting shallow.
    Keep,
}

/// Ordered stub entries. Inserting an existing key replaces its value.
#[derive(Debug, Clone, Default)]
pub struct Stubs {
    entries: Vec<(StubKey, StubValue)>,
}

impl Stubs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<StubKey>, value: StubValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| existing.same_key(&key)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// `other`'s entries win.
    pub fn merged(&self, other: &Stubs) -> Stubs {
        let mut merged = self.clone();
        for (key, value) in &other.entries {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(StubKey, StubValue)> {
        self.entries.iter()
    }

    fn lookup(&self, component: &Component, names: &[String]) -> Option<&StubValue> {
        let normalized: Vec<String> = names.iter().map(|name| normalize_name(name)).collect();
        self.entries
            .iter()
            .find(|(key, _)| match key {
                StubKey::Component(stubbed) => stubbed.ptr_eq(component),
                StubKey::Name(name) => normalized.contains(&normalize_name(name)),
            })
            .map(|(_, value)| value)
    }
}

// =============================================================================
// Transform
// =============================================================================

/// Leaves every vnode alone.
pub fn passthrough_transform() -> VNodeTransform {
    Rc::new(|vnode: ComponentVNode, _: &Instance| vnode)
}

/// Every name a component vnode is known by: the alias it was resolved
/// through, its own name, and any registration pointing at it.
fn names_of(vnode: &ComponentVNode, parent: &Instance, globals: &IndexMap<String, Component>) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(alias) = &vnode.registered_as {
        names.push(alias.clone());
    }
    if let Some(name) = vnode.component.name() {
        names.push(name.to_string());
    }
    let locals = parent.component().local_components();
    for registry in locals.into_iter().chain(std::iter::once(globals)) {
        for (alias, component) in registry {
            if component.ptr_eq(&vnode.component) {
                names.push(alias.clone());
            }
        }
    }
    names
}

/// Build the stub transform.
///
/// `globals` are the globally registered components, used to find aliases.
/// With `shallow`, every component below the component under test is
/// stubbed unless an entry says otherwise.
pub fn stub_components(stubs: Stubs, shallow: bool, globals: IndexMap<String, Component>) -> VNodeTransform {
    let cache: Rc<RefCell<Vec<(Component, Component)>>> = Rc::default();

    Rc::new(move |mut vnode: ComponentVNode, parent: &Instance| {
        if parent.name() == Some(MOUNT_PARENT_NAME) {
            return vnode;
        }

        let names = names_of(&vnode, parent, &globals);
        let stub = match stubs.lookup(&vnode.component, &names) {
            Some(StubValue::Keep) => false,
            Some(StubValue::Replace(replacement)) => {
                vnode.component = replacement.clone();
                return vnode;
            }
            Some(StubValue::Stub) => true,
            None => shallow,
        };
        if !stub {
            return vnode;
        }

        let cached = cache
            .borrow()
            .iter()
            .find(|(original, _)| original.ptr_eq(&vnode.component))
            .map(|(_, stub)| stub.clone());
        let placeholder = match cached {
            Some(placeholder) => placeholder,
            None => {
                let label = names.first().cloned();
                let placeholder = create_stub(label.as_deref(), &vnode.component);
                cache
                    .borrow_mut()
                    .push((vnode.component.clone(), placeholder.clone()));
                log::trace!("stubbing {}", label.as_deref().unwrap_or("anonymous component"));
                placeholder
            }
        };
        vnode.component = placeholder;
        vnode
    })
}

/// Placeholder for `original`, declaring the same props.
pub fn create_stub(name: Option<&str>, original: &Component) -> Component {
    let tag = match name {
        Some(name) => format!("{}-stub", to_kebab_case(name)),
        None => "anonymous-stub".to_string(),
    };
    let label = name.unwrap_or("anonymous").to_string();

    let mut stub = ComponentOptions::new().render(move |ctx| {
        let mut element = h(tag.as_str()).attr("data-stub", label.as_str());
        for (key, value) in ctx.props() {
            element.attrs.insert(key.clone(), value.clone());
        }
        element
            .children(ctx.slot("default", &PropsMap::new()))
            .into()
    });
    stub.name = original.name().map(str::to_string);
    stub.props = original.declared_props().to_vec();
    stub.into()
}

impl fmt::Display for StubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StubKey::Name(name) => f.write_str(name),
            StubKey::Component(component) => write!(f, "{}", component.name().unwrap_or("anonymous")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::component::FunctionalComponent;
    use crate::engine::{Slots, VNode};

    fn instance_named(name: &str) -> Instance {
        let component: Component = ComponentOptions::named(name).into();
        Instance::new(0, component, PropsMap::new(), Slots::default(), Rc::default(), None)
    }

    #[test]
    fn test_insert_replaces_same_key() {
        let mut stubs = Stubs::new();
        stubs.insert("my-child", StubValue::Stub);
        stubs.insert("MyChild", StubValue::Keep);
        assert_eq!(stubs.len(), 1);
        assert!(matches!(stubs.iter().next(), Some((_, StubValue::Keep))));
    }

    #[test]
    fn test_children_of_mount_parent_are_never_stubbed() {
        let transform = stub_components(Stubs::new(), true, IndexMap::new());
        let target: Component = ComponentOptions::named("Target").into();
        let out = transform(ComponentVNode::new(target.clone()), &instance_named(MOUNT_PARENT_NAME));
        assert!(out.component.ptr_eq(&target));
    }

    #[test]
    fn test_shallow_stubs_everything_below() {
        let transform = stub_components(Stubs::new(), true, IndexMap::new());
        let child: Component = ComponentOptions::named("Child").prop("msg").into();
        let parent = instance_named("Target");

        let first = transform(ComponentVNode::new(child.clone()), &parent);
        let second = transform(ComponentVNode::new(child.clone()), &parent);
        assert!(!first.component.ptr_eq(&child));
        assert!(first.component.ptr_eq(&second.component));
        assert_eq!(first.component.declared_props(), ["msg".to_string()]);
    }

    #[test]
    fn test_explicit_stub_matches_alias_and_identity() {
        let child: Component = ComponentOptions::named("Child").into();
        let other: Component = ComponentOptions::named("Other").into();
        let mut globals = IndexMap::new();
        globals.insert("fancy-child".to_string(), child.clone());

        let mut stubs = Stubs::new();
        stubs.insert("FancyChild", StubValue::Stub);
        stubs.insert(other.clone(), StubValue::Stub);
        let transform = stub_components(stubs, false, globals);
        let parent = instance_named("Target");

        assert!(!transform(ComponentVNode::new(child.clone()), &parent).component.ptr_eq(&child));
        assert!(!transform(ComponentVNode::new(other.clone()), &parent).component.ptr_eq(&other));

        let untouched: Component = ComponentOptions::named("Untouched").into();
        assert!(transform(ComponentVNode::new(untouched.clone()), &parent).component.ptr_eq(&untouched));
    }

    #[test]
    fn test_replace_and_keep() {
        let child: Component = ComponentOptions::named("Child").into();
        let kept: Component = ComponentOptions::named("Kept").into();
        let replacement: Component = ComponentOptions::named("Fake").into();

        let mut stubs = Stubs::new();
        stubs.insert("Child", StubValue::Replace(replacement.clone()));
        stubs.insert("Kept", StubValue::Keep);
        let transform = stub_components(stubs, true, IndexMap::new());
        let parent = instance_named("Target");

        assert!(transform(ComponentVNode::new(child), &parent).component.ptr_eq(&replacement));
        assert!(transform(ComponentVNode::new(kept.clone()), &parent).component.ptr_eq(&kept));
    }

    #[test]
    fn test_functional_components_are_stubbed_too() {
        let transform = stub_components(Stubs::new(), true, IndexMap::new());
        let functional: Component = FunctionalComponent::new(|_, _| VNode::Empty).into();
        let out = transform(ComponentVNode::new(functional.clone()), &instance_named("Target"));
        assert!(!out.component.is_functional());
    }

    #[test]
    fn test_stub_key_display() {
        assert_eq!(StubKey::from("Child").to_string(), "Child");
        let anonymous: Component = ComponentOptions::new().into();
        assert_eq!(StubKey::from(anonymous).to_string(), "anonymous");
    }
}
