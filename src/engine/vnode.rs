//! VNode - Virtual node trees produced by render functions.
//!
//! Render functions return a [`VNode`]; the renderer turns it into document
//! nodes and component instances. Slots are render functions that receive
//! scoped-slot props and return nodes.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::component::Component;
use crate::types::{PropsMap, Value};

// =============================================================================
// Slots
// =============================================================================

/// A slot render function. Receives the scoped-slot props.
pub type SlotFn = Rc<dyn Fn(&PropsMap) -> Vec<VNode>>;

/// Slot name → render function.
#[derive(Clone, Default)]
pub struct Slots {
    slots: IndexMap<String, SlotFn>,
}

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Slots::insert`].
    pub fn with(mut self, name: impl Into<String>, slot: impl Fn(&PropsMap) -> Vec<VNode> + 'static) -> Self {
        self.insert(name, Rc::new(slot));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, slot: SlotFn) {
        self.slots.insert(name.into(), slot);
    }

    pub fn get(&self, name: &str) -> Option<&SlotFn> {
        self.slots.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Render a slot. Missing slots render nothing.
    pub fn render(&self, name: &str, props: &PropsMap) -> Vec<VNode> {
        self.slots.get(name).map(|slot| slot(props)).unwrap_or_default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for Slots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.slots.keys()).finish()
    }
}

// =============================================================================
// Nodes
// =============================================================================

/// A directive applied to an element (`v-focus`, `v-color:bg="'red'"`).
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveUse {
    pub name: String,
    pub arg: Option<String>,
    pub value: Value,
}

/// A plain element. If its tag names a registered component, the renderer
/// mounts that component instead, with `attrs` as props and `children` as
/// the default slot.
#[derive(Debug, Clone, Default)]
pub struct ElementVNode {
    pub tag: String,
    pub attrs: PropsMap,
    pub directives: Vec<DirectiveUse>,
    pub children: Vec<VNode>,
    /// `<template #name>` children, only meaningful when the tag is a component.
    pub named_slots: IndexMap<String, Vec<VNode>>,
}

impl ElementVNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(VNode::Text(text.into()))
    }

    pub fn directive(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.directives.push(DirectiveUse {
            name: name.into(),
            arg: None,
            value: value.into(),
        });
        self
    }
}

/// A component to mount.
#[derive(Debug, Clone)]
pub struct ComponentVNode {
    pub component: Component,
    pub props: PropsMap,
    pub slots: Slots,
    /// Register the mounted instance in the parent's refs under this key.
    /// A string `"ref"` prop is treated the same way.
    pub ref_key: Option<String>,
    /// The registry name the component was resolved through, if any.
    pub registered_as: Option<String>,
}

impl ComponentVNode {
    pub fn new(component: impl Into<Component>) -> Self {
        Self {
            component: component.into(),
            props: PropsMap::new(),
            slots: Slots::default(),
            ref_key: None,
            registered_as: None,
        }
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn props(mut self, props: PropsMap) -> Self {
        self.props.extend(props);
        self
    }

    pub fn slot(mut self, name: impl Into<String>, slot: impl Fn(&PropsMap) -> Vec<VNode> + 'static) -> Self {
        self.slots.insert(name, Rc::new(slot));
        self
    }

    pub fn slots(mut self, slots: Slots) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_ref(mut self, key: impl Into<String>) -> Self {
        self.ref_key = Some(key.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub enum VNode {
    /// Renders as an empty comment anchor.
    #[default]
    Empty,
    Text(String),
    Element(ElementVNode),
    Component(ComponentVNode),
    Fragment(Vec<VNode>),
}

impl VNode {
    pub fn element(tag: impl Into<String>) -> ElementVNode {
        ElementVNode::new(tag)
    }

    pub fn component(component: impl Into<Component>) -> ComponentVNode {
        ComponentVNode::new(component)
    }

    pub fn text(text: impl Into<String>) -> Self {
        VNode::Text(text.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, VNode::Empty)
    }
}

/// Shorthand for [`VNode::element`].
pub fn h(tag: impl Into<String>) -> ElementVNode {
    ElementVNode::new(tag)
}

impl From<ElementVNode> for VNode {
    fn from(value: ElementVNode) -> Self {
        VNode::Element(value)
    }
}

impl From<ComponentVNode> for VNode {
    fn from(value: ComponentVNode) -> Self {
        VNode::Component(value)
    }
}

impl From<&str> for VNode {
    fn from(value: &str) -> Self {
        VNode::Text(value.to_string())
    }
}

impl From<String> for VNode {
    fn from(value: String) -> Self {
        VNode::Text(value)
    }
}

impl From<Vec<VNode>> for VNode {
    fn from(value: Vec<VNode>) -> Self {
        VNode::Fragment(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_builder() {
        let node: VNode = h("div").attr("id", "x").text("hi").child(h("br")).into();
        let VNode::Element(element) = node else {
            panic!("expected element");
        };
        assert_eq!(element.tag, "div");
        assert_eq!(element.attrs.get("id"), Some(&Value::from("x")));
        assert_eq!(element.children.len(), 2);
    }

    #[test]
    fn test_missing_slot_renders_nothing() {
        let slots = Slots::new().with("default", |_| vec![VNode::text("a")]);
        assert_eq!(slots.render("default", &PropsMap::new()).len(), 1);
        assert!(slots.render("footer", &PropsMap::new()).is_empty());
        assert_eq!(slots.names().collect::<Vec<_>>(), vec!["default"]);
    }

    #[test]
    fn test_scoped_slot_receives_props() {
        let slots = Slots::new().with("item", |props| {
            vec![VNode::text(props.get("label").map(|v| v.to_string()).unwrap_or_default())]
        });
        let rendered = slots.render("item", &crate::props! { "label" => "first" });
        assert!(matches!(&rendered[0], VNode::Text(t) if t == "first"));
    }
}
