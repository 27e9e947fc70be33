//! Slot resolution.
//!
//! Mounting options accept slot content in several shapes; each becomes a
//! slot render function:
//!
//! 1. a component with a render function → renders that component, with
//!    the slot props as its props
//! 2. a function → used as is
//! 3. a pre-built node or plain value → returned verbatim on every render
//! 4. a string → compiled as a template and rendered with the slot props
//!
//! Anything else is skipped.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::engine::template::compile;
use crate::engine::{Component, ComponentOptions, ComponentVNode, ElementVNode, SlotFn, Slots, VNode};
use crate::error::TemplateError;
use crate::types::{PropsMap, Value};

#[derive(Clone)]
pub enum SlotContent {
    Render(Component),
    Function(SlotFn),
    Node(VNode),
    Value(Value),
    Text(String),
    /// Content of a shape slots cannot take. Ignored.
    Unknown,
}

impl SlotContent {
    pub fn function(slot: impl Fn(&PropsMap) -> Vec<VNode> + 'static) -> Self {
        SlotContent::Function(Rc::new(slot))
    }
}

impl From<&str> for SlotContent {
    fn from(value: &str) -> Self {
        SlotContent::Text(value.to_string())
    }
}

impl From<String> for SlotContent {
    fn from(value: String) -> Self {
        SlotContent::Text(value)
    }
}

impl From<VNode> for SlotContent {
    fn from(value: VNode) -> Self {
        SlotContent::Node(value)
    }
}

impl From<ElementVNode> for SlotContent {
    fn from(value: ElementVNode) -> Self {
        SlotContent::Node(value.into())
    }
}

impl From<Component> for SlotContent {
    fn from(value: Component) -> Self {
        SlotContent::Render(value)
    }
}

impl From<ComponentOptions> for SlotContent {
    fn from(value: ComponentOptions) -> Self {
        SlotContent::Render(value.into())
    }
}

impl From<Value> for SlotContent {
    fn from(value: Value) -> Self {
        SlotContent::Value(value)
    }
}

/// Turn mounting-option slots into render functions.
pub fn resolve_slots(slots: IndexMap<String, SlotContent>) -> Result<Slots, TemplateError> {
    let mut resolved = Slots::new();
    for (name, content) in slots {
        let slot: SlotFn = match content {
            SlotContent::Render(component) => Rc::new(move |props: &PropsMap| {
                vec![VNode::Component(
                    ComponentVNode::new(component.clone()).props(props.clone()),
                )]
            }),
            SlotContent::Function(slot) => slot,
            SlotContent::Node(node) => Rc::new(move |_: &PropsMap| vec![node.clone()]),
            SlotContent::Value(value) => {
                let text = value.to_string();
                Rc::new(move |_: &PropsMap| vec![VNode::Text(text.clone())])
            }
            SlotContent::Text(source) => {
                let template = compile(&source)?;
                Rc::new(move |props: &PropsMap| template.render_slot(props))
            }
            SlotContent::Unknown => {
                log::debug!("ignoring slot `{name}`: unrecognized content");
                continue;
            }
        };
        resolved.insert(name, slot);
    }
    Ok(resolved)
}
