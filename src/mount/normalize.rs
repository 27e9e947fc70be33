//! Component normalization.
//!
//! Every accepted component shape becomes an owned [`ComponentOptions`] the
//! mount procedure may extend (data mixin, global registrations) without
//! touching the caller's definition.

use std::rc::Rc;

use crate::engine::{Component, ComponentOptions, FunctionalComponent, Slots, VNode};
use crate::types::PropsMap;

/// Anything `mount` accepts.
#[derive(Clone)]
pub enum MountTarget {
    Options(ComponentOptions),
    Function(FunctionalComponent),
    Component(Component),
}

impl MountTarget {
    /// A bare render function.
    pub fn function(render: impl Fn(&PropsMap, &Slots) -> VNode + 'static) -> Self {
        MountTarget::Function(FunctionalComponent::new(render))
    }
}

impl From<ComponentOptions> for MountTarget {
    fn from(value: ComponentOptions) -> Self {
        MountTarget::Options(value)
    }
}

impl From<Rc<ComponentOptions>> for MountTarget {
    fn from(value: Rc<ComponentOptions>) -> Self {
        MountTarget::Component(Component::Options(value))
    }
}

impl From<FunctionalComponent> for MountTarget {
    fn from(value: FunctionalComponent) -> Self {
        MountTarget::Function(value)
    }
}

impl From<Component> for MountTarget {
    fn from(value: Component) -> Self {
        MountTarget::Component(value)
    }
}

impl From<&Component> for MountTarget {
    fn from(value: &Component) -> Self {
        MountTarget::Component(value.clone())
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedComponent {
    pub definition: ComponentOptions,
    /// The input was a bare function.
    pub is_functional: bool,
}

/// Normalize any accepted shape. Never fails.
pub fn normalize(target: MountTarget) -> NormalizedComponent {
    match target {
        MountTarget::Options(definition) => NormalizedComponent {
            definition,
            is_functional: false,
        },
        MountTarget::Component(Component::Options(shared)) => NormalizedComponent {
            definition: (*shared).clone(),
            is_functional: false,
        },
        MountTarget::Function(functional) | MountTarget::Component(Component::Functional(functional)) => {
            NormalizedComponent {
                definition: wrap_functional(functional),
                is_functional: true,
            }
        }
    }
}

/// An options component that renders `functional` with everything it
/// receives and its slots, unchanged.
fn wrap_functional(functional: FunctionalComponent) -> ComponentOptions {
    let name = functional.name().map(str::to_string);
    let definition = ComponentOptions {
        name,
        ..ComponentOptions::default()
    };
    definition.render(move |ctx| {
        let mut input = ctx.props().clone();
        input.extend(ctx.attrs().iter().map(|(k, v)| (k.clone(), v.clone())));
        functional.render(&input, ctx.slots())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::h;

    #[test]
    fn test_options_are_copied() {
        let shared = Rc::new(ComponentOptions::named("Shared"));
        let normalized = normalize(MountTarget::from(shared.clone()));
        let mut definition = normalized.definition;
        definition.props.push("extra".into());

        assert!(!normalized.is_functional);
        assert!(shared.props.is_empty());
        assert_eq!(definition.name.as_deref(), Some("Shared"));
    }

    #[test]
    fn test_functions_are_wrapped() {
        let normalized = normalize(MountTarget::function(|props, _| {
            h("p").text(props.get("msg").map(ToString::to_string).unwrap_or_default()).into()
        }));
        assert!(normalized.is_functional);
        assert!(normalized.definition.render.is_some());
        assert!(normalized.definition.props.is_empty());
    }

    #[test]
    fn test_functional_component_value_is_functional() {
        let functional: Component = FunctionalComponent::new(|_, _| VNode::Empty).named("Fn").into();
        let normalized = normalize(functional.into());
        assert!(normalized.is_functional);
        assert_eq!(normalized.definition.name.as_deref(), Some("Fn"));
    }
}
