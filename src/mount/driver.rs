//! Mount Driver - Turns a component and mounting options into a live wrapper.
//!
//! The component under test is rendered by a synthetic parent whose only
//! job is to pass the reactive props bag and the resolved slots down. The
//! parent's render effect reads the bag, so writing it re-renders the
//! component on the next flush.
//!
//! # Lifecycle
//!
//! ```text
//! Unmounted → Configuring → Mounted → TornDown
//! ```
//!
//! Everything that can fail without side effects (slot templates, the
//! attach target) is checked before any document node is created.
//!
//! # Example
//!
//! ```ignore
//! use spark_mount::{h, mount, props, ComponentOptions, MountingOptions};
//!
//! let greeting = ComponentOptions::named("Greeting")
//!     .prop("name")
//!     .render(|ctx| h("p").text(ctx.prop("name").map(ToString::to_string).unwrap_or_default()).into());
//!
//! // Mount detached, with an initial prop
//! let mut wrapper = mount(greeting, MountingOptions::new().prop("name", "Ada"))?;
//! assert_eq!(wrapper.html(), "<p>Ada</p>");
//!
//! // Prop writes land after the next flush
//! futures::executor::block_on(wrapper.set_props(props! { "name" => "Grace" }));
//! assert_eq!(wrapper.html(), "<p>Grace</p>");
//!
//! // Clean up
//! wrapper.unmount();
//! ```

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::config::{merge_global_options, with_defaults, GlobalMountOptions};
use super::constants::{MOUNT_COMPONENT_REF, MOUNT_ELEMENT_ID, MOUNT_PARENT_NAME};
use super::data::{create_data_mixin, create_mocks_mixin};
use super::emit::{attach_emit_listener, EmittedLog};
use super::normalize::{normalize, MountTarget, NormalizedComponent};
use super::slots::{resolve_slots, SlotContent};
use super::stubs::{passthrough_transform, stub_components};
use super::wrapper::{Capabilities, Wrapper};
use crate::engine::component::{normalize_name, DataFn};
use crate::engine::{create_app, with_document, App, Component, ComponentOptions, ComponentVNode, NodeId, ReactiveProps, Slots};
use crate::error::{MountError, PluginError};
use crate::types::{PropsMap, Value};

// =============================================================================
// Options
// =============================================================================

/// Where to put the mount container.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachTo {
    Element(NodeId),
    Selector(String),
}

impl From<NodeId> for AttachTo {
    fn from(value: NodeId) -> Self {
        AttachTo::Element(value)
    }
}

impl From<&str> for AttachTo {
    fn from(value: &str) -> Self {
        AttachTo::Selector(value.to_string())
    }
}

impl From<String> for AttachTo {
    fn from(value: String) -> Self {
        AttachTo::Selector(value)
    }
}

#[derive(Clone, Default)]
pub struct MountingOptions {
    /// Overrides the component's data after it is created.
    pub data: Option<DataFn>,
    pub props: PropsMap,
    /// Older name for `props`. Loses to `props` on conflicting keys.
    pub props_data: PropsMap,
    pub attrs: PropsMap,
    pub slots: IndexMap<String, SlotContent>,
    pub global: Option<GlobalMountOptions>,
    /// Without a target the container stays detached from the document.
    pub attach_to: Option<AttachTo>,
    pub shallow: bool,
}

impl MountingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, data: impl Fn() -> PropsMap + 'static) -> Self {
        self.data = Some(Rc::new(data));
        self
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn props(mut self, props: PropsMap) -> Self {
        self.props.extend(props);
        self
    }

    pub fn props_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props_data.insert(key.into(), value.into());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn slot(mut self, name: impl Into<String>, content: impl Into<SlotContent>) -> Self {
        self.slots.insert(name.into(), content.into());
        self
    }

    pub fn global(mut self, global: GlobalMountOptions) -> Self {
        self.global = Some(global);
        self
    }

    pub fn attach_to(mut self, target: impl Into<AttachTo>) -> Self {
        self.attach_to = Some(target.into());
        self
    }

    pub fn shallow(mut self, shallow: bool) -> Self {
        self.shallow = shallow;
        self
    }
}

impl fmt::Debug for MountingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountingOptions")
            .field("data", &self.data.is_some())
            .field("props", &self.props)
            .field("props_data", &self.props_data)
            .field("attrs", &self.attrs)
            .field("slots", &self.slots.keys().collect::<Vec<_>>())
            .field("global", &self.global)
            .field("attach_to", &self.attach_to)
            .field("shallow", &self.shallow)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Unmounted,
    Configuring,
    Mounted,
    TornDown,
}

// =============================================================================
// Mount
// =============================================================================

/// Mount `component` in isolation.
///
/// Accepts an options component, a bare render function or an
/// already-wrapped [`MountTarget`]. Props are layered `attrs`, then
/// `props_data`, then `props`. Defaults installed with [`config::init`]
/// are merged under `options.global`. The component renders under a
/// synthetic parent inside a fresh `div#app` container. The container is
/// only placed in the document when `attach_to` is set.
///
/// # Errors
///
/// - [`MountError::Template`] if a string slot fails to compile.
/// - [`MountError::AttachTargetNotFound`] if `attach_to` matches nothing.
/// - [`MountError::Selector`] if `attach_to` is not a valid selector.
/// - [`MountError::Plugin`] if a plugin's install fails. Nothing is left
///   in the document.
/// - [`MountError::RootInstanceMissing`] if the component never registered
///   with its parent. The app is unmounted and the container removed.
///
/// [`config::init`]: super::config::init
pub fn mount(component: impl Into<MountTarget>, options: MountingOptions) -> Result<Wrapper, MountError> {
    let MountingOptions {
        data,
        props,
        props_data,
        attrs,
        slots,
        global,
        attach_to,
        shallow,
    } = options;

    let NormalizedComponent {
        mut definition,
        is_functional,
    } = normalize(component.into());
    log::debug!(
        "mounting {} (functional: {is_functional}, shallow: {shallow})",
        definition.name.as_deref().unwrap_or("anonymous component")
    );

    let slots = resolve_slots(slots)?;
    let target = resolve_attach_target(attach_to.as_ref())?;

    if let Some(data) = data {
        definition.mixins.push(create_data_mixin(data()));
    }

    let mut initial = attrs;
    initial.extend(props_data);
    initial.extend(props);
    initial.insert("ref".to_string(), Value::from(MOUNT_COMPONENT_REF));
    let props = ReactiveProps::new(initial);

    let global = with_defaults(|defaults| merge_global_options(defaults, global.as_ref()));
    // Global registrations shadow local ones, whatever casing either side uses.
    for (name, component) in &global.components {
        let wanted = normalize_name(name);
        definition.components.retain(|local, _| normalize_name(local) != wanted);
        definition.components.insert(name.clone(), component.clone());
    }

    let component: Component = definition.into();
    let parent = mount_parent(component, props.clone(), slots);
    let mut app = create_app(parent);
    let emitted = EmittedLog::new();

    log::debug!("state: {:?}", MountState::Configuring);
    configure(&mut app, global, &emitted, shallow)?;

    let container = with_document(|doc| {
        let container = doc.create_element("div");
        doc.set_attribute(container, "id", MOUNT_ELEMENT_ID);
        if let Some(target) = target {
            doc.append_child(target, container);
        }
        container
    });

    let parent_instance = app.mount(container);
    let vm = parent_instance.borrow().ref_instance(MOUNT_COMPONENT_REF);
    let Some(vm) = vm else {
        app.unmount();
        with_document(|doc| doc.remove(container));
        return Err(MountError::RootInstanceMissing {
            ref_key: MOUNT_COMPONENT_REF.to_string(),
        });
    };
    log::debug!("state: {:?} (instance {})", MountState::Mounted, vm.borrow().uid());

    let mut capabilities = Capabilities::empty();
    capabilities.set(Capabilities::FUNCTIONAL, is_functional);
    capabilities.set(Capabilities::SHALLOW, shallow);
    capabilities.set(Capabilities::ATTACHED, target.is_some());

    Ok(Wrapper::new(app, vm, props, emitted, container, capabilities))
}

/// [`mount`] with every child component stubbed.
///
/// Components the mounted component renders directly become
/// `<name-stub>` elements that forward their props and default slot. Entries passed to `keep` still render for real, and explicit
/// `stubs` replacements win over the automatic stub.
///
/// # Errors
///
/// Same as [`mount`].
pub fn shallow_mount(component: impl Into<MountTarget>, options: MountingOptions) -> Result<Wrapper, MountError> {
    mount(component, options.shallow(true))
}

fn resolve_attach_target(attach_to: Option<&AttachTo>) -> Result<Option<NodeId>, MountError> {
    let Some(attach_to) = attach_to else {
        return Ok(None);
    };
    let found = match attach_to {
        AttachTo::Selector(selector) => with_document(|doc| doc.query_selector(selector))?,
        AttachTo::Element(id) => with_document(|doc| doc.contains(*id).then_some(*id)),
    };
    match found {
        Some(target) => {
            log::debug!("attaching to {target:?}");
            Ok(Some(target))
        }
        None => Err(MountError::AttachTargetNotFound {
            selector: match attach_to {
                AttachTo::Selector(selector) => selector.clone(),
                AttachTo::Element(id) => format!("{id:?}"),
            },
        }),
    }
}

/// The synthetic root: renders `component` with the current props and
/// the resolved slots, under the ref the driver looks it up by.
fn mount_parent(component: Component, props: ReactiveProps, slots: Slots) -> ComponentOptions {
    ComponentOptions::named(MOUNT_PARENT_NAME).render(move |_| {
        ComponentVNode::new(component.clone())
            .props(props.snapshot())
            .slots(slots.clone())
            .into()
    })
}

/// Apply the merged global options to `app`, in a fixed order.
fn configure(app: &mut App, global: GlobalMountOptions, emitted: &EmittedLog, shallow: bool) -> Result<(), PluginError> {
    let GlobalMountOptions {
        plugins,
        mixins,
        components,
        directives,
        provide,
        mocks,
        config,
        stubs,
    } = global;

    app.mixin(create_mocks_mixin(mocks));

    for (key, value) in config {
        app.set_config(key, value);
    }

    for entry in plugins {
        log::debug!("installing plugin `{}`", entry.plugin.name());
        app.use_plugin(entry.plugin, &entry.args)?;
    }

    for mixin in mixins {
        app.mixin(mixin);
    }
    for (name, component) in components {
        app.component(name, component);
    }
    for (name, directive) in directives {
        app.directive(name, directive);
    }
    for (key, value) in provide {
        app.provide(key, value);
    }

    app.mixin(attach_emit_listener(emitted));

    let transform = if shallow || stubs.is_some() {
        let registered = app.context().components().clone();
        stub_components(stubs.unwrap_or_default(), shallow, registered)
    } else {
        passthrough_transform()
    };
    app.set_vnode_transform(transform);
    log::debug!("app configured");
    Ok(())
}
