//! # spark-mount
//!
//! Mount a single UI component in isolation and drive it from a test.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for fine-grained reactivity.
//!
//! ## Architecture
//!
//! A mount wraps the component under test in a synthetic parent that
//! renders it with a signal-backed props bag. Writing the bag re-renders
//! the component on the next scheduler flush:
//!
//! ```text
//! set_props → props signal → render effect → scheduler job → NextTick → document
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Dynamic values, props maps, injection keys
//! - [`engine`] - Host runtime: document, components, renderer, scheduler, templates, app
//! - [`mount`] - `mount` / `shallow_mount`, global config, stubs, wrapper
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```ignore
//! use spark_mount::{h, mount, ComponentOptions, MountingOptions};
//!
//! let hello = ComponentOptions::named("Hello").prop("msg").render(|ctx| {
//!     h("p").text(ctx.prop("msg").map(ToString::to_string).unwrap_or_default()).into()
//! });
//! let wrapper = mount(hello, MountingOptions::new().prop("msg", "hi"))?;
//! assert_eq!(wrapper.html(), "<p>hi</p>");
//! ```

pub mod engine;
pub mod error;
pub mod mount;
pub mod types;

pub use types::*;

pub use error::{MountError, PluginError, SelectorError, TemplateError};

pub use engine::{
    create_app, h, next_tick, reset_document, reset_registry, reset_scheduler, with_document, App,
    Component, ComponentOptions, ComponentVNode, Directive, DirectiveBinding, Document,
    ElementVNode, FunctionalComponent, Instance, InstanceHandle, Mixin, NextTick, NodeId, Plugin,
    RenderContext, Slots, VNode,
};

pub use mount::{
    config, mount, shallow_mount, AttachTo, Capabilities, GlobalMountOptions, MountState,
    MountTarget, MountingOptions, SlotContent, Wrapper,
};
