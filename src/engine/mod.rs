//! Host runtime - The component framework mounts run against.
//!
//! - Dom: arena document with selector queries and HTML serialization
//! - VNode / Component / Instance: what render functions produce and run in
//! - Renderer: builds instances and document nodes, one render effect each
//! - Scheduler: deduplicated re-render jobs, flushed by `NextTick`
//! - Template: markup compiled to render functions
//! - App: config, plugins, registries, provides, vnode transform
//!
//! # Architecture
//!
//! ```text
//! signal write → render effect → scheduler job → patch → document
//! ```
//!
//! All state is thread-local. Nothing here is `Send`.

pub mod app;
pub mod component;
pub mod dom;
pub mod instance;
pub mod props;
pub mod registry;
mod renderer;
pub mod scheduler;
pub mod selector;
pub mod template;
pub mod vnode;

pub use app::{create_app, App, AppConfig, AppContext, Plugin, VNodeTransform};
pub use component::{
    Component, ComponentOptions, Directive, DirectiveBinding, FunctionalComponent, Hooks, Mixin,
};
pub use dom::{reset_document, with_document, Document, NodeId};
pub use instance::{Instance, InstanceHandle, RenderContext};
pub use props::ReactiveProps;
pub use registry::reset_registry;
pub use scheduler::{next_tick, reset_scheduler, NextTick};
pub use vnode::{h, ComponentVNode, ElementVNode, SlotFn, Slots, VNode};
