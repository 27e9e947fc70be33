//! Mounting - Isolated component mounts for tests.
//!
//! - [`normalize`]: any component shape → owned options
//! - [`slots`]: slot content → slot render functions
//! - [`config`]: process-wide defaults merged with per-call globals
//! - [`stubs`]: placeholder substitution through the app's vnode transform
//! - [`driver`]: [`mount`] / [`shallow_mount`]
//! - [`wrapper`]: the returned handle

pub mod config;
pub mod constants;
pub mod data;
pub mod driver;
pub mod emit;
pub mod normalize;
pub mod slots;
pub mod stubs;
pub mod wrapper;

pub use config::{merge_global_options, GlobalMountOptions, PluginEntry};
pub use constants::{MOUNT_COMPONENT_REF, MOUNT_ELEMENT_ID, MOUNT_PARENT_NAME};
pub use driver::{mount, shallow_mount, AttachTo, MountState, MountingOptions};
pub use emit::{EmittedEvents, EmittedLog};
pub use normalize::{normalize, MountTarget, NormalizedComponent};
pub use slots::{resolve_slots, SlotContent};
pub use stubs::{create_stub, stub_components, StubKey, StubValue, Stubs};
pub use wrapper::{Capabilities, Wrapper};
