//! Names shared by the mount procedure and the stub transform.

/// Id of the container element a mount renders into.
pub const MOUNT_ELEMENT_ID: &str = "app";

/// Ref key the synthetic parent registers the component under test with.
pub const MOUNT_COMPONENT_REF: &str = "SPARK_MOUNT_COMPONENT";

/// Name of the synthetic parent. Its direct children are never stubbed.
pub const MOUNT_PARENT_NAME: &str = "SPARK_MOUNT_PARENT";
