//! Wrapper - The handle a test holds on a mounted component.

use bitflags::bitflags;

use super::driver::MountState;
use super::emit::{EmittedEvents, EmittedLog};
use crate::engine::{next_tick, with_document, App, InstanceHandle, NextTick, NodeId, ReactiveProps};
use crate::types::{PropsMap, Value};

bitflags! {
    /// How the wrapped component was mounted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u8 {
        /// Mounted from a bare render function.
        const FUNCTIONAL = 1 << 0;
        const SHALLOW = 1 << 1;
        /// The container was appended to a document element.
        const ATTACHED = 1 << 2;
    }
}

/// A mounted component plus the app, props bag and event log behind it.
///
/// Returned by [`mount`](super::mount) and [`shallow_mount`](super::shallow_mount).
/// The wrapper owns the app. Dropping it without [`unmount`](Self::unmount)
/// skips `unmounted` hooks and leaves an attached container in the document.
///
/// Prop writes go through [`set_props`](Self::set_props), which returns a
/// [`NextTick`]. The component sees the new values once that future
/// resolves or its `flush()` is called.
///
/// ```ignore
/// let mut wrapper = mount(counter, MountingOptions::new().prop("count", 1))?;
/// assert_eq!(wrapper.html(), "<span>1</span>");
///
/// block_on(wrapper.set_props(props! { "count" => 2 }));
/// assert_eq!(wrapper.html(), "<span>2</span>");
///
/// wrapper.vm().borrow().emit("bump", &[Value::from(3)]);
/// assert_eq!(wrapper.emitted_by("bump"), Some(vec![vec![Value::from(3)]]));
///
/// wrapper.unmount();
/// assert_eq!(wrapper.state(), MountState::TornDown);
/// ```
pub struct Wrapper {
    app: App,
    vm: InstanceHandle,
    props: ReactiveProps,
    emitted: EmittedLog,
    container: NodeId,
    capabilities: Capabilities,
    state: MountState,
}

impl Wrapper {
    pub(crate) fn new(
        app: App,
        vm: InstanceHandle,
        props: ReactiveProps,
        emitted: EmittedLog,
        container: NodeId,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            app,
            vm,
            props,
            emitted,
            container,
            capabilities,
            state: MountState::Mounted,
        }
    }

    /// The live component instance.
    pub fn vm(&self) -> &InstanceHandle {
        &self.vm
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn is_functional(&self) -> bool {
        self.capabilities.contains(Capabilities::FUNCTIONAL)
    }

    pub fn state(&self) -> MountState {
        self.state
    }

    /// Write each key into the props bag. The component sees the new
    /// values once the returned future resolves.
    pub fn set_props(&self, props: PropsMap) -> NextTick {
        for (key, value) in props {
            self.props.set(key, value);
        }
        next_tick()
    }

    /// Props as the component resolved them.
    pub fn props(&self) -> PropsMap {
        self.vm.borrow().props().clone()
    }

    /// Events emitted by the wrapped component.
    pub fn emitted(&self) -> EmittedEvents {
        self.emitted.for_instance(self.vm.borrow().uid())
    }

    pub fn emitted_by(&self, event: &str) -> Option<Vec<Vec<Value>>> {
        self.emitted.events(self.vm.borrow().uid(), event)
    }

    /// The log of every instance in this mount.
    pub fn emitted_log(&self) -> &EmittedLog {
        &self.emitted
    }

    /// First root node of the component.
    pub fn element(&self) -> Option<NodeId> {
        self.vm.borrow().element()
    }

    /// The component's rendered markup.
    pub fn html(&self) -> String {
        let nodes = self.vm.borrow().nodes().to_vec();
        with_document(|doc| nodes.iter().map(|&node| doc.outer_html(node)).collect())
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Tear down the app and remove the container. Calling it again does
    /// nothing.
    pub fn unmount(&mut self) {
        if self.state != MountState::Mounted {
            return;
        }
        self.app.unmount();
        with_document(|doc| doc.remove(self.container));
        self.state = MountState::TornDown;
        log::debug!("state: {:?}", self.state);
    }
}

impl std::fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wrapper")
            .field("vm", &self.vm.borrow().uid())
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::engine::registry::get_instance;
    use crate::engine::{h, reset_document, reset_registry, reset_scheduler, ComponentOptions};
    use crate::mount::{config, mount, MountingOptions};
    use crate::props;

    fn setup() {
        reset_document();
        reset_registry();
        reset_scheduler();
        config::reset();
    }

    fn counter() -> ComponentOptions {
        ComponentOptions::named("Counter")
            .prop("count")
            .emits("bump")
            .render(|ctx| {
                let count = ctx.prop("count").and_then(Value::as_int).unwrap_or(0);
                h("span").text(count.to_string()).into()
            })
    }

    #[test]
    fn test_set_props_applies_after_flush() {
        setup();
        let wrapper = mount(counter(), MountingOptions::new().prop("count", 1)).unwrap();
        assert_eq!(wrapper.html(), "<span>1</span>");

        block_on(wrapper.set_props(props! { "count" => 2 }));
        assert_eq!(wrapper.html(), "<span>2</span>");
        assert_eq!(wrapper.props().get("count"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_emitted_is_scoped_to_the_component() {
        setup();
        let wrapper = mount(counter(), MountingOptions::new()).unwrap();
        wrapper.vm().borrow().emit("bump", &[Value::from(1)]);
        wrapper.vm().borrow().emit("bump", &[Value::from(2)]);

        assert_eq!(
            wrapper.emitted_by("bump"),
            Some(vec![vec![Value::from(1)], vec![Value::from(2)]])
        );
        assert_eq!(wrapper.emitted().len(), 1);
        assert!(wrapper.emitted_by("other").is_none());
    }

    #[test]
    fn test_unmount_is_idempotent() {
        setup();
        let body = with_document(|doc| doc.body());
        let mut wrapper = mount(counter(), MountingOptions::new().attach_to(body)).unwrap();
        assert!(wrapper.capabilities().contains(Capabilities::ATTACHED));
        assert_eq!(wrapper.state(), MountState::Mounted);
        let uid = wrapper.vm().borrow().uid();
        assert!(get_instance(uid).is_some());

        wrapper.unmount();
        wrapper.unmount();
        assert_eq!(wrapper.state(), MountState::TornDown);
        assert!(with_document(|doc| doc.children(body).is_empty()));
        assert!(!wrapper.app().is_mounted());
        assert!(get_instance(uid).is_none());
    }
}
