//! Instance - A mounted component's state.
//!
//! An [`Instance`] holds resolved props and attrs, data, instance-level
//! globals (mocks), slots, refs to child instances, provides and the root
//! document nodes it rendered. Render functions see it through a
//! [`RenderContext`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::app::AppContext;
use super::component::Component;
use super::dom::NodeId;
use super::template::Scope;
use super::vnode::{Slots, VNode};
use crate::types::{InjectionKey, PropsMap, Value};

pub type InstanceHandle = Rc<RefCell<Instance>>;

/// Receives `(uid, event, args)` for every event the instance emits.
pub type EmitListener = Rc<dyn Fn(u64, &str, &[Value])>;

pub type Provides = Rc<IndexMap<InjectionKey, Value>>;

pub struct Instance {
    uid: u64,
    component: Component,
    pub(crate) props: PropsMap,
    pub(crate) attrs: PropsMap,
    pub(crate) data: PropsMap,
    pub(crate) globals: PropsMap,
    pub(crate) slots: Slots,
    pub(crate) refs: IndexMap<String, InstanceHandle>,
    /// What ancestors provided.
    pub(crate) provides: Provides,
    /// What descendants see: `provides` plus this component's own.
    pub(crate) child_provides: Provides,
    pub(crate) parent: Option<Weak<RefCell<Instance>>>,
    pub(crate) children: Vec<InstanceHandle>,
    pub(crate) nodes: Vec<NodeId>,
    /// Output of the latest render effect run, consumed by the next patch.
    pub(crate) next_vnode: Option<VNode>,
    pub(crate) mounted: bool,
    emit_listeners: Vec<EmitListener>,
}

impl Instance {
    pub(crate) fn new(
        uid: u64,
        component: Component,
        props: PropsMap,
        slots: Slots,
        provides: Provides,
        parent: Option<Weak<RefCell<Instance>>>,
    ) -> Self {
        let mut instance = Self {
            uid,
            component,
            props: PropsMap::new(),
            attrs: PropsMap::new(),
            data: PropsMap::new(),
            globals: PropsMap::new(),
            slots: Slots::default(),
            refs: IndexMap::new(),
            child_provides: provides.clone(),
            provides,
            parent,
            children: Vec::new(),
            nodes: Vec::new(),
            next_vnode: None,
            mounted: false,
            emit_listeners: Vec::new(),
        };
        instance.set_inputs(props, slots);
        instance
    }

    /// Split incoming props into declared props and fallthrough attrs.
    /// A component that declares no props receives everything as props.
    pub(crate) fn set_inputs(&mut self, incoming: PropsMap, slots: Slots) {
        let declared = self.component.declared_props();
        if declared.is_empty() {
            self.props = incoming;
            self.attrs = PropsMap::new();
        } else {
            let (props, attrs): (PropsMap, PropsMap) = incoming
                .into_iter()
                .partition(|(key, _)| declared.iter().any(|d| d == key));
            self.props = props;
            self.attrs = attrs;
        }
        self.slots = slots;
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn name(&self) -> Option<&str> {
        self.component.name()
    }

    pub fn props(&self) -> &PropsMap {
        &self.props
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn attrs(&self) -> &PropsMap {
        &self.attrs
    }

    pub fn data(&self) -> &PropsMap {
        &self.data
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Instance-level global properties (mocks).
    pub fn globals(&self) -> &PropsMap {
        &self.globals
    }

    pub fn global(&self, key: &str) -> Option<&Value> {
        self.globals.get(key)
    }

    pub fn set_global(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.globals.insert(key.into(), value.into());
    }

    pub fn slots(&self) -> &Slots {
        &self.slots
    }

    pub fn ref_instance(&self, key: &str) -> Option<InstanceHandle> {
        self.refs.get(key).cloned()
    }

    pub fn refs(&self) -> impl Iterator<Item = (&str, &InstanceHandle)> {
        self.refs.iter().map(|(key, instance)| (key.as_str(), instance))
    }

    pub fn parent(&self) -> Option<InstanceHandle> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn children(&self) -> &[InstanceHandle] {
        &self.children
    }

    /// Root document nodes, in order. Several for fragment roots.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// First root node.
    pub fn element(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Look up a value provided by an ancestor (or the app).
    pub fn injected(&self, key: &InjectionKey) -> Option<&Value> {
        self.provides.get(key)
    }

    /// Provide a value to descendants created after this call.
    pub fn provide(&mut self, key: impl Into<InjectionKey>, value: impl Into<Value>) {
        Rc::make_mut(&mut self.child_provides).insert(key.into(), value.into());
    }

    pub fn on_emit(&mut self, listener: impl Fn(u64, &str, &[Value]) + 'static) {
        self.emit_listeners.push(Rc::new(listener));
    }

    pub fn emit(&self, event: &str, args: &[Value]) {
        log::trace!("instance {} emitted `{event}`", self.uid);
        for listener in &self.emit_listeners {
            listener(self.uid, event, args);
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("uid", &self.uid)
            .field("component", &self.component)
            .field("props", &self.props)
            .field("attrs", &self.attrs)
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RenderContext
// =============================================================================

/// What a render function can see.
pub struct RenderContext<'a> {
    instance: &'a Instance,
    app: &'a AppContext,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(instance: &'a Instance, app: &'a AppContext) -> Self {
        Self { instance, app }
    }

    pub fn instance(&self) -> &Instance {
        self.instance
    }

    pub fn props(&self) -> &PropsMap {
        &self.instance.props
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.instance.props.get(key)
    }

    pub fn attrs(&self) -> &PropsMap {
        &self.instance.attrs
    }

    pub fn data(&self, key: &str) -> Option<&Value> {
        self.instance.data.get(key)
    }

    /// Instance globals (mocks) first, then the app's global properties.
    pub fn global(&self, key: &str) -> Option<&Value> {
        self.instance
            .globals
            .get(key)
            .or_else(|| self.app.config.global_properties.get(key))
    }

    /// App-level setting.
    pub fn config(&self, key: &str) -> Option<&Value> {
        self.app.config.settings.get(key)
    }

    /// Ancestor provides first, then app provides.
    pub fn inject(&self, key: impl Into<InjectionKey>) -> Option<&Value> {
        let key = key.into();
        self.instance
            .provides
            .get(&key)
            .or_else(|| self.app.provides.get(&key))
    }

    pub fn slots(&self) -> &Slots {
        &self.instance.slots
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.instance.slots.contains(name)
    }

    pub fn slot(&self, name: &str, props: &PropsMap) -> Vec<VNode> {
        self.instance.slots.render(name, props)
    }

    /// Resolve a dotted path. The first segment is looked up in props,
    /// data, globals, app global properties, then attrs.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let head = segments.next()?;
        let root = self
            .instance
            .props
            .get(head)
            .or_else(|| self.instance.data.get(head))
            .or_else(|| self.global(head))
            .or_else(|| self.instance.attrs.get(head))?;
        root.get_path(segments).cloned()
    }
}

impl Scope for RenderContext<'_> {
    fn lookup(&self, path: &str) -> Option<Value> {
        RenderContext::lookup(self, path)
    }

    fn render_slot(&self, name: &str, props: &PropsMap) -> Vec<VNode> {
        self.slot(name, props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::component::ComponentOptions;
    use std::cell::Cell;

    fn instance_of(component: ComponentOptions, props: PropsMap) -> Instance {
        Instance::new(0, component.into(), props, Slots::default(), Rc::default(), None)
    }

    #[test]
    fn test_undeclared_props_fall_through_to_attrs() {
        let instance = instance_of(
            ComponentOptions::new().prop("msg"),
            crate::props! { "msg" => "hi", "class" => "big" },
        );
        assert_eq!(instance.prop("msg"), Some(&Value::from("hi")));
        assert_eq!(instance.attrs().get("class"), Some(&Value::from("big")));
        assert!(instance.prop("class").is_none());
    }

    #[test]
    fn test_no_declared_props_keeps_everything() {
        let instance = instance_of(ComponentOptions::new(), crate::props! { "a" => 1 });
        assert_eq!(instance.prop("a"), Some(&Value::Int(1)));
        assert!(instance.attrs().is_empty());
    }

    #[test]
    fn test_lookup_order() {
        let mut instance = instance_of(ComponentOptions::new(), crate::props! { "x" => "prop" });
        instance.set_data("x", "data");
        instance.set_data("y", "data");
        instance.set_global("$store", Value::map([("state", "foo")]));
        let app = AppContext::default();
        let ctx = RenderContext::new(&instance, &app);

        assert_eq!(ctx.lookup("x"), Some(Value::from("prop")));
        assert_eq!(ctx.lookup("y"), Some(Value::from("data")));
        assert_eq!(ctx.lookup("$store.state"), Some(Value::from("foo")));
        assert_eq!(ctx.lookup("missing"), None);
    }

    #[test]
    fn test_emit_reaches_listeners() {
        let mut instance = instance_of(ComponentOptions::new(), PropsMap::new());
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        instance.on_emit(move |_, event, args| {
            assert_eq!(event, "save");
            assert_eq!(args, &[Value::Int(1)]);
            count_clone.set(count_clone.get() + 1);
        });
        instance.emit("save", &[Value::Int(1)]);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_provide_only_affects_descendants() {
        let mut instance = instance_of(ComponentOptions::new(), PropsMap::new());
        instance.provide("theme", "dark");
        assert!(instance.injected(&InjectionKey::from("theme")).is_none());
        assert_eq!(instance.child_provides.get(&InjectionKey::from("theme")), Some(&Value::from("dark")));
    }
}
