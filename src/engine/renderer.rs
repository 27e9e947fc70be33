//! Renderer - VNode trees into the document.
//!
//! Every options component instance gets one render effect. The first run
//! renders synchronously and the caller builds the nodes. Later runs (a
//! signal the render read was written) store the new vnode and queue a
//! scheduler job; the job rebuilds the instance's subtree and swaps it into
//! the document in place.
//!
//! Child instances are reused across re-renders when the same component
//! definition appears again under the same parent. There is no keyed
//! diffing: the subtree's document nodes are rebuilt on every patch.

use std::rc::{Rc, Weak};
use std::cell::RefCell;

use indexmap::IndexMap;
use spark_signals::effect;

use super::app::AppRef;
use super::component::{find_registered, Component, DirectiveBinding, HookFn, Hooks, Mixin};
use super::dom::{with_document, NodeId};
use super::instance::{Instance, InstanceHandle, RenderContext};
use super::registry;
use super::scheduler;
use super::vnode::{ComponentVNode, DirectiveUse, ElementVNode, Slots, VNode};
use crate::types::{PropsMap, Value};

// =============================================================================
// Root
// =============================================================================

pub(crate) fn mount_root(app: &AppRef, root: &Component, container: NodeId) -> InstanceHandle {
    let instance = create_instance(app, root.clone(), PropsMap::new(), Slots::default(), None);
    let mut mounted = Vec::new();
    let nodes = render_new_instance(app, &instance, &mut mounted);
    with_document(|doc| {
        for &node in &nodes {
            doc.append_child(container, node);
        }
    });
    run_mounted(app, mounted);
    log::trace!("mounted root instance {}", instance.borrow().uid());
    instance
}

pub(crate) fn unmount_root(app: &AppRef, root: &InstanceHandle) {
    let nodes = root.borrow().nodes.clone();
    unmount_instance(app, root);
    with_document(|doc| {
        for node in nodes {
            doc.remove(node);
        }
    });
}

// =============================================================================
// Instances
// =============================================================================

fn collect_mixins(app: &AppRef, component: &Component) -> Vec<Mixin> {
    let mut mixins = app.borrow().mixins.clone();
    if let Some(options) = component.options() {
        mixins.extend(options.mixins.iter().cloned());
    }
    mixins
}

/// App mixins, then component mixins, then the component's own hook.
fn collect_hooks(app: &AppRef, component: &Component, pick: fn(&Hooks) -> Option<HookFn>) -> Vec<HookFn> {
    let mut hooks: Vec<HookFn> = collect_mixins(app, component)
        .iter()
        .filter_map(|mixin| pick(&mixin.hooks))
        .collect();
    if let Some(own) = component.options().and_then(|options| pick(&options.hooks)) {
        hooks.push(own);
    }
    hooks
}

fn run_hooks(instance: &InstanceHandle, hooks: Vec<HookFn>) {
    for hook in hooks {
        hook(&mut instance.borrow_mut());
    }
}

fn create_instance(
    app: &AppRef,
    component: Component,
    props: PropsMap,
    slots: Slots,
    parent: Option<&InstanceHandle>,
) -> InstanceHandle {
    let uid = registry::allocate_uid();
    let (provides, parent_ref) = match parent {
        Some(parent) => (parent.borrow().child_provides.clone(), Some(Rc::downgrade(parent))),
        None => (Rc::new(IndexMap::new()), None),
    };
    let instance = Instance::new(uid, component.clone(), props, slots, provides, parent_ref);
    let handle = Rc::new(RefCell::new(instance));
    registry::register_instance(uid, &handle);

    run_hooks(&handle, collect_hooks(app, &component, |hooks| hooks.before_create.clone()));

    let mut data = PropsMap::new();
    let data_fns = collect_mixins(app, &component)
        .into_iter()
        .filter_map(|mixin| mixin.data)
        .chain(component.options().and_then(|options| options.data.clone()));
    for data_fn in data_fns {
        data.extend(data_fn());
    }
    handle.borrow_mut().data = data;

    if let Some(options) = component.options() {
        if !options.provide.is_empty() {
            let mut instance = handle.borrow_mut();
            let mut child_provides = (*instance.child_provides).clone();
            child_provides.extend(options.provide.clone());
            instance.child_provides = Rc::new(child_provides);
        }
    }

    run_hooks(&handle, collect_hooks(app, &component, |hooks| hooks.created.clone()));
    log::trace!("created instance {uid} ({:?})", component.name());
    handle
}

fn render_vnode(app: &AppRef, handle: &InstanceHandle) -> VNode {
    let instance = handle.borrow();
    let context = app.borrow();
    let vnode = match instance.component() {
        Component::Options(options) => match &options.render {
            Some(render) => render(&RenderContext::new(&instance, &context)),
            None => {
                log::warn!("component {:?} has no render function", options.name);
                VNode::Empty
            }
        },
        Component::Functional(functional) => functional.render(instance.props(), instance.slots()),
    };
    apply_fallthrough(vnode, instance.attrs())
}

/// Undeclared props land on a single element root. `class` is appended.
fn apply_fallthrough(vnode: VNode, attrs: &PropsMap) -> VNode {
    match vnode {
        VNode::Element(mut element) if !attrs.is_empty() => {
            for (key, value) in attrs {
                let merged = match (key.as_str(), element.attrs.get(key)) {
                    ("class", Some(Value::Str(existing))) => Value::Str(format!("{existing} {value}")),
                    _ => value.clone(),
                };
                element.attrs.insert(key.clone(), merged);
            }
            VNode::Element(element)
        }
        other => other,
    }
}

/// Start the render effect and build the first tree.
fn render_new_instance(app: &AppRef, handle: &InstanceHandle, mounted: &mut Vec<InstanceHandle>) -> Vec<NodeId> {
    let uid = handle.borrow().uid();
    let weak = Rc::downgrade(handle);
    let effect_app = app.clone();
    let mut first_run = true;

    let stop = effect(move || {
        let Some(instance) = weak.upgrade() else {
            return;
        };
        if instance.try_borrow_mut().is_err() {
            log::warn!("instance {uid} changed a rendered value while borrowed; re-rendering on next flush");
            queue_rerender(&effect_app, uid, &instance);
            return;
        }
        let vnode = render_vnode(&effect_app, &instance);
        instance.borrow_mut().next_vnode = Some(vnode);
        if first_run {
            first_run = false;
            return;
        }
        queue_rerender(&effect_app, uid, &instance);
    });
    registry::set_effect_stop(uid, Box::new(stop));

    let vnode = handle.borrow_mut().next_vnode.take().unwrap_or_default();
    let nodes = patch_subtree(app, handle, vnode, mounted);
    mounted.push(handle.clone());
    nodes
}

fn queue_rerender(app: &AppRef, uid: u64, instance: &InstanceHandle) {
    let job_app = app.clone();
    let job_instance = Rc::downgrade(instance);
    scheduler::queue_job(uid, Box::new(move || rerender(&job_app, &job_instance)));
}

fn rerender(app: &AppRef, instance: &Weak<RefCell<Instance>>) {
    let Some(handle) = instance.upgrade() else {
        return;
    };
    if !handle.borrow().is_mounted() {
        return;
    }
    let pending = handle.borrow_mut().next_vnode.take();
    let vnode = match pending {
        Some(vnode) => vnode,
        None => render_vnode(app, &handle),
    };

    let old_nodes = handle.borrow().nodes.clone();
    let mut mounted = Vec::new();
    let new_nodes = patch_subtree(app, &handle, vnode, &mut mounted);
    with_document(|doc| doc.replace_nodes(&old_nodes, &new_nodes));
    replace_in_ancestors(&handle, &old_nodes, &new_nodes);
    run_mounted(app, mounted);
    log::trace!("re-rendered instance {}", handle.borrow().uid());
}

/// An instance whose root nodes changed may be (part of) its parent's root.
fn replace_in_ancestors(handle: &InstanceHandle, old: &[NodeId], new: &[NodeId]) {
    let mut current = handle.borrow().parent();
    while let Some(ancestor) = current {
        {
            let mut ancestor_mut = ancestor.borrow_mut();
            let Some(position) = ancestor_mut.nodes.iter().position(|node| old.contains(node)) else {
                break;
            };
            ancestor_mut.nodes.retain(|node| !old.contains(node));
            for (offset, node) in new.iter().enumerate() {
                ancestor_mut.nodes.insert(position + offset, *node);
            }
        }
        current = ancestor.borrow().parent();
    }
}

/// Build an instance's whole subtree from `vnode`. Children of the previous
/// render are reused by definition identity; the rest are unmounted.
fn patch_subtree(
    app: &AppRef,
    handle: &InstanceHandle,
    vnode: VNode,
    mounted: &mut Vec<InstanceHandle>,
) -> Vec<NodeId> {
    let previous = {
        let mut instance = handle.borrow_mut();
        instance.refs.clear();
        std::mem::take(&mut instance.children)
    };
    let mut pool: Vec<Option<InstanceHandle>> = previous.into_iter().map(Some).collect();

    let mut nodes = build(app, handle, vnode, &mut pool, mounted);

    for leftover in pool.into_iter().flatten() {
        unmount_instance(app, &leftover);
    }
    if nodes.is_empty() {
        nodes.push(with_document(|doc| doc.create_comment("")));
    }
    handle.borrow_mut().nodes = nodes.clone();
    nodes
}

fn run_mounted(app: &AppRef, mounted: Vec<InstanceHandle>) {
    for instance in mounted {
        instance.borrow_mut().mounted = true;
        let component = instance.borrow().component().clone();
        run_hooks(&instance, collect_hooks(app, &component, |hooks| hooks.mounted.clone()));
    }
}

/// Children first, then `unmounted` hooks, then release.
pub(crate) fn unmount_instance(app: &AppRef, handle: &InstanceHandle) {
    let children = std::mem::take(&mut handle.borrow_mut().children);
    for child in &children {
        unmount_instance(app, child);
    }
    let component = handle.borrow().component().clone();
    run_hooks(handle, collect_hooks(app, &component, |hooks| hooks.unmounted.clone()));

    let uid = {
        let mut instance = handle.borrow_mut();
        instance.mounted = false;
        instance.refs.clear();
        instance.next_vnode = None;
        instance.uid()
    };
    registry::release_instance(uid);
}

// =============================================================================
// Build
// =============================================================================

type Pool = Vec<Option<InstanceHandle>>;

fn build(
    app: &AppRef,
    parent: &InstanceHandle,
    vnode: VNode,
    pool: &mut Pool,
    mounted: &mut Vec<InstanceHandle>,
) -> Vec<NodeId> {
    match vnode {
        VNode::Empty => Vec::new(),
        VNode::Text(text) => vec![with_document(|doc| doc.create_text(&text))],
        VNode::Fragment(children) => {
            let mut nodes = Vec::new();
            for child in children {
                nodes.extend(build(app, parent, child, pool, mounted));
            }
            nodes
        }
        VNode::Element(element) => match resolve_tag(app, parent, &element.tag) {
            Some((alias, component)) => {
                let vnode = element_to_component(element, component, alias);
                build_component(app, parent, vnode, pool, mounted)
            }
            None => vec![build_element(app, parent, element, pool, mounted)],
        },
        VNode::Component(vnode) => build_component(app, parent, vnode, pool, mounted),
    }
}

/// Local registrations of the rendering component first, then the app's.
fn resolve_tag(app: &AppRef, parent: &InstanceHandle, tag: &str) -> Option<(String, Component)> {
    let local = {
        let instance = parent.borrow();
        instance
            .component()
            .local_components()
            .and_then(|components| find_registered(components, tag))
            .map(|(alias, component)| (alias.clone(), component.clone()))
    };
    local.or_else(|| app.borrow().resolve_component(tag))
}

fn element_to_component(element: ElementVNode, component: Component, alias: String) -> ComponentVNode {
    let ElementVNode {
        attrs,
        children,
        named_slots,
        ..
    } = element;
    let mut slots = Slots::new();
    if !children.is_empty() {
        slots.insert("default", Rc::new(move |_: &PropsMap| children.clone()));
    }
    for (name, nodes) in named_slots {
        slots.insert(name, Rc::new(move |_: &PropsMap| nodes.clone()));
    }
    ComponentVNode {
        component,
        props: attrs,
        slots,
        ref_key: None,
        registered_as: Some(alias),
    }
}

fn build_element(
    app: &AppRef,
    parent: &InstanceHandle,
    element: ElementVNode,
    pool: &mut Pool,
    mounted: &mut Vec<InstanceHandle>,
) -> NodeId {
    let ElementVNode {
        tag,
        attrs,
        directives,
        children,
        named_slots,
    } = element;

    if looks_like_component(&tag) {
        log::warn!("failed to resolve component: {tag}");
    }

    let node = with_document(|doc| {
        let node = doc.create_element(&tag);
        for (name, value) in &attrs {
            if name == "ref" {
                continue;
            }
            if let Some(text) = value.to_attr() {
                doc.set_attribute(node, name, &text);
            }
        }
        node
    });

    let mut child_nodes = Vec::new();
    for child in children.into_iter().chain(named_slots.into_values().flatten()) {
        child_nodes.extend(build(app, parent, child, pool, mounted));
    }
    with_document(|doc| {
        for child in child_nodes {
            doc.append_child(node, child);
        }
    });

    apply_directives(app, node, &directives);
    node
}

/// PascalCase tags are always meant as components.
fn looks_like_component(tag: &str) -> bool {
    tag.chars().next().is_some_and(char::is_uppercase)
}

fn apply_directives(app: &AppRef, node: NodeId, directives: &[DirectiveUse]) {
    for used in directives {
        let hook = app
            .borrow()
            .resolve_directive(&used.name)
            .map(|directive| directive.mounted.clone());
        match hook {
            Some(Some(hook)) => {
                let binding = DirectiveBinding {
                    value: used.value.clone(),
                    arg: used.arg.clone(),
                };
                with_document(|doc| hook(doc, node, &binding));
            }
            Some(None) => {}
            None => log::warn!("failed to resolve directive: {}", used.name),
        }
    }
}

fn build_component(
    app: &AppRef,
    parent: &InstanceHandle,
    vnode: ComponentVNode,
    pool: &mut Pool,
    mounted: &mut Vec<InstanceHandle>,
) -> Vec<NodeId> {
    let transform = app.borrow().vnode_transform.clone();
    let mut vnode = match transform {
        Some(transform) => {
            let parent_instance = parent.borrow();
            transform(vnode, &parent_instance)
        }
        None => vnode,
    };

    let prop_ref = match vnode.props.shift_remove("ref") {
        Some(Value::Str(key)) => Some(key),
        _ => None,
    };
    let ref_key = vnode.ref_key.take().or(prop_ref);
    let ComponentVNode {
        component, props, slots, ..
    } = vnode;

    if let Component::Functional(functional) = &component {
        let rendered = functional.render(&props, &slots);
        return build(app, parent, rendered, pool, mounted);
    }

    let reused = pool
        .iter_mut()
        .find(|entry| {
            entry
                .as_ref()
                .is_some_and(|child| child.borrow().component().ptr_eq(&component))
        })
        .and_then(Option::take);

    let (child, nodes) = match reused {
        Some(child) => {
            {
                let mut instance = child.borrow_mut();
                instance.set_inputs(props, slots);
                instance.next_vnode = None;
            }
            let vnode = render_vnode(app, &child);
            let nodes = patch_subtree(app, &child, vnode, mounted);
            (child, nodes)
        }
        None => {
            let child = create_instance(app, component, props, slots, Some(parent));
            let nodes = render_new_instance(app, &child, mounted);
            (child, nodes)
        }
    };

    let mut parent_instance = parent.borrow_mut();
    if let Some(key) = ref_key {
        parent_instance.refs.insert(key, child.clone());
    }
    parent_instance.children.push(child);
    nodes
}
