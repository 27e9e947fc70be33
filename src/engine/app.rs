//! App - Application instance: config, plugins, registries, mount/unmount.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::component::{find_registered, normalize_name, Component, Directive, Mixin};
use super::dom::NodeId;
use super::instance::{Instance, InstanceHandle};
use super::renderer;
use super::vnode::ComponentVNode;
use crate::error::PluginError;
use crate::types::{InjectionKey, PropsMap, Value};

/// Rewrites every component vnode before it is mounted. Receives the
/// instance whose render produced the vnode.
pub type VNodeTransform = Rc<dyn Fn(ComponentVNode, &Instance) -> ComponentVNode>;

pub type AppRef = Rc<RefCell<AppContext>>;

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Readable from every render through `RenderContext::global`.
    pub global_properties: PropsMap,
    /// Free-form app settings, readable through `RenderContext::config`.
    pub settings: PropsMap,
}

/// Shared state every instance of the app can see.
#[derive(Default)]
pub struct AppContext {
    pub(crate) config: AppConfig,
    pub(crate) mixins: Vec<Mixin>,
    pub(crate) components: IndexMap<String, Component>,
    pub(crate) directives: IndexMap<String, Directive>,
    pub(crate) provides: IndexMap<InjectionKey, Value>,
    pub(crate) vnode_transform: Option<VNodeTransform>,
}

impl AppContext {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn components(&self) -> &IndexMap<String, Component> {
        &self.components
    }

    pub(crate) fn resolve_component(&self, name: &str) -> Option<(String, Component)> {
        find_registered(&self.components, name).map(|(alias, component)| (alias.clone(), component.clone()))
    }

    pub(crate) fn resolve_directive(&self, name: &str) -> Option<&Directive> {
        if let Some(directive) = self.directives.get(name) {
            return Some(directive);
        }
        let wanted = normalize_name(name);
        self.directives
            .iter()
            .find(|(registered, _)| normalize_name(registered) == wanted)
            .map(|(_, directive)| directive)
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("mixins", &self.mixins.len())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("directives", &self.directives.keys().collect::<Vec<_>>())
            .field("provides", &self.provides)
            .field("vnode_transform", &self.vnode_transform.is_some())
            .finish()
    }
}

// =============================================================================
// Plugins
// =============================================================================

pub trait Plugin {
    fn install(&self, app: &mut App, args: &[Value]) -> Result<(), PluginError>;

    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> Plugin for F
where
    F: Fn(&mut App, &[Value]) -> Result<(), PluginError>,
{
    fn install(&self, app: &mut App, args: &[Value]) -> Result<(), PluginError> {
        self(app, args)
    }
}

// =============================================================================
// App
// =============================================================================

pub struct App {
    context: AppRef,
    root: Component,
    root_instance: Option<InstanceHandle>,
    container: Option<NodeId>,
    installed: Vec<Rc<dyn Plugin>>,
}

/// Create an application whose root is `root`.
pub fn create_app(root: impl Into<Component>) -> App {
    App {
        context: Rc::new(RefCell::new(AppContext::default())),
        root: root.into(),
        root_instance: None,
        container: None,
        installed: Vec::new(),
    }
}

impl App {
    pub fn context(&self) -> Ref<'_, AppContext> {
        self.context.borrow()
    }

    pub fn config(&self) -> AppConfig {
        self.context.borrow().config.clone()
    }

    /// Set an app-level setting.
    pub fn set_config(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.context
            .borrow_mut()
            .config
            .settings
            .insert(key.into(), value.into());
        self
    }

    pub fn set_global_property(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.context
            .borrow_mut()
            .config
            .global_properties
            .insert(key.into(), value.into());
        self
    }

    pub fn global_property(&self, key: &str) -> Option<Value> {
        self.context.borrow().config.global_properties.get(key).cloned()
    }

    /// Install a plugin. Installing the same plugin twice is a no-op.
    pub fn use_plugin(&mut self, plugin: Rc<dyn Plugin>, args: &[Value]) -> Result<&mut Self, PluginError> {
        if self
            .installed
            .iter()
            .any(|installed| std::ptr::addr_eq(Rc::as_ptr(installed), Rc::as_ptr(&plugin)))
        {
            log::debug!("plugin `{}` already installed", plugin.name());
            return Ok(self);
        }
        self.installed.push(plugin.clone());
        plugin.install(self, args)?;
        Ok(self)
    }

    pub fn mixin(&mut self, mixin: Mixin) -> &mut Self {
        self.context.borrow_mut().mixins.push(mixin);
        self
    }

    pub fn component(&mut self, name: impl Into<String>, component: impl Into<Component>) -> &mut Self {
        self.context
            .borrow_mut()
            .components
            .insert(name.into(), component.into());
        self
    }

    pub fn get_component(&self, name: &str) -> Option<Component> {
        self.context
            .borrow()
            .resolve_component(name)
            .map(|(_, component)| component)
    }

    pub fn directive(&mut self, name: impl Into<String>, directive: Directive) -> &mut Self {
        self.context
            .borrow_mut()
            .directives
            .insert(name.into(), directive);
        self
    }

    pub fn provide(&mut self, key: impl Into<InjectionKey>, value: impl Into<Value>) -> &mut Self {
        self.context
            .borrow_mut()
            .provides
            .insert(key.into(), value.into());
        self
    }

    pub fn set_vnode_transform(&mut self, transform: VNodeTransform) -> &mut Self {
        self.context.borrow_mut().vnode_transform = Some(transform);
        self
    }

    /// Render the root component into `container`. Mounting twice returns
    /// the existing root instance.
    pub fn mount(&mut self, container: NodeId) -> InstanceHandle {
        if let Some(root) = &self.root_instance {
            log::warn!("app is already mounted");
            return root.clone();
        }
        let root = renderer::mount_root(&self.context, &self.root, container);
        self.root_instance = Some(root.clone());
        self.container = Some(container);
        root
    }

    /// Tear down every instance and remove the rendered nodes.
    pub fn unmount(&mut self) {
        if let Some(root) = self.root_instance.take() {
            renderer::unmount_root(&self.context, &root);
        }
        self.container = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.root_instance.is_some()
    }

    pub fn root_instance(&self) -> Option<InstanceHandle> {
        self.root_instance.clone()
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root)
            .field("mounted", &self.root_instance.is_some())
            .field("plugins", &self.installed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::component::ComponentOptions;
    use std::cell::Cell;

    #[test]
    fn test_plugin_installs_once() {
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let plugin: Rc<dyn Plugin> = Rc::new(move |app: &mut App, args: &[Value]| -> Result<(), PluginError> {
            count_clone.set(count_clone.get() + 1);
            app.set_global_property("$arg", args.first().cloned().unwrap_or_default());
            Ok(())
        });

        let mut app = create_app(ComponentOptions::new());
        app.use_plugin(plugin.clone(), &[Value::from("x")]).unwrap();
        app.use_plugin(plugin, &[]).unwrap();

        assert_eq!(count.get(), 1);
        assert_eq!(app.global_property("$arg"), Some(Value::from("x")));
    }

    #[test]
    fn test_plugin_error_passes_through() {
        let plugin: Rc<dyn Plugin> =
            Rc::new(|_: &mut App, _: &[Value]| -> Result<(), PluginError> {
            Err(PluginError::new("broken", "no"))
        });
        let mut app = create_app(ComponentOptions::new());
        let err = app.use_plugin(plugin, &[]).unwrap_err();
        assert_eq!(err.plugin, "broken");
    }

    #[test]
    fn test_registries_resolve_any_spelling() {
        let mut app = create_app(ComponentOptions::new());
        app.component("MyChild", ComponentOptions::named("MyChild"));
        app.directive("focus-ring", Directive::new());

        assert!(app.get_component("my-child").is_some());
        assert!(app.context().resolve_directive("FocusRing").is_some());
        assert!(app.context().resolve_directive("missing").is_none());
    }
}
