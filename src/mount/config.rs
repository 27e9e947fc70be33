//! Global mount configuration.
//!
//! Two layers: process-wide defaults set once with [`init`], and the
//! per-call `global` field of the mounting options. [`merge_global_options`]
//! combines them: plugins and mixins are concatenated (defaults first), the
//! maps are shallow-merged with the per-call value winning.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::stubs::{StubKey, StubValue, Stubs};
use crate::engine::{Component, Directive, Mixin, Plugin};
use crate::types::{InjectionKey, PropsMap, Value};

/// A plugin with its install arguments.
#[derive(Clone)]
pub struct PluginEntry {
    pub plugin: Rc<dyn Plugin>,
    pub args: Vec<Value>,
}

impl fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginEntry")
            .field("plugin", &self.plugin.name())
            .field("args", &self.args)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GlobalMountOptions {
    pub plugins: Vec<PluginEntry>,
    pub mixins: Vec<Mixin>,
    pub components: IndexMap<String, Component>,
    pub directives: IndexMap<String, Directive>,
    pub provide: IndexMap<InjectionKey, Value>,
    /// Copied onto every instance before it is created.
    pub mocks: PropsMap,
    /// App-level settings.
    pub config: PropsMap,
    pub stubs: Option<Stubs>,
}

impl GlobalMountOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plugin(self, plugin: impl Plugin + 'static) -> Self {
        self.plugin_with_args(plugin, Vec::new())
    }

    pub fn plugin_with_args(mut self, plugin: impl Plugin + 'static, args: Vec<Value>) -> Self {
        self.plugins.push(PluginEntry {
            plugin: Rc::new(plugin),
            args,
        });
        self
    }

    /// Add an already shared plugin. The same `Rc` installs once per app.
    pub fn shared_plugin(mut self, plugin: Rc<dyn Plugin>, args: Vec<Value>) -> Self {
        self.plugins.push(PluginEntry { plugin, args });
        self
    }

    pub fn mixin(mut self, mixin: Mixin) -> Self {
        self.mixins.push(mixin);
        self
    }

    pub fn component(mut self, name: impl Into<String>, component: impl Into<Component>) -> Self {
        self.components.insert(name.into(), component.into());
        self
    }

    pub fn directive(mut self, name: impl Into<String>, directive: Directive) -> Self {
        self.directives.insert(name.into(), directive);
        self
    }

    pub fn provide(mut self, key: impl Into<InjectionKey>, value: impl Into<Value>) -> Self {
        self.provide.insert(key.into(), value.into());
        self
    }

    pub fn mock(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.mocks.insert(key.into(), value.into());
        self
    }

    pub fn config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Stub a component by name.
    pub fn stub(self, name: impl Into<String>) -> Self {
        self.stub_entry(StubKey::Name(name.into()), StubValue::Stub)
    }

    /// Render `replacement` wherever `name` would render.
    pub fn stub_with(self, name: impl Into<String>, replacement: impl Into<Component>) -> Self {
        self.stub_entry(StubKey::Name(name.into()), StubValue::Replace(replacement.into()))
    }

    /// Stub one definition by identity.
    pub fn stub_component(self, component: impl Into<Component>) -> Self {
        self.stub_entry(StubKey::Component(component.into()), StubValue::Stub)
    }

    /// Never stub `name`, even when mounting shallow.
    pub fn keep(self, name: impl Into<String>) -> Self {
        self.stub_entry(StubKey::Name(name.into()), StubValue::Keep)
    }

    fn stub_entry(mut self, key: StubKey, value: StubValue) -> Self {
        self.stubs.get_or_insert_with(Stubs::new).insert(key, value);
        self
    }
}

/// Combine defaults with per-call overrides.
pub fn merge_global_options(defaults: &GlobalMountOptions, overrides: Option<&GlobalMountOptions>) -> GlobalMountOptions {
    let Some(overrides) = overrides else {
        return defaults.clone();
    };

    let mut merged = defaults.clone();
    merged.plugins.extend(overrides.plugins.iter().cloned());
    merged.mixins.extend(overrides.mixins.iter().cloned());
    merged
        .components
        .extend(overrides.components.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
        .directives
        .extend(overrides.directives.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
        .provide
        .extend(overrides.provide.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
        .mocks
        .extend(overrides.mocks.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
        .config
        .extend(overrides.config.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.stubs = match (&defaults.stubs, &overrides.stubs) {
        (None, None) => None,
        (Some(stubs), None) | (None, Some(stubs)) => Some(stubs.clone()),
        (Some(base), Some(top)) => Some(base.merged(top)),
    };
    merged
}

// =============================================================================
// Process-wide defaults
// =============================================================================

thread_local! {
    static DEFAULTS: RefCell<GlobalMountOptions> = RefCell::new(GlobalMountOptions::default());
}

/// Set the defaults every mount starts from. Replaces previous defaults.
pub fn init(defaults: GlobalMountOptions) {
    DEFAULTS.with(|current| *current.borrow_mut() = defaults);
    log::debug!("mount defaults initialized");
}

/// Read or edit the defaults in place.
pub fn with_defaults<R>(f: impl FnOnce(&mut GlobalMountOptions) -> R) -> R {
    DEFAULTS.with(|current| f(&mut current.borrow_mut()))
}

/// Clear the defaults (for testing). Mount and unmount never do this.
pub fn reset() {
    DEFAULTS.with(|current| *current.borrow_mut() = GlobalMountOptions::default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{App, ComponentOptions};
    use crate::error::PluginError;

    fn noop(_: &mut App, _: &[Value]) -> Result<(), PluginError> {
        Ok(())
    }

    #[test]
    fn test_lists_concatenate_defaults_first() {
        let defaults = GlobalMountOptions::new()
            .plugin(noop)
            .mixin(Mixin::named("first"));
        let overrides = GlobalMountOptions::new()
            .plugin_with_args(noop, vec![Value::from(1)])
            .mixin(Mixin::named("second"));

        let merged = merge_global_options(&defaults, Some(&overrides));
        assert_eq!(merged.plugins.len(), 2);
        assert_eq!(merged.plugins[1].args, vec![Value::from(1)]);
        let names: Vec<_> = merged.mixins.iter().map(|m| m.name.as_deref()).collect();
        assert_eq!(names, vec![Some("first"), Some("second")]);
    }

    #[test]
    fn test_maps_merge_with_override_winning() {
        let defaults = GlobalMountOptions::new()
            .mock("$t", "default")
            .mock("$keep", 1)
            .config("mode", "a")
            .provide("theme", "light");
        let overrides = GlobalMountOptions::new()
            .mock("$t", "override")
            .config("mode", "b");

        let merged = merge_global_options(&defaults, Some(&overrides));
        assert_eq!(merged.mocks.get("$t"), Some(&Value::from("override")));
        assert_eq!(merged.mocks.get("$keep"), Some(&Value::Int(1)));
        assert_eq!(merged.config.get("mode"), Some(&Value::from("b")));
        assert_eq!(merged.provide.get(&InjectionKey::from("theme")), Some(&Value::from("light")));
    }

    #[test]
    fn test_stubs_merge() {
        let none = merge_global_options(&GlobalMountOptions::new(), Some(&GlobalMountOptions::new()));
        assert!(none.stubs.is_none());

        let defaults = GlobalMountOptions::new().stub("A").stub("B");
        let overrides = GlobalMountOptions::new().keep("b").stub_with("C", ComponentOptions::new());
        let merged = merge_global_options(&defaults, Some(&overrides));
        let stubs = merged.stubs.unwrap();
        assert_eq!(stubs.len(), 3);
        assert!(stubs
            .iter()
            .any(|(key, value)| matches!((key, value), (StubKey::Name(n), StubValue::Keep) if n == "B")));
    }

    #[test]
    fn test_defaults_layer() {
        reset();
        init(GlobalMountOptions::new().mock("$store", "s"));
        with_defaults(|defaults| {
            defaults.mocks.insert("$extra".into(), Value::Bool(true));
        });
        let merged = with_defaults(|defaults| merge_global_options(defaults, None));
        assert_eq!(merged.mocks.len(), 2);
        reset();
        assert!(with_defaults(|defaults| defaults.mocks.is_empty()));
    }
}
