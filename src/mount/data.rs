//! Lifecycle decorators for data overrides and mocked globals.

use crate::engine::Mixin;
use crate::types::PropsMap;

/// Overwrites the instance's data with `data` once it is created, so the
/// override wins over anything the component computes itself.
pub fn create_data_mixin(data: PropsMap) -> Mixin {
    Mixin::named("data-override").created(move |instance| {
        for (key, value) in &data {
            instance.set_data(key.clone(), value.clone());
        }
    })
}

/// Copies `mocks` onto every instance's globals before it is created.
pub fn create_mocks_mixin(mocks: PropsMap) -> Mixin {
    Mixin::named("mocks").before_create(move |instance| {
        for (key, value) in &mocks {
            instance.set_global(key.clone(), value.clone());
        }
    })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::engine::{Component, ComponentOptions, Instance, Slots};
    use crate::types::Value;

    fn instance() -> Instance {
        let component: Component = ComponentOptions::named("Host").into();
        Instance::new(0, component, PropsMap::new(), Slots::default(), Rc::default(), None)
    }

    #[test]
    fn test_data_mixin_overwrites_on_created() {
        let mixin = create_data_mixin(crate::props! { "count" => 5 });
        let mut target = instance();
        target.set_data("count", 0);
        target.set_data("other", "kept");

        let created = mixin.hooks.created.clone().unwrap();
        created(&mut target);
        assert_eq!(target.data().get("count"), Some(&Value::Int(5)));
        assert_eq!(target.data().get("other"), Some(&Value::from("kept")));
    }

    #[test]
    fn test_mocks_mixin_sets_globals() {
        let mixin = create_mocks_mixin(crate::props! { "$t" => "translated" });
        let mut target = instance();
        let before_create = mixin.hooks.before_create.clone().unwrap();
        before_create(&mut target);
        assert_eq!(target.global("$t"), Some(&Value::from("translated")));
    }
}
