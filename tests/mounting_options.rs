use std::cell::RefCell;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use futures::executor::block_on;
use proptest::prelude::*;
use spark_mount::{
    config, h, mount, props, reset_document, reset_registry, reset_scheduler, App, ComponentOptions,
    GlobalMountOptions, Mixin, MountError, MountTarget, MountingOptions, PluginError, SlotContent, Symbol,
    TemplateError, VNode, Value,
};

fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
    reset_document();
    reset_registry();
    reset_scheduler();
    config::reset();
}

fn show(key: &'static str) -> ComponentOptions {
    ComponentOptions::named("Show").render(move |ctx| {
        h("p")
            .text(ctx.prop(key).map(ToString::to_string).unwrap_or_default())
            .into()
    })
}

#[test]
fn options_and_function_components_both_render() {
    setup();
    let options = mount(show("msg"), MountingOptions::new().prop("msg", "options")).unwrap();
    assert_eq!(options.html(), "<p>options</p>");
    assert!(!options.is_functional());

    let function = mount(
        MountTarget::function(|props, _| {
            h("b")
                .text(props.get("msg").map(ToString::to_string).unwrap_or_default())
                .into()
        }),
        MountingOptions::new().prop("msg", "function"),
    )
    .unwrap();
    assert_eq!(function.html(), "<b>function</b>");
    assert!(function.is_functional());
}

#[test]
fn props_win_over_props_data_over_attrs() {
    setup();
    let wrapper = mount(
        show("x"),
        MountingOptions::new()
            .attr("x", 1)
            .props_data("x", 2)
            .prop("x", 3),
    )
    .unwrap();
    assert_eq!(wrapper.props().get("x"), Some(&Value::Int(3)));
    assert_eq!(wrapper.html(), "<p>3</p>");
}

#[test]
fn undeclared_keys_fall_through_as_attributes() {
    setup();
    let component = ComponentOptions::named("Labelled")
        .prop("label")
        .render(|ctx| {
            h("span")
                .attr("class", "base")
                .text(ctx.prop("label").map(ToString::to_string).unwrap_or_default())
                .into()
        });
    let wrapper = mount(
        component,
        MountingOptions::new()
            .prop("label", "l")
            .attr("class", "extra")
            .attr("title", "t"),
    )
    .unwrap();
    assert_eq!(wrapper.html(), "<span class=\"base extra\" title=\"t\">l</span>");
    assert!(wrapper.props().get("title").is_none());
}

#[test]
fn default_string_slot_renders_inside_the_slot_outlet() {
    setup();
    let card = ComponentOptions::named("Card")
        .with_template("<div class=\"card\"><slot>empty</slot></div>")
        .unwrap();
    let filled = mount(card.clone(), MountingOptions::new().slot("default", "Hello")).unwrap();
    assert_eq!(filled.html(), "<div class=\"card\">Hello</div>");

    let fallback = mount(card, MountingOptions::new()).unwrap();
    assert_eq!(fallback.html(), "<div class=\"card\">empty</div>");
}

#[test]
fn scoped_and_node_slots() {
    setup();
    let list = ComponentOptions::named("List").render(|ctx| {
        h("ul")
            .children(ctx.slot("item", &props! { "label" => "first" }))
            .children(ctx.slot("footer", &props! {}))
            .into()
    });
    let wrapper = mount(
        list,
        MountingOptions::new()
            .slot("item", "<template #item=\"row\"><li>{{ row.label }}</li></template>")
            .slot("footer", h("li").text("end")),
    )
    .unwrap();
    assert_eq!(wrapper.html(), "<ul><li>first</li><li>end</li></ul>");
}

#[test]
fn unknown_slot_content_is_ignored() {
    setup();
    let component = ComponentOptions::named("Maybe").render(|ctx| {
        if ctx.has_slot("default") {
            h("p").text("slot").into()
        } else {
            h("p").text("none").into()
        }
    });
    let wrapper = mount(component, MountingOptions::new().slot("default", SlotContent::Unknown)).unwrap();
    assert_eq!(wrapper.html(), "<p>none</p>");
}

#[test]
fn broken_slot_template_is_reported() {
    setup();
    let err = mount(show("x"), MountingOptions::new().slot("default", "<b>")).unwrap_err();
    assert!(matches!(err, MountError::Template(TemplateError::UnclosedElement { .. })));
}

#[test]
fn data_override_wins_over_component_data() {
    setup();
    let counter = ComponentOptions::named("Counter")
        .data(|| props! { "count" => 0, "step" => 1 })
        .with_template("<p>{{ count }}/{{ step }}</p>")
        .unwrap();
    let wrapper = mount(counter, MountingOptions::new().data(|| props! { "count" => 5 })).unwrap();
    assert_eq!(wrapper.html(), "<p>5/1</p>");
    assert_eq!(wrapper.vm().borrow().data().get("count"), Some(&Value::Int(5)));
}

#[test]
fn mocks_provides_and_config_reach_render() {
    setup();
    let key = Symbol::new("store");
    let render_key = key.clone();
    let component = ComponentOptions::named("Env").render(move |ctx| {
        let text = |value: Option<&Value>| value.map(ToString::to_string).unwrap_or_default();
        h("p")
            .text(text(ctx.global("$t")))
            .text(text(ctx.inject(&render_key)))
            .text(text(ctx.config("mode")))
            .into()
    });
    let global = GlobalMountOptions::new()
        .mock("$t", "T")
        .provide(&key, "S")
        .config("mode", "M");
    let wrapper = mount(component, MountingOptions::new().global(global)).unwrap();
    assert_eq!(wrapper.html(), "<p>TSM</p>");
}

#[test]
fn default_plugins_install_before_per_call_plugins() {
    setup();
    let log = Rc::new(RefCell::new(Vec::new()));
    let plugin = |name: &'static str, log: Rc<RefCell<Vec<String>>>| {
        move |_: &mut App, args: &[Value]| -> Result<(), PluginError> {
            log.borrow_mut().push(format!("{name}{}", args.len()));
            Ok(())
        }
    };
    config::init(GlobalMountOptions::new().plugin(plugin("defaults", log.clone())));
    let per_call = GlobalMountOptions::new().plugin_with_args(plugin("call", log.clone()), vec![Value::Null]);

    mount(show("x"), MountingOptions::new().global(per_call)).unwrap();
    assert_eq!(*log.borrow(), vec!["defaults0".to_string(), "call1".to_string()]);
}

#[test]
fn global_components_resolve_from_templates() {
    setup();
    let badge = ComponentOptions::named("Badge").render(|_| h("em").text("b").into());
    let panel = ComponentOptions::named("Panel")
        .with_template("<div><my-badge></my-badge></div>")
        .unwrap();
    let wrapper = mount(
        panel,
        MountingOptions::new().global(GlobalMountOptions::new().component("MyBadge", badge)),
    )
    .unwrap();
    assert_eq!(wrapper.html(), "<div><em>b</em></div>");
}

#[test]
fn global_components_shadow_local_registrations() {
    setup();
    let local = ComponentOptions::named("Child").render(|_| h("span").text("local").into());
    let global = ComponentOptions::named("Child").render(|_| h("span").text("global").into());
    let parent = ComponentOptions::named("Parent")
        .component("Child", local)
        .with_template("<div><child></child></div>")
        .unwrap();

    let wrapper = mount(
        parent,
        MountingOptions::new().global(GlobalMountOptions::new().component("Child", global)),
    )
    .unwrap();
    assert_eq!(wrapper.html(), "<div><span>global</span></div>");
}

#[test]
fn default_mixins_run_before_per_call_mixins() {
    setup();
    let log = Rc::new(RefCell::new(Vec::new()));
    let mixin = |label: &'static str, log: Rc<RefCell<Vec<String>>>| {
        Mixin::named(label).before_create(move |instance| {
            if instance.name() == Some("Show") {
                log.borrow_mut().push(label.to_string());
            }
        })
    };
    config::init(GlobalMountOptions::new().mixin(mixin("defaults", log.clone())));
    let per_call = GlobalMountOptions::new().mixin(mixin("call", log.clone()));

    mount(show("x"), MountingOptions::new().global(per_call)).unwrap();
    assert_eq!(*log.borrow(), vec!["defaults".to_string(), "call".to_string()]);
}

#[test]
fn set_props_is_visible_after_next_tick() {
    setup();
    let wrapper = mount(show("msg"), MountingOptions::new().prop("msg", "a")).unwrap();

    let tick = wrapper.set_props(props! { "msg" => "b" });
    assert_eq!(wrapper.html(), "<p>a</p>");
    block_on(tick);
    assert_eq!(wrapper.html(), "<p>b</p>");
}

#[test]
fn a_panicking_rerender_does_not_stall_later_updates() {
    setup();
    let boom = ComponentOptions::named("Boom")
        .mounted(|_| panic!("child failed to mount"))
        .render(|_| h("i").into());
    let counter = ComponentOptions::named("Counter").prop("n").render(move |ctx| {
        let n = ctx.prop("n").and_then(Value::as_int).unwrap_or(0);
        if n == 2 {
            h("p").child(VNode::component(boom.clone())).into()
        } else {
            h("p").text(n.to_string()).into()
        }
    });

    let first = mount(counter.clone(), MountingOptions::new().prop("n", 1)).unwrap();
    let tick = first.set_props(props! { "n" => 2 });
    assert!(catch_unwind(AssertUnwindSafe(|| block_on(tick))).is_err());

    let second = mount(counter, MountingOptions::new().prop("n", 1)).unwrap();
    block_on(second.set_props(props! { "n" => 5 }));
    assert_eq!(second.html(), "<p>5</p>");
}

#[test]
fn emitted_events_are_recorded() {
    setup();
    let button = ComponentOptions::named("Button")
        .emits("press")
        .mounted(|instance| instance.emit("press", &[Value::from("mounted")]))
        .render(|_| VNode::from(h("button")));
    let wrapper = mount(button, MountingOptions::new()).unwrap();
    assert_eq!(
        wrapper.emitted_by("press"),
        Some(vec![vec![Value::from("mounted")]])
    );
}

proptest! {
    #[test]
    fn set_props_reflects_every_key(
        updates in prop::collection::btree_map(
            prop::sample::select(vec!["a", "b", "c"]),
            any::<i64>(),
            0..=3,
        )
    ) {
        setup();
        let component = ComponentOptions::named("Triple")
            .props(["a", "b", "c"])
            .render(|_| h("div").into());
        let wrapper = mount(
            component,
            MountingOptions::new().prop("a", 0).prop("b", 0).prop("c", 0),
        )
        .unwrap();

        let updates: BTreeMap<&str, i64> = updates;
        let map = updates.iter().map(|(k, v)| (k.to_string(), Value::Int(*v))).collect();
        block_on(wrapper.set_props(map));

        let resolved = wrapper.props();
        for (key, value) in &updates {
            prop_assert_eq!(resolved.get(*key), Some(&Value::Int(*value)));
        }
    }
}
