//! Browser tests for WebHost
//!
//! Run with `wasm-pack test --headless --firefox crates/critiq-web`.

#![cfg(target_arch = "wasm32")]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use critiq_core::publications::marker_selector;
use critiq_host::{Host, NavigationIntent, StoreKind};
use critiq_web::WebHost;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Element, EventInit, Node, ShadowRoot, ShadowRootInit, ShadowRootMode};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
    web_sys::window().unwrap().document().unwrap()
}

/// Append a `div` to the body, optionally with an open shadow root holding `shadow_html`
fn mount(light_html: &str, shadow_html: Option<&str>) -> (Element, Option<ShadowRoot>) {
    let doc = document();
    let element = doc.create_element("div").unwrap();
    element.set_inner_html(light_html);
    let shadow = shadow_html.map(|html| {
        let root = element
            .attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))
            .unwrap();
        root.set_inner_html(html);
        root
    });
    doc.body().unwrap().append_child(&element).unwrap();
    (element, shadow)
}

#[wasm_bindgen_test]
fn test_durable_store_set_get_remove() {
    let host = WebHost::new();
    host.store_set(StoreKind::Durable, "critiq-test", "v").unwrap();
    assert_eq!(
        host.store_get(StoreKind::Durable, "critiq-test").unwrap().as_deref(),
        Some("v")
    );
    host.store_remove(StoreKind::Durable, "critiq-test").unwrap();
    assert_eq!(host.store_get(StoreKind::Durable, "critiq-test").unwrap(), None);
}

#[wasm_bindgen_test]
fn test_marker_query_in_document_order() {
    let host = WebHost::new();
    let doc = document();
    let body = doc.body().unwrap();
    let first = doc.create_element("div").unwrap();
    let second = doc.create_element("div").unwrap();
    body.append_child(&first).unwrap();
    body.append_child(&second).unwrap();
    let first_node: &web_sys::Node = first.as_ref();
    let second_node: &web_sys::Node = second.as_ref();

    host.set_attribute(first_node, "data-page-route", "/wasm-test").unwrap();
    host.set_attribute(second_node, "data-page-route", "/wasm-test").unwrap();

    let found = host.query_all(&marker_selector("data-page-route", "/wasm-test")).unwrap();
    assert_eq!(found.len(), 2);
    assert!(found[0].is_same_node(Some(first_node)));

    host.remove_node(&found[1]).unwrap();
    host.remove_node(&found[0]).unwrap();
    assert!(host
        .query_all(&marker_selector("data-page-route", "/wasm-test"))
        .unwrap()
        .is_empty());
}

#[wasm_bindgen_test]
fn test_navigation_intent_reaches_document_listener() {
    let host = WebHost::new();
    let seen = Rc::new(RefCell::new(None::<String>));
    let seen_in_listener = Rc::clone(&seen);
    let listener = Closure::<dyn FnMut(web_sys::CustomEvent)>::new(move |event: web_sys::CustomEvent| {
        let route = js_sys::Reflect::get(&event.detail(), &"route".into())
            .ok()
            .and_then(|r| r.as_string());
        *seen_in_listener.borrow_mut() = route;
    });
    document()
        .add_event_listener_with_callback("navigate", listener.as_ref().unchecked_ref())
        .unwrap();

    host.dispatch_navigation(&NavigationIntent::new("/login")).unwrap();

    assert_eq!(seen.borrow().as_deref(), Some("/login"));
    document()
        .remove_event_listener_with_callback("navigate", listener.as_ref().unchecked_ref())
        .unwrap();
}

#[wasm_bindgen_test]
fn test_query_in_component_uses_shadow_root_then_light_dom() {
    let host = WebHost::new();
    let (shadowed, shadow) = mount("", Some(r#"<button id="logout-btn">Log out</button>"#));
    let (light, _) = mount(r#"<button id="logout-btn">Log out</button>"#, None);
    let shadow_node: &Node = shadow.as_ref().unwrap();
    let light_node: &Node = &light;

    let in_shadow = host.query_in_component(&shadowed, "#logout-btn").unwrap().unwrap();
    assert!(in_shadow.parent_node().unwrap().is_same_node(Some(shadow_node)));

    let in_light = host.query_in_component(&light, "#logout-btn").unwrap().unwrap();
    assert!(in_light.parent_node().unwrap().is_same_node(Some(light_node)));

    assert!(host.query_in_component(&light, "#missing").unwrap().is_none());
    assert!(matches!(
        host.query_in_component(&light, "[["),
        Err(critiq_host::HostError::InvalidSelector(_))
    ));

    shadowed.remove();
    light.remove();
}

#[wasm_bindgen_test]
fn test_query_all_enters_open_shadow_roots() {
    let host = WebHost::new();
    let (outer, _) = mount(r#"<span data-page-route="/shadow-test"></span>"#, None);
    let (shadowed, _) = mount("", Some(r#"<section data-page-route="/shadow-test"></section>"#));

    let found = host.query_all(&marker_selector("data-page-route", "/shadow-test")).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].node_name(), "SPAN");
    assert_eq!(found[1].node_name(), "SECTION");

    outer.remove();
    shadowed.remove();
}

#[wasm_bindgen_test]
fn test_bound_click_prevents_default_and_runs_handler() {
    let host = WebHost::new();
    let (button, _) = mount("", None);
    let clicks = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&clicks);
    host.bind_click(&button, Box::new(move || counter.set(counter.get() + 1)))
        .unwrap();

    let init = EventInit::new();
    init.set_bubbles(true);
    init.set_cancelable(true);
    let event = web_sys::Event::new_with_event_init_dict("click", &init).unwrap();
    let not_cancelled = button.dispatch_event(&event).unwrap();

    assert!(!not_cancelled);
    assert!(event.default_prevented());
    assert_eq!(clicks.get(), 1);

    button.remove();
}

#[wasm_bindgen_test]
fn test_text_nodes_include_shadow_text_and_can_be_rewritten() {
    let host = WebHost::new();
    let (element, shadow) = mount("critiq light text", Some("<p>critiq shadow text</p>"));

    let nodes = host.text_nodes().unwrap();
    let find = |text: &str| {
        nodes
            .iter()
            .find(|n| host.text_content(n).as_deref() == Some(text))
            .cloned()
    };
    assert!(find("critiq light text").is_some());
    let shadow_text = find("critiq shadow text").unwrap();

    host.set_text_content(&shadow_text, "rewritten").unwrap();
    let shadow_node: &Node = shadow.as_ref().unwrap();
    assert_eq!(shadow_node.text_content().as_deref(), Some("rewritten"));

    element.remove();
}
