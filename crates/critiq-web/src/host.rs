//! Browser Host implementation
//!
//! Maps the `Host` trait onto the page the client runs in:
//!
//! - durable store → `window.localStorage`
//! - ephemeral store → `window.sessionStorage`
//! - page tree → `document`, walked into open shadow roots (component lookups go through the shadow root)
//! - navigation intent → bubbling, composed `navigate` `CustomEvent`
//! - deferred work → `setTimeout`, tasks → `wasm_bindgen_futures::spawn_local`

use critiq_core::constants::NAVIGATE_EVENT;
use critiq_host::{
    ClickHandler, Deferred, Host, HostError, LocalTask, LogLevel, NavigationIntent, StoreKind,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CustomEvent, CustomEventInit, Document, Element, Node, Storage, Window};

use crate::util::{self, describe};

/// `NodeFilter.SHOW_ELEMENT`
const SHOW_ELEMENT: u32 = 0x1;
/// `NodeFilter.SHOW_TEXT`
const SHOW_TEXT: u32 = 0x4;

fn window() -> Result<Window, HostError> {
    web_sys::window().ok_or_else(|| HostError::DomError(String::from("no window")))
}

fn document() -> Result<Document, HostError> {
    window()?
        .document()
        .ok_or_else(|| HostError::DomError(String::from("no document")))
}

fn storage(kind: StoreKind) -> Result<Storage, HostError> {
    let window = web_sys::window().ok_or(HostError::StorageUnavailable)?;
    let storage = match kind {
        StoreKind::Durable => window.local_storage(),
        StoreKind::Ephemeral => window.session_storage(),
    };
    match storage {
        Ok(Some(s)) => Ok(s),
        Ok(None) => Err(HostError::StorageUnavailable),
        Err(e) => Err(HostError::StorageError(describe(&e))),
    }
}

fn storage_error(e: JsValue) -> HostError {
    HostError::StorageError(describe(&e))
}

fn dom_error(e: JsValue) -> HostError {
    HostError::DomError(describe(&e))
}

fn selector_error(selector: &str, e: &JsValue) -> HostError {
    HostError::InvalidSelector(format!("{}: {}", selector, describe(e)))
}

/// Visit `root`'s descendants in tree order, entering each open shadow root
/// right after its host element.
///
/// `what_to_show` selects the nodes handed to `visit`; elements are always
/// walked so their shadow roots can be found.
fn walk_composed(
    document: &Document,
    root: &Node,
    what_to_show: u32,
    visit: &mut dyn FnMut(&Node) -> Result<(), HostError>,
) -> Result<(), HostError> {
    let walker = document
        .create_tree_walker_with_what_to_show(root, what_to_show | SHOW_ELEMENT)
        .map_err(dom_error)?;
    while let Some(node) = walker.next_node().map_err(dom_error)? {
        let shadow = node.dyn_ref::<Element>().and_then(|e| e.shadow_root());
        let is_element = node.node_type() == Node::ELEMENT_NODE;
        if !is_element || what_to_show & SHOW_ELEMENT != 0 {
            visit(&node)?;
        }
        if let Some(shadow) = shadow {
            let shadow_root: &Node = &shadow;
            walk_composed(document, shadow_root, what_to_show, visit)?;
        }
    }
    Ok(())
}

/// Browser Host
///
/// Stateless: every call resolves the global it needs, so it keeps working
/// if the page replaces `document.body`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebHost;

impl WebHost {
    pub fn new() -> Self {
        WebHost
    }
}

impl Host for WebHost {
    type Node = Node;

    fn store_get(&self, store: StoreKind, key: &str) -> Result<Option<String>, HostError> {
        storage(store)?.get_item(key).map_err(storage_error)
    }

    fn store_set(&self, store: StoreKind, key: &str, value: &str) -> Result<(), HostError> {
        storage(store)?.set_item(key, value).map_err(storage_error)
    }

    fn store_remove(&self, store: StoreKind, key: &str) -> Result<(), HostError> {
        storage(store)?.remove_item(key).map_err(storage_error)
    }

    fn store_clear(&self, store: StoreKind) -> Result<(), HostError> {
        storage(store)?.clear().map_err(storage_error)
    }

    fn query_all(&self, selector: &str) -> Result<Vec<Self::Node>, HostError> {
        let document = document()?;
        let root: &Node = &document;
        let mut found = Vec::new();
        walk_composed(&document, root, SHOW_ELEMENT, &mut |node| {
            if let Some(element) = node.dyn_ref::<Element>() {
                if element.matches(selector).map_err(|e| selector_error(selector, &e))? {
                    found.push(node.clone());
                }
            }
            Ok(())
        })?;
        Ok(found)
    }

    fn query_in_component(
        &self,
        component: &Self::Node,
        selector: &str,
    ) -> Result<Option<Self::Node>, HostError> {
        let element = component.dyn_ref::<Element>().ok_or(HostError::NodeNotFound)?;
        // Components without a shadow root render into light DOM
        let found = match element.shadow_root() {
            Some(root) => root.query_selector(selector),
            None => element.query_selector(selector),
        };
        found
            .map(|control| control.map(Node::from))
            .map_err(|e| selector_error(selector, &e))
    }

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), HostError> {
        node.dyn_ref::<Element>()
            .ok_or(HostError::NodeNotFound)?
            .set_attribute(name, value)
            .map_err(dom_error)
    }

    fn remove_node(&self, node: &Self::Node) -> Result<(), HostError> {
        if let Some(element) = node.dyn_ref::<Element>() {
            element.remove();
            return Ok(());
        }
        let parent = node.parent_node().ok_or(HostError::NodeNotFound)?;
        parent.remove_child(node).map(|_| ()).map_err(dom_error)
    }

    fn text_nodes(&self) -> Result<Vec<Self::Node>, HostError> {
        let document = document()?;
        let body = document
            .body()
            .ok_or_else(|| HostError::DomError(String::from("no body")))?;
        let root: &Node = &body;

        let mut nodes = Vec::new();
        walk_composed(&document, root, SHOW_TEXT, &mut |node| {
            nodes.push(node.clone());
            Ok(())
        })?;
        Ok(nodes)
    }

    fn text_content(&self, node: &Self::Node) -> Option<String> {
        node.text_content()
    }

    fn set_text_content(&self, node: &Self::Node, text: &str) -> Result<(), HostError> {
        node.set_text_content(Some(text));
        Ok(())
    }

    fn bind_click(&self, node: &Self::Node, handler: ClickHandler) -> Result<(), HostError> {
        let mut handler = handler;
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
            event.prevent_default();
            handler();
        });
        node.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())
            .map_err(dom_error)?;
        // Lives as long as the control
        closure.forget();
        Ok(())
    }

    fn location_path(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().pathname().ok())
            .unwrap_or_default()
    }

    fn dispatch_navigation(&self, intent: &NavigationIntent) -> Result<(), HostError> {
        let nav_error = |e: JsValue| HostError::NavigationError(describe(&e));

        let detail = js_sys::Object::new();
        js_sys::Reflect::set(&detail, &"route".into(), &JsValue::from_str(&intent.route))
            .map_err(nav_error)?;

        let init = CustomEventInit::new();
        init.set_bubbles(true);
        init.set_composed(true);
        init.set_detail(&detail);

        let event = CustomEvent::new_with_event_init_dict(NAVIGATE_EVENT, &init).map_err(nav_error)?;
        document()?.dispatch_event(&event).map_err(nav_error)?;
        Ok(())
    }

    fn hard_navigate(&self, route: &str) -> Result<(), HostError> {
        window()?
            .location()
            .set_href(route)
            .map_err(|e| HostError::NavigationError(describe(&e)))
    }

    fn confirm(&self, message: &str) -> bool {
        web_sys::window()
            .and_then(|w| w.confirm_with_message(message).ok())
            .unwrap_or(false)
    }

    fn alert(&self, message: &str) {
        let shown = match web_sys::window() {
            Some(window) => window.alert_with_message(message).map_err(|e| describe(&e)),
            None => Err(String::from("no window")),
        };
        if let Err(reason) = shown {
            util::warn(&format!("[web-host] alert failed: {}", reason));
        }
    }

    fn schedule(&self, delay_ms: u32, task: Deferred) {
        let window = match web_sys::window() {
            Some(w) => w,
            None => {
                util::error("[web-host] schedule: no window");
                return;
            }
        };
        let callback = Closure::once_into_js(move || task());
        if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            delay_ms as i32,
        ) {
            util::error(&format!("[web-host] setTimeout failed: {}", describe(&e)));
        }
    }

    fn spawn_local(&self, task: LocalTask) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn log(&self, level: LogLevel, msg: &str) {
        match level {
            LogLevel::Debug | LogLevel::Info => util::log(msg),
            LogLevel::Warn => util::warn(msg),
            LogLevel::Error => util::error(msg),
        }
    }
}
