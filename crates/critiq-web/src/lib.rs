//! Browser bindings for the Critiq client core
//!
//! This crate runs on the page's main thread and exposes the session and
//! publication services to the UI components through wasm-bindgen.
//!
//! ## Module Structure
//!
//! - `host` - `WebHost`, the browser implementation of `critiq_host::Host`
//! - `auth` - `JsAuthProvider`, on-demand bridge to the JS auth provider
//! - `util` - console bindings and JS error formatting
//!
//! ## Service Handle
//!
//! The services are built on first use and live for the rest of the page.
//! `configure` may replace the defaults, but only before that first use.
//!
//! ```text
//! UI component ──mount──► initializeForComponent ──► PublicationConsistencyService
//!                                                          │ getCurrentUser
//!                                                          ▼
//! logout control ──click──► confirm ──► performLogout ──► SessionService ──► navigate event
//! ```

mod auth;
mod host;
mod util;

use std::cell::{OnceCell, RefCell};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::rc::Rc;

use critiq_core::{ConfigError, CoreConfig, CoreServices, Identity, PublicationRecord, SessionService};
use wasm_bindgen::prelude::*;

pub use auth::{JsAuthProvider, AUTH_BRIDGE_GLOBAL};
pub use host::WebHost;

thread_local! {
    static CONFIG_OVERRIDE: RefCell<Option<CoreConfig>> = const { RefCell::new(None) };
    static SERVICES: OnceCell<CoreServices<WebHost>> = const { OnceCell::new() };
}

/// Run `f` against the page's services, building them on first use
fn with_services<R>(f: impl FnOnce(&CoreServices<WebHost>) -> R) -> R {
    SERVICES.with(|cell| {
        let services = cell.get_or_init(|| {
            let config = CONFIG_OVERRIDE
                .with(|c| c.borrow_mut().take())
                .unwrap_or_default();
            CoreServices::new(Rc::new(WebHost::new()), Rc::new(JsAuthProvider::new()), config)
        });
        f(services)
    })
}

fn to_js(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Serialize to a plain JS value through JSON
fn to_js_value<T: serde::Serialize>(value: &T) -> JsValue {
    serde_json::to_string(value)
        .ok()
        .and_then(|json| js_sys::JSON::parse(&json).ok())
        .unwrap_or(JsValue::NULL)
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Override the default configuration with a JSON object
#[wasm_bindgen]
pub fn configure(json: &str) -> Result<(), JsValue> {
    if SERVICES.with(|cell| cell.get().is_some()) {
        return Err(to_js(ConfigError::AlreadyInitialized));
    }
    let config = CoreConfig::from_json(json).map_err(to_js)?;
    CONFIG_OVERRIDE.with(|c| *c.borrow_mut() = Some(config));
    Ok(())
}

/// Page load hook: installs the panic hook and runs the sync bootstrap
#[wasm_bindgen]
pub fn start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    with_services(|services| {
        services.sync.start();
    });
}

// =============================================================================
// Session
// =============================================================================

#[wasm_bindgen(js_name = isAuthenticated)]
pub fn is_authenticated() -> bool {
    with_services(|services| services.session.is_authenticated())
}

/// The resident Identity as a plain object, or `null`
#[wasm_bindgen(js_name = getCurrentUser)]
pub fn get_current_user() -> JsValue {
    match with_services(|services| services.session.get_current_user()) {
        Some(identity) => to_js_value(&identity),
        None => JsValue::NULL,
    }
}

/// Persist a login. `tokens_json` is an optional `{ key: value }` object.
#[wasm_bindgen(js_name = recordLogin)]
pub fn record_login(identity_json: &str, tokens_json: Option<String>) -> Result<(), JsValue> {
    let identity: Identity = serde_json::from_str(identity_json).map_err(to_js)?;
    let tokens: BTreeMap<String, String> = match tokens_json {
        Some(json) => serde_json::from_str(&json).map_err(to_js)?,
        None => BTreeMap::new(),
    };
    let pairs: Vec<(&str, &str)> = tokens.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    with_services(|services| services.session.record_login(&identity, &pairs)).map_err(to_js)
}

#[wasm_bindgen(js_name = requireAuthenticated)]
pub fn require_authenticated() -> bool {
    with_services(|services| services.session.require_authenticated())
}

/// Resolves to `true` unless local cleanup failed
#[wasm_bindgen(js_name = performLogout)]
pub fn perform_logout() -> js_sys::Promise {
    let session = with_services(|services| Rc::clone(&services.session));
    wasm_bindgen_futures::future_to_promise(async move {
        let ok = session.perform_logout().await.is_ok();
        Ok(JsValue::from_bool(ok))
    })
}

#[wasm_bindgen(js_name = setupLogoutButton)]
pub fn setup_logout_button(selector: &str, component: &web_sys::HtmlElement) -> bool {
    let node: &web_sys::Node = component.as_ref();
    with_services(|services| SessionService::setup_logout_button(&services.session, selector, node))
}

// =============================================================================
// Publications
// =============================================================================

/// Records of `username`, or of the active identity when omitted
#[wasm_bindgen(js_name = filterUserPublications)]
pub fn filter_user_publications(username: Option<String>) -> JsValue {
    let records = with_services(|services| {
        services
            .publications
            .filter_user_publications(username.as_deref())
    });
    to_js_value(&records)
}

/// Returns the number of records dropped
#[wasm_bindgen(js_name = cleanOtherUsersPublications)]
pub fn clean_other_users_publications() -> Result<u32, JsValue> {
    with_services(|services| services.publications.clean_other_users_publications())
        .map(|dropped| dropped as u32)
        .map_err(to_js)
}

#[wasm_bindgen(js_name = recordPublication)]
pub fn record_publication(record_json: &str) -> Result<(), JsValue> {
    let record: PublicationRecord = serde_json::from_str(record_json).map_err(to_js)?;
    with_services(|services| services.publications.record_publication(record)).map_err(to_js)
}

/// Returns the number of duplicate mounts removed
#[wasm_bindgen(js_name = preventPageDuplication)]
pub fn prevent_page_duplication() -> Result<u32, JsValue> {
    with_services(|services| services.publications.prevent_page_duplication())
        .map(|removed| removed as u32)
        .map_err(to_js)
}

#[wasm_bindgen(js_name = initializeForComponent)]
pub fn initialize_for_component(component: &web_sys::HtmlElement) {
    let node: &web_sys::Node = component.as_ref();
    with_services(|services| services.publications.initialize_for_component(node));
}

#[wasm_bindgen(js_name = cleanFirebaseVisualElements)]
pub fn clean_firebase_visual_elements() -> u32 {
    with_services(|services| services.publications.clean_firebase_visual_elements()) as u32
}
