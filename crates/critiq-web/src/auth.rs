//! Bridge to the JavaScript authentication provider
//!
//! The provider is looked up on `window.CritiqAuth` at the moment of the
//! call, so a page that loads it late (or never) still gets a clean answer.
//! `logoutUser()` may return a promise or a plain `{ success }` object.

use critiq_host::{AuthFuture, AuthProvider, HostError, RemoteLogoutResponse};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::util::describe;

/// Global the provider module registers itself under
pub const AUTH_BRIDGE_GLOBAL: &str = "CritiqAuth";

#[derive(Clone, Copy, Debug, Default)]
pub struct JsAuthProvider;

impl JsAuthProvider {
    pub fn new() -> Self {
        JsAuthProvider
    }
}

/// Resolve `window.CritiqAuth` and its `logoutUser` function
fn resolve_logout() -> Result<(JsValue, js_sys::Function), HostError> {
    let window = web_sys::window().ok_or(HostError::ProviderUnavailable)?;
    let bridge = js_sys::Reflect::get(&window, &AUTH_BRIDGE_GLOBAL.into())
        .ok()
        .filter(|b| !b.is_undefined() && !b.is_null())
        .ok_or(HostError::ProviderUnavailable)?;
    let logout = js_sys::Reflect::get(&bridge, &"logoutUser".into())
        .ok()
        .and_then(|f| f.dyn_into::<js_sys::Function>().ok())
        .ok_or(HostError::ProviderUnavailable)?;
    Ok((bridge, logout))
}

async fn logout_via_bridge() -> Result<RemoteLogoutResponse, HostError> {
    let (bridge, logout) = resolve_logout()?;
    let returned = logout
        .call0(&bridge)
        .map_err(|e| HostError::RemoteError(describe(&e)))?;
    let answer = JsFuture::from(js_sys::Promise::resolve(&returned))
        .await
        .map_err(|e| HostError::RemoteError(describe(&e)))?;

    let success = js_sys::Reflect::get(&answer, &"success".into())
        .ok()
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let message = js_sys::Reflect::get(&answer, &"message".into())
        .ok()
        .and_then(|v| v.as_string());
    Ok(RemoteLogoutResponse { success, message })
}

impl AuthProvider for JsAuthProvider {
    fn logout_user(&self) -> AuthFuture {
        Box::pin(logout_via_bridge())
    }
}
