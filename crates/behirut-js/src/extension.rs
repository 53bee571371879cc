//! Thin bindings to the WebExtension APIs the content script uses.
//!
//! Both the promise-returning `browser` namespace and Chrome's `chrome`
//! namespace are accepted; `browser` wins when both exist.

use behirut_core::{Message, Settings};
use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::error::{ContentError, describe};

fn api_root() -> Result<JsValue, ContentError> {
    let global = js_sys::global();
    for name in ["browser", "chrome"] {
        if let Ok(value) = Reflect::get(&global, &JsValue::from_str(name)) {
            if value.is_object() {
                return Ok(value);
            }
        }
    }
    Err(ContentError::MissingApi("browser"))
}

/// Walk `path` from `root`, requiring an object at every step.
fn lookup(root: &JsValue, path: &'static str) -> Result<JsValue, ContentError> {
    let mut current = root.clone();
    for key in path.split('.') {
        current = Reflect::get(&current, &JsValue::from_str(key))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
            .ok_or(ContentError::MissingApi(path))?;
    }
    Ok(current)
}

fn function(root: &JsValue, path: &'static str) -> Result<Function, ContentError> {
    lookup(root, path)?
        .dyn_into::<Function>()
        .map_err(|_| ContentError::MissingApi(path))
}

/// Read the full synced settings snapshot.
pub async fn read_settings() -> Result<Settings, ContentError> {
    let api = api_root()?;
    let sync = lookup(&api, "storage.sync")?;
    let get = function(&api, "storage.sync.get")?;

    let returned = get
        .call1(&sync, &JsValue::NULL)
        .map_err(|e| ContentError::Storage(describe(&e)))?;
    let promise = returned
        .dyn_into::<Promise>()
        .map_err(|_| ContentError::Storage("storage.sync.get did not return a promise".into()))?;
    let value = JsFuture::from(promise)
        .await
        .map_err(|e| ContentError::Storage(describe(&e)))?;

    serde_wasm_bindgen::from_value(value).map_err(|e| ContentError::decode("settings", e))
}

/// Decode one runtime message.
pub fn decode_message(value: JsValue) -> Result<Message, ContentError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| ContentError::decode("message", e))
}

/// Register `handler` on `runtime.onMessage` for the lifetime of the page.
pub fn on_message(handler: impl FnMut(JsValue) + 'static) -> Result<(), ContentError> {
    let api = api_root()?;
    let event = lookup(&api, "runtime.onMessage")?;
    let add_listener = function(&api, "runtime.onMessage.addListener")?;

    let mut handler = handler;
    let closure = Closure::wrap(Box::new(move |message: JsValue, _sender: JsValue| {
        handler(message);
    }) as Box<dyn FnMut(JsValue, JsValue)>);

    add_listener
        .call1(&event, closure.as_ref().unchecked_ref())
        .map_err(|e| ContentError::Call(describe(&e)))?;
    closure.forget();
    Ok(())
}
