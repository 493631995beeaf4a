//! Browser bindings over `web-sys`.
//!
//! [`WebFrame`] reads the frame's location and referrer, [`WebPort`] posts to
//! `window.parent`, and [`MessageListener`] turns `message` events into
//! [`InboundEvent`]s. The listener is removed when dropped.
//!
//! The confirmation poller needs a tokio runtime and is not hosted here.

use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::{Closure, JsValue};
use web_sys::{MessageEvent, Window};

use crate::channel::{InboundEvent, MessagePort, PortError};
use crate::origin::{FrameAccessError, FrameEnvironment};

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

/// The current browsing context.
#[derive(Debug, Clone)]
pub struct WebFrame {
    window: Window,
}

impl WebFrame {
    /// Wraps the global `window`, if there is one.
    #[must_use]
    pub fn current() -> Option<Self> {
        web_sys::window().map(|window| Self { window })
    }
}

impl FrameEnvironment for WebFrame {
    fn referrer(&self) -> Option<String> {
        self.window
            .document()
            .map(|doc| doc.referrer())
            .filter(|r| !r.is_empty())
    }

    fn parent_origin(&self) -> Result<String, FrameAccessError> {
        let parent = self
            .window
            .parent()
            .map_err(|e| FrameAccessError::CrossOrigin(describe(&e)))?
            .ok_or(FrameAccessError::NoParent)?;
        parent
            .location()
            .origin()
            .map_err(|e| FrameAccessError::CrossOrigin(describe(&e)))
    }

    fn ancestor_origins(&self) -> Vec<String> {
        let Ok(list) = self.window.location().ancestor_origins() else {
            return Vec::new();
        };
        (0..list.length()).filter_map(|i| list.get(i)).collect()
    }

    fn own_origin(&self) -> String {
        self.window.location().origin().unwrap_or_default()
    }
}

/// Posts to `window.parent`.
#[derive(Debug, Clone)]
pub struct WebPort {
    window: Window,
}

impl WebPort {
    /// Wraps the global `window`, if there is one.
    #[must_use]
    pub fn current() -> Option<Self> {
        web_sys::window().map(|window| Self { window })
    }
}

impl MessagePort for WebPort {
    fn post(&self, message: &Value, target_origin: &str) -> Result<(), PortError> {
        let parent = self
            .window
            .parent()
            .map_err(|e| PortError(describe(&e)))?
            .ok_or_else(|| PortError("frame has no parent".to_owned()))?;
        let data = message
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| PortError(e.to_string()))?;
        parent
            .post_message(&data, target_origin)
            .map_err(|e| PortError(describe(&e)))
    }
}

/// A `message` event listener on the window.
pub struct MessageListener {
    window: Window,
    callback: Closure<dyn FnMut(MessageEvent)>,
}

impl std::fmt::Debug for MessageListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageListener").finish_non_exhaustive()
    }
}

impl MessageListener {
    /// Installs `handler` for every `message` event.
    ///
    /// Event data that cannot be represented as JSON is passed on as `null`
    /// and will be rejected by the channel.
    ///
    /// # Errors
    ///
    /// Returns the browser's error if the listener cannot be added.
    pub fn install<F>(window: Window, mut handler: F) -> Result<Self, JsValue>
    where
        F: FnMut(InboundEvent) + 'static,
    {
        let parent: Option<JsValue> = window.parent().ok().flatten().map(Into::into);
        let callback = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let from_parent = match (event.source(), parent.as_ref()) {
                (Some(source), Some(parent)) => js_sys::Object::is(&source, parent),
                _ => false,
            };
            let data = serde_wasm_bindgen::from_value(event.data()).unwrap_or(Value::Null);
            handler(InboundEvent {
                origin: event.origin(),
                from_parent,
                data,
            });
        });
        window.add_event_listener_with_callback("message", callback.as_ref().unchecked_ref())?;
        Ok(Self { window, callback })
    }
}

impl Drop for MessageListener {
    fn drop(&mut self) {
        let _ = self
            .window
            .remove_event_listener_with_callback("message", self.callback.as_ref().unchecked_ref());
    }
}
