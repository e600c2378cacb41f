//! Request and Response message types.
//!
//! Defines the frames exchanged with the window service. There is no
//! request id: a response is matched to its request by `action` alone.

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::{Action, WindowInfo};

// ============================================================================
// Request
// ============================================================================

/// A request frame from client to server.
///
/// # Format
///
/// ```json
/// {
///   "action": "create_window",
///   "label": "main",
///   "url": "https://example.com",
///   "transparent": true,
///   "always_on_top": false,
///   "params": { ... }
/// }
/// ```
///
/// Optional fields are omitted from the frame when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Operation tag, also the correlation key.
    pub action: String,

    /// Target window label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// URL to load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Transparent window background.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent: Option<bool>,

    /// Keep the window above others.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_on_top: Option<bool>,

    /// Free-form extra parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

impl Request {
    /// Creates a bare request for any action tag.
    #[inline]
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            label: None,
            url: None,
            transparent: None,
            always_on_top: None,
            params: None,
        }
    }

    /// Sets the target window label.
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the URL field.
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the transparency flag.
    #[inline]
    #[must_use]
    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = Some(transparent);
        self
    }

    /// Sets the always-on-top flag.
    #[inline]
    #[must_use]
    pub fn with_always_on_top(mut self, always_on_top: bool) -> Self {
        self.always_on_top = Some(always_on_top);
        self
    }

    /// Adds one entry to the `params` object.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Request - Canonical Constructors
// ============================================================================

impl Request {
    /// `create_window` request.
    #[must_use]
    pub fn create_window(label: &str, url: &str, transparent: bool) -> Self {
        Self::new(Action::CreateWindow)
            .with_label(label)
            .with_url(url)
            .with_transparent(transparent)
    }

    /// `close_window` request.
    #[must_use]
    pub fn close_window(label: &str) -> Self {
        Self::new(Action::CloseWindow).with_label(label)
    }

    /// `focus_window` request.
    #[must_use]
    pub fn focus_window(label: &str) -> Self {
        Self::new(Action::FocusWindow).with_label(label)
    }

    /// `list_windows` request.
    #[must_use]
    pub fn list_windows() -> Self {
        Self::new(Action::ListWindows)
    }

    /// `get_window_info` request.
    #[must_use]
    pub fn get_window_info(label: &str) -> Self {
        Self::new(Action::GetWindowInfo).with_label(label)
    }

    /// `reload_window` request.
    #[must_use]
    pub fn reload_window(label: &str) -> Self {
        Self::new(Action::ReloadWindow).with_label(label)
    }

    /// `navigate_window` request.
    #[must_use]
    pub fn navigate_window(label: &str, url: &str) -> Self {
        Self::new(Action::NavigateWindow)
            .with_label(label)
            .with_url(url)
    }

    /// `toggle_transparency` request.
    #[must_use]
    pub fn toggle_transparency(label: &str) -> Self {
        Self::new(Action::ToggleTransparency).with_label(label)
    }

    /// `toggle_always_on_top` request.
    #[must_use]
    pub fn toggle_always_on_top(label: &str) -> Self {
        Self::new(Action::ToggleAlwaysOnTop).with_label(label)
    }

    /// `set_always_on_top` request.
    #[must_use]
    pub fn set_always_on_top(label: &str, always_on_top: bool) -> Self {
        Self::new(Action::SetAlwaysOnTop)
            .with_label(label)
            .with_always_on_top(always_on_top)
    }

    /// `ping` request.
    #[must_use]
    pub fn ping() -> Self {
        Self::new(Action::Ping)
    }
}

// ============================================================================
// Response
// ============================================================================

/// A frame from server to client.
///
/// # Format
///
/// ```json
/// {
///   "success": true,
///   "message": "Window created",
///   "action": "create_window",
///   "data": { ... }
/// }
/// ```
///
/// Server broadcasts use the same shape. `success` and `message` default
/// when absent so that broadcasts without them still parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the server carried out the action.
    #[serde(default)]
    pub success: bool,

    /// Human-readable outcome.
    #[serde(default)]
    pub message: String,

    /// Action tag this frame answers or announces.
    pub action: String,

    /// Action-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    /// Parses one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the text is not JSON or lacks a
    /// string `action`.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::protocol(format!("Malformed frame: {e}")))
    }

    /// Returns `true` if the server reported success.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Converts a business failure into [`Error::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] when `success` is `false`.
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(Error::rejected(self.action, self.message))
        }
    }

    /// Decodes `data.windows` preserving server order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `data.windows` is missing or malformed.
    pub fn windows(&self) -> Result<Vec<WindowInfo>> {
        let windows = self
            .data
            .as_ref()
            .and_then(|data| data.get("windows"))
            .ok_or_else(|| Error::protocol("Response has no data.windows"))?;

        decode(windows)
    }

    /// Decodes `data` as a single window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `data` is missing or malformed.
    pub fn window(&self) -> Result<WindowInfo> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| Error::protocol("Response has no data"))?;

        decode(data)
    }

    /// Gets a string value from the data.
    ///
    /// Returns empty string if key not found or not a string.
    #[inline]
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.data
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a u64 value from the data.
    ///
    /// Returns 0 if key not found or not a number.
    #[inline]
    #[must_use]
    pub fn get_u64(&self, key: &str) -> u64 {
        self.data
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_u64())
            .unwrap_or_default()
    }

    /// Gets a boolean value from the data.
    ///
    /// Returns false if key not found or not a boolean.
    #[inline]
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.data
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_bool())
            .unwrap_or_default()
    }
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|e| Error::protocol(format!("Unexpected payload: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
