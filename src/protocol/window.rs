//! Window description returned by `list_windows` and `get_window_info`.

use serde::{Deserialize, Serialize};

/// One managed window as reported by the server.
///
/// # Format
///
/// ```json
/// {
///   "label": "main",
///   "url": "https://example.com",
///   "title": "Example",
///   "created_at": 1700000000,
///   "is_visible": true,
///   "is_focused": false,
///   "is_transparent": true,
///   "is_always_on_top": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Unique window label.
    pub label: String,
    /// Currently loaded URL.
    pub url: String,
    /// Document title.
    #[serde(default)]
    pub title: String,
    /// Creation time in unix seconds.
    pub created_at: u64,
    /// Whether the window is shown.
    #[serde(default)]
    pub is_visible: bool,
    /// Whether the window has focus.
    #[serde(default)]
    pub is_focused: bool,
    /// Whether the window background is transparent.
    #[serde(default)]
    pub is_transparent: bool,
    /// Whether the window stays above others.
    #[serde(default)]
    pub is_always_on_top: bool,
}
