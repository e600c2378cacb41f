//! Action tags understood by the window service.
//!
//! The action tag selects server-side behavior and doubles as the
//! correlation key for responses.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Action
// ============================================================================

/// Known protocol actions.
///
/// Requests may also carry arbitrary action strings via
/// [`Request::new`](super::Request::new); this enum covers the ones the
/// client has typed wrappers for, plus server-pushed broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Open a new managed window.
    CreateWindow,
    /// Close a managed window.
    CloseWindow,
    /// Bring a window to the front.
    FocusWindow,
    /// List all managed windows.
    ListWindows,
    /// Fetch details for one window.
    GetWindowInfo,
    /// Reload a window's content.
    ReloadWindow,
    /// Point a window at a new URL.
    NavigateWindow,
    /// Flip a window's transparency.
    ToggleTransparency,
    /// Flip a window's always-on-top flag.
    ToggleAlwaysOnTop,
    /// Set a window's always-on-top flag explicitly.
    SetAlwaysOnTop,
    /// Liveness check.
    Ping,
    /// Server-pushed notification that the window set changed.
    WindowUpdate,
}

impl Action {
    /// Every known action, in declaration order.
    pub const ALL: [Action; 12] = [
        Action::CreateWindow,
        Action::CloseWindow,
        Action::FocusWindow,
        Action::ListWindows,
        Action::GetWindowInfo,
        Action::ReloadWindow,
        Action::NavigateWindow,
        Action::ToggleTransparency,
        Action::ToggleAlwaysOnTop,
        Action::SetAlwaysOnTop,
        Action::Ping,
        Action::WindowUpdate,
    ];

    /// Returns the wire tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateWindow => "create_window",
            Self::CloseWindow => "close_window",
            Self::FocusWindow => "focus_window",
            Self::ListWindows => "list_windows",
            Self::GetWindowInfo => "get_window_info",
            Self::ReloadWindow => "reload_window",
            Self::NavigateWindow => "navigate_window",
            Self::ToggleTransparency => "toggle_transparency",
            Self::ToggleAlwaysOnTop => "toggle_always_on_top",
            Self::SetAlwaysOnTop => "set_always_on_top",
            Self::Ping => "ping",
            Self::WindowUpdate => "window_update",
        }
    }

    /// Returns `true` for actions the server pushes unprompted.
    #[inline]
    #[must_use]
    pub const fn is_broadcast(&self) -> bool {
        matches!(self, Self::WindowUpdate)
    }

    /// Returns `true` if `tag` names a broadcast action.
    #[must_use]
    pub fn is_broadcast_tag(tag: &str) -> bool {
        tag.parse::<Action>().is_ok_and(|action| action.is_broadcast())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| Error::protocol(format!("Unknown action: {s}")))
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_matches_serde() {
        for action in Action::ALL {
            let json = serde_json::to_string(&action).expect("serialize");
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("ping".parse::<Action>().expect("parse"), Action::Ping);
        assert_eq!(
            "toggle_always_on_top".parse::<Action>().expect("parse"),
            Action::ToggleAlwaysOnTop
        );
        assert!("explode_window".parse::<Action>().is_err());
    }

    #[test]
    fn test_broadcast() {
        assert!(Action::WindowUpdate.is_broadcast());
        assert!(!Action::Ping.is_broadcast());
        assert!(Action::is_broadcast_tag("window_update"));
        assert!(!Action::is_broadcast_tag("list_windows"));
        assert!(!Action::is_broadcast_tag("unknown"));
    }
}
