//! WebSocket protocol message types.
//!
//! This module defines the frames exchanged between the client and the
//! window service.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Client → Server | Window operation |
//! | `Response` | Server → Client | Operation outcome or broadcast |
//!
//! One JSON object per WebSocket text message. Responses carry the
//! `action` of the request they answer; there is no other correlation key,
//! so at most one request per action should be in flight at a time.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `action` | Known action tags |
//! | `request` | Request and Response types |
//! | `window` | `WindowInfo` record |

// ============================================================================
// Submodules
// ============================================================================

/// Known action tags.
pub mod action;

/// Request and Response message types.
pub mod request;

/// Window description record.
pub mod window;

// ============================================================================
// Re-exports
// ============================================================================

pub use action::Action;
pub use request::{Request, Response};
pub use window::WindowInfo;
