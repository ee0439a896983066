//! State module for the sync engine
//!
//! # Components
//!
//! - `Credentials`: session cookie, derived CSRF token, bearer token and operation ids
//! - `RunState`: single-flight flag, resumable cursor and retry count of the current chain

mod credentials;
mod run_state;

// Re-export main types
pub use credentials::{extract_csrf_token, ApiIdentifiers, Credentials};
pub use run_state::{RunGuard, RunState};
