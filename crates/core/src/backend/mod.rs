//! Analysis backend abstraction.
//!
//! This module provides the `AnalysisBackend` trait describing the three
//! backend calls the orchestrator needs (status, lookup, submit), the
//! `fetch_status` helper that waits for a warm backend, and the FACT HTTP
//! implementation.

mod fact;
mod status;
mod types;

pub use fact::FactClient;
pub use status::fetch_status;
pub use types::*;
