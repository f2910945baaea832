//! Admission control towards the backend's analysis queue.
//!
//! The controller decides per artifact whether to skip or submit it and,
//! once submitted, holds the batch back until the backend has fewer than the
//! configured number of analyses running.

mod controller;
mod types;

pub use controller::AdmissionController;
pub use types::{AdmissionError, AdmissionPhase, Disposition};
