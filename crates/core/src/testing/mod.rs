//! Testing utilities and mock implementations.
//!
//! This module provides a simulated analysis backend and an in-memory
//! artifact loader, allowing the admission controller and orchestrator to be
//! exercised without a real backend or filesystem.
//!
//! # Example
//!
//! ```rust,ignore
//! use fwfeed_core::testing::{fixtures, MemoryArtifactLoader, MockBackend};
//!
//! let backend = MockBackend::new();
//! let loader = MemoryArtifactLoader::new();
//!
//! loader.insert("r7000.chk", b"firmware bytes").await;
//! backend.set_analysis_probes(Some(3)).await;
//!
//! let records = vec![fixtures::record("Netgear", "r7000.chk")];
//! ```

mod mock_backend;
mod mock_loader;

pub use mock_backend::{BackendCall, MockBackend};
pub use mock_loader::MemoryArtifactLoader;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::BTreeSet;

    use crate::artifact::{epoch_sentinel, ArtifactRecord, PreparedArtifact};

    /// Create an artifact record with reasonable defaults.
    pub fn record(vendor: &str, file_name: &str) -> ArtifactRecord {
        ArtifactRecord {
            vendor: vendor.to_string(),
            device_name: format!("{} router", vendor),
            version: "1.0.0".to_string(),
            release_date: epoch_sentinel(),
            file_path: "firmware".to_string(),
            file_name: file_name.to_string(),
            tags: BTreeSet::new(),
        }
    }

    /// Create a prepared artifact with the given content.
    pub fn prepared(vendor: &str, file_name: &str, content: &[u8]) -> PreparedArtifact {
        PreparedArtifact::new(record(vendor, file_name), content.to_vec())
    }

    /// Distinct, deterministic firmware-like content.
    pub fn firmware_bytes(seed: u8, len: usize) -> Vec<u8> {
        (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
    }
}
