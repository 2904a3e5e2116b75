//! Error types for the reporting engine

use thiserror::Error;

/// Errors that can occur in the reporting engine
#[derive(Error, Debug)]
pub enum ReportingError {
    /// No free slot left in the reporting table
    #[error("reporting table full ({capacity} entries) configuring cluster 0x{cluster_id:04X} attribute 0x{attr_id:04X}")]
    TableFull {
        capacity: usize,
        cluster_id: u16,
        attr_id: u16,
    },

    /// Attribute not registered in the attribute store; the cluster must be
    /// registered before reporting is configured, so this is an invariant
    /// violation rather than a recoverable condition.
    #[error("attribute 0x{attr_id:04X} not registered on endpoint {endpoint} cluster 0x{cluster_id:04X}")]
    AttributeMissing {
        endpoint: u8,
        cluster_id: u16,
        attr_id: u16,
    },

    /// Reporting configuration not found
    #[error("no reporting entry for endpoint {endpoint} cluster 0x{cluster_id:04X} attribute 0x{attr_id:04X}")]
    EntryNotFound {
        endpoint: u8,
        cluster_id: u16,
        attr_id: u16,
    },

    /// The engine task has shut down and can no longer accept commands
    #[error("reporting engine stopped")]
    EngineStopped,

    /// IO error (persistence)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
