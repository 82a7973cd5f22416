//! Transparency module for the ShaftSense Agent.
//!
//! Exposes what the agent processed during tracking, as aggregate counts.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
