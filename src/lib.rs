// src/lib.rs
//
// Crate root: module layout plus re-exports of the public API.

// ===== Core Public API =====
// This is the main stable API that external users should use
pub mod api;

// Re-export the main API at the crate root for convenience
pub use api::*;

// ===== Internal Modules (Implementation) =====
// These are public for internal use but may change without notice

pub mod clock;
pub mod config;
pub mod constants;
pub mod rotation;

// Histogram-backed instruments
pub mod metrics;

pub mod counter;
pub mod snapshot_cache;
pub mod top;
