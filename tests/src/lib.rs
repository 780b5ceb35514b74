//! # Cluster-Sync Test Suite
//!
//! Unified test crate exercising several crates together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs         # Multi-node cluster builder
//! └── integration/
//!     ├── scenarios.rs   # Blacklist, switch-gated handler, partial timeout
//!     ├── commands.rs    # Correlation, control commands, concurrency
//!     ├── config_sync.rs # Configuration propagation between nodes
//!     ├── provisioning.rs    # Bundles, repositories and features
//!     └── remote_services.rs # Exported services called across nodes
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cs-tests
//! cargo test -p cs-tests integration::scenarios::
//! cargo bench -p cs-tests
//! ```

pub mod harness;
pub mod integration;
