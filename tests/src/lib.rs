//! # Flashcards Platform Test Suite
//!
//! Flows that span both services, driven in-process through their routers.
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs        # Router client, service fixtures
//!     ├── identity.rs       # Auth-issued tokens accepted by flashcards
//!     └── two_phase.rs      # Coordinator-style prepare/commit/abort
//! ```
//!
//! ```bash
//! cargo test -p fc-tests
//! ```

pub mod integration;
