//! # Transaction Participant
//!
//! The participant side of a two-phase commit. An external coordinator calls
//! `prepare` on every participant, collects the votes, then calls `commit`
//! or `abort` on all of them. Nothing here coordinates; each participant only
//! guarantees its own transitions.
//!
//! ## State Machine
//!
//! ```text
//! [ABSENT] ──prepare──→ [PREPARED] ──commit──→ [COMMITTED]
//!                           │
//!                           └──abort / sweep──→ [ABORTED] ──→ row deleted
//! ```
//!
//! | Operation | From | Result |
//! |-----------|------|--------|
//! | `prepare` | absent | insert `PREPARED` |
//! | `prepare` | any | `Conflict`, first payload kept |
//! | `commit` | `PREPARED` | `COMMITTED` |
//! | `commit` | `COMMITTED` | success (`Idempotent`) or `NotFound` (`Strict`) |
//! | `commit` | `ABORTED` leftover | `Conflict` |
//! | `abort` | `PREPARED` | mark `ABORTED`, delete |
//! | `abort` | `ABORTED` leftover | delete, success |
//! | `abort` | `COMMITTED` | `Conflict` |
//! | `commit` / `abort` | absent | `NotFound` |
//!
//! A fully aborted transaction has no row, so it reads the same as one that
//! was never prepared.
//!
//! ## Orphans
//!
//! A `PREPARED` row whose coordinator never returns would live forever. The
//! sweeper (`adapters::sweeper`) aborts rows older than `orphan_timeout`.
//!
//! ## Layout
//!
//! - `domain`: records, config, errors, and the `Participant` service
//! - `ports`: `ParticipantApi` (inbound), `TransactionStore` (outbound)
//! - `adapters`: SQLite store, sweeper task, axum routes

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::http::{routes, TransactionRoutesState};
pub use adapters::sqlite::{open_connection, run_blocking, SharedConnection, SqliteTransactionStore};
pub use adapters::sweeper::spawn_sweeper;
pub use domain::*;
pub use ports::*;
