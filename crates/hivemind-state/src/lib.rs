//! Durable persistence for every `.hivemind` document.
//!
//! Single-file atomicity (write-temp-then-rename, best-effort `.bak` of
//! the previous version), corrupt reads degrading to defaults, and the
//! path layout consumed by every other crate. No concurrency guarantees
//! beyond that: one process, one active session.

pub mod anchors;
pub mod manifest;
pub mod mems;
pub mod migrate;
pub mod paths;
pub mod session_file;
pub mod store;

pub use anchors::{Anchor, AnchorsState};
pub use manifest::{NewSessionEntry, SessionManifest, SessionManifestEntry, SessionStatus};
pub use mems::{Mem, MemsState, BUILTIN_SHELVES};
pub use migrate::{migrate_if_needed, MigrationResult};
pub use paths::HivemindPaths;
pub use store::StateManager;
