//! Session lifecycle orchestration.
//!
//! `SessionService` wires the tree engine, detection engine, and state
//! store into the `start/update/close/status/resume` operations plus
//! `prune` and `migrate`. Inspection surfaces render scan/deep/drift
//! reports; exports snapshot a closed session to JSON and Markdown.

pub mod export;
pub mod inspect;
pub mod lifecycle;
pub mod outcome;

pub use export::{export_data, json_export, markdown_export, SessionExportData};
pub use inspect::{inspect, InspectAction};
pub use lifecycle::SessionService;
pub use outcome::Outcome;
