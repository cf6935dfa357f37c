//! Two-step paired-code capture: a QR primary code followed by a Code128
//! secondary code becomes one record; records export as CSV.

pub mod app;
pub mod config;
pub mod debounce;
pub mod export;
pub mod feedback;
pub mod hooks;
pub mod input;
pub mod messages;
pub mod status;
pub mod workflow;

pub use app::App;
pub use config::Config;
pub use debounce::ScanDebouncer;
pub use messages::{AppCommand, ScanEvent, Snapshot, Symbology};
pub use status::{MessageId, StatusBoard};
pub use workflow::{CaptureWorkflow, Record, ScanOutcome, WorkflowState};
