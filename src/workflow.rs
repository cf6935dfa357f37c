use crate::debounce::ScanDebouncer;
use crate::messages::{ScanEvent, Symbology};
use crate::status::{MessageId, StatusBoard};
use std::time::Instant;

pub const MSG_ONLY_QR: &str = "Only QR codes accepted for Step 1";
pub const MSG_ONLY_CODE128: &str = "Only Code128 accepted for Step 2";
pub const MSG_CANCELED: &str = "Current scan canceled";
pub const MSG_ROW_REMOVED: &str = "Last row removed";

/// Sequence number written for every record; reserved for multi-sequence capture.
pub const DEFAULT_SEQUENCE: u32 = 1;

/// One completed QR + Code128 pairing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub primary_code: String,
    pub secondary_code: String,
    pub sequence: u32,
}

impl Record {
    pub fn new(primary_code: impl Into<String>, secondary_code: impl Into<String>) -> Self {
        Self {
            primary_code: primary_code.into(),
            secondary_code: secondary_code.into(),
            sequence: DEFAULT_SEQUENCE,
        }
    }
}

/// Active step of the capture cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkflowState {
    /// Awaiting a QR primary code
    #[default]
    Step1,
    /// Awaiting the Code128 secondary code for `pending_primary_code`
    Step2 { pending_primary_code: String },
}

impl WorkflowState {
    pub fn pending_primary_code(&self) -> Option<&str> {
        match self {
            WorkflowState::Step1 => None,
            WorkflowState::Step2 {
                pending_primary_code,
            } => Some(pending_primary_code),
        }
    }
}

/// What a single scan did to the workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Blank after trimming; dropped without a message
    Ignored,
    /// Repeat of the previous read inside the debounce window
    Debounced,
    /// Wrong symbology for the current step
    Rejected(MessageId),
    /// QR accepted, now waiting for Step 2
    PrimaryCaptured,
    /// Code128 accepted and a record was appended
    RecordCompleted,
}

impl ScanOutcome {
    /// Accepted scans are the ones the host gives audible/haptic feedback for.
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            ScanOutcome::PrimaryCaptured | ScanOutcome::RecordCompleted
        )
    }

    pub fn status(&self) -> Option<MessageId> {
        match self {
            ScanOutcome::Rejected(id) => Some(*id),
            _ => None,
        }
    }
}

/// Two-step capture state machine
///
/// Owns the step state, debounce memo, record list and status slot. All
/// mutation happens through `&mut self` on the single event-processing task;
/// nothing here is shared across threads.
#[derive(Debug, Default)]
pub struct CaptureWorkflow {
    state: WorkflowState,
    debouncer: ScanDebouncer,
    records: Vec<Record>,
    status: StatusBoard,
}

impl CaptureWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_scan(&mut self, event: ScanEvent, now: Instant) -> ScanOutcome {
        let value = event.value.trim();
        if value.is_empty() {
            tracing::debug!("Ignoring blank scan ({:?})", event.symbology);
            return ScanOutcome::Ignored;
        }

        // Repeat reads are dropped before the type check so a held code
        // cannot re-trigger a rejection message.
        if !self.debouncer.accept(value, now) {
            tracing::debug!("Debounced repeat scan {:?}", value);
            return ScanOutcome::Debounced;
        }

        let expected = match self.state {
            WorkflowState::Step1 => Symbology::Qr,
            WorkflowState::Step2 { .. } => Symbology::Code128,
        };

        if event.symbology != expected {
            let text = match expected {
                Symbology::Qr => MSG_ONLY_QR,
                _ => MSG_ONLY_CODE128,
            };
            tracing::warn!(
                "Rejected {:?} scan {:?}, expected {:?}",
                event.symbology,
                value,
                expected
            );
            return ScanOutcome::Rejected(self.status.show(text, now));
        }

        match std::mem::take(&mut self.state) {
            WorkflowState::Step1 => {
                tracing::info!("Step 1: captured primary code {:?}", value);
                self.state = WorkflowState::Step2 {
                    pending_primary_code: value.to_string(),
                };
                ScanOutcome::PrimaryCaptured
            }
            WorkflowState::Step2 {
                pending_primary_code,
            } => {
                let record = Record::new(pending_primary_code, value);
                tracing::info!(
                    "Step 2: paired {:?} with {:?} (row {})",
                    record.primary_code,
                    record.secondary_code,
                    self.records.len() + 1
                );
                self.records.push(record);
                ScanOutcome::RecordCompleted
            }
        }
    }

    /// Drop any in-progress pairing and return to Step 1.
    pub fn cancel_current(&mut self, now: Instant) -> MessageId {
        if let Some(pending) = self.state.pending_primary_code() {
            tracing::info!("Canceled pending primary code {:?}", pending);
        }
        self.state = WorkflowState::Step1;
        self.status.show(MSG_CANCELED, now)
    }

    /// Remove the most recent record. Silent no-op on an empty list.
    pub fn undo_last_row(&mut self, now: Instant) -> Option<MessageId> {
        let removed = self.records.pop()?;
        tracing::info!(
            "Removed row {:?},{:?} ({} left)",
            removed.primary_code,
            removed.secondary_code,
            self.records.len()
        );
        Some(self.status.show(MSG_ROW_REMOVED, now))
    }

    pub fn show_message(&mut self, text: impl Into<String>, now: Instant) -> MessageId {
        self.status.show(text, now)
    }

    pub fn clear_message(&mut self, id: MessageId) -> bool {
        self.status.clear_if_current(id)
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn status_text(&self) -> &str {
        self.status.text()
    }

    /// Instruction line for the current step
    pub fn prompt(&self) -> String {
        match &self.state {
            WorkflowState::Step1 => "Step 1: scan QR code".to_string(),
            WorkflowState::Step2 {
                pending_primary_code,
            } => format!(
                "Step 2: scan Code128 barcode for {}",
                pending_primary_code
            ),
        }
    }
}
