use crate::status::MessageId;
use std::str::FromStr;

/// Barcode symbology reported by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbology {
    Qr,
    Code128,
    Other,
}

impl FromStr for Symbology {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "QR" | "QRCODE" | "QR_CODE" => Symbology::Qr,
            "CODE128" | "CODE-128" | "CODE_128" | "C128" => Symbology::Code128,
            _ => Symbology::Other,
        })
    }
}

/// A single decoded read delivered by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub value: String,
    pub symbology: Symbology,
}

impl ScanEvent {
    pub fn new(value: impl Into<String>, symbology: Symbology) -> Self {
        Self {
            value: value.into(),
            symbology,
        }
    }
}

/// Commands for the App event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Scan(ScanEvent),
    Cancel,
    Undo,
    Export,
    /// Resume delivering scans to the workflow (camera start)
    StartScanning,
    /// Drop incoming scans until started again (camera stop)
    StopScanning,
    /// Fired by the status timer; only clears if `id` is still live
    ClearStatus(MessageId),
    Shutdown,
}

/// Observable application state (published via watch channel)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub prompt: String,
    pub record_count: usize,
    pub status: String,
    pub scanning: bool,
}
