use std::time::{Duration, Instant};

/// Identical reads closer together than this are treated as one physical scan.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(800);

/// Suppresses repeated reads of the same code
///
/// A code held in front of a continuously sampling scanner produces many
/// identical reads per second. The memo is shared by both workflow steps and is
/// never reset on transitions.
#[derive(Debug, Default)]
pub struct ScanDebouncer {
    memo: Option<DebounceMemo>,
}

#[derive(Debug, Clone)]
struct DebounceMemo {
    last_value: String,
    last_accepted_at: Instant,
}

impl ScanDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `value` repeats the last accepted value inside the
    /// window; otherwise records `(value, now)` and returns `true`.
    pub fn accept(&mut self, value: &str, now: Instant) -> bool {
        if let Some(memo) = &self.memo {
            if memo.last_value == value
                && now.saturating_duration_since(memo.last_accepted_at) < DEBOUNCE_WINDOW
            {
                return false;
            }
        }

        self.memo = Some(DebounceMemo {
            last_value: value.to_string(),
            last_accepted_at: now,
        });
        true
    }
}
