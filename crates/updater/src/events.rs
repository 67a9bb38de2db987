use std::sync::atomic::{AtomicBool, Ordering};

/// Signals emitted by the update client, consumed by the UI layer.
///
/// The set is closed on purpose: subscribers match on variants instead of
/// string event names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdaterEvent {
    CheckingForUpdate,
    Error(String),
    UpdateAvailable,
    UpdateDownloaded,
    UpdateNotAvailable,
}

/// Observable snapshot of the client's session flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdaterStatus {
    /// A check is in flight; further check requests collapse into no-ops.
    pub check_pending: bool,
    /// The in-flight check was user triggered, so its outcome is surfaced
    /// as a modal notice.
    pub user_check_pending: bool,
    /// A downloaded update awaits the user's install decision.
    pub update_pending: bool,
}

/// Cancellation token passed to quit listeners before an install restart.
///
/// Every listener sees the same token; if any of them cancels, the quit is
/// abandoned and the pending update stays offered.
#[derive(Debug, Default)]
pub struct QuitIntent {
    canceled: AtomicBool,
}

impl QuitIntent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_intent_defaults_to_not_canceled() {
        let intent = QuitIntent::new();
        assert!(!intent.is_canceled());
        intent.cancel();
        assert!(intent.is_canceled());
    }
}
