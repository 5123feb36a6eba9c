use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPhase {
    Idle,
    Gathering,
    Preparing,
    Downloading,
    Packaging,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportProgress {
    pub phase: ExportPhase,
    pub percent: u8,
    pub status: String,
}

impl ExportProgress {
    fn idle() -> Self {
        Self {
            phase: ExportPhase::Idle,
            percent: 0,
            status: String::new(),
        }
    }
}

pub(crate) const GATHER_END: u8 = 20;
pub(crate) const PREPARE_END: u8 = 45;
pub(crate) const DOWNLOAD_END: u8 = 95;

/// Publishes export progress. Within a run the percentage never decreases.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<ExportProgress>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ExportProgress::idle());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ExportProgress> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> ExportProgress {
        self.tx.borrow().clone()
    }

    pub(crate) fn start(&self) {
        self.tx.send_replace(ExportProgress {
            phase: ExportPhase::Gathering,
            percent: 0,
            status: "Gathering lead history...".into(),
        });
    }

    pub(crate) fn report(&self, phase: ExportPhase, percent: u8, status: impl Into<String>) {
        let status = status.into();
        self.tx.send_modify(|p| {
            p.phase = phase;
            p.percent = p.percent.max(percent.min(100));
            p.status = status;
        });
    }

    /// Progress inside `[start, end]` for `done` of `total` units.
    pub(crate) fn report_span(
        &self,
        phase: ExportPhase,
        start: u8,
        end: u8,
        done: usize,
        total: usize,
        status: impl Into<String>,
    ) {
        let span = f64::from(end.saturating_sub(start));
        let fraction = if total == 0 {
            1.0
        } else {
            (done as f64 / total as f64).min(1.0)
        };
        let percent = start.saturating_add((span * fraction).floor() as u8);
        self.report(phase, percent, status);
    }

    pub(crate) fn finish(&self, status: impl Into<String>) {
        self.report(ExportPhase::Done, 100, status);
    }

    /// Abort the run: progress is reset and the error is shown.
    pub(crate) fn fail(&self, message: impl Into<String>) {
        self.tx.send_replace(ExportProgress {
            phase: ExportPhase::Failed,
            percent: 0,
            status: message.into(),
        });
    }
}
