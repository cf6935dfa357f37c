use crate::config::Config;
use crate::export;
use crate::feedback::{FeedbackSink, FeedbackSoundType};
use crate::hooks;
use crate::messages::{AppCommand, ScanEvent, Snapshot};
use crate::status::{MessageId, STATUS_TTL};
use crate::workflow::{CaptureWorkflow, ScanOutcome};

use anyhow::Result;
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::{mpsc, watch};

/// Single event loop that owns the capture workflow
///
/// Every input reaches the workflow as an `AppCommand` on one channel: scans and
/// user actions from the input task, and delayed status clears from timer tasks.
/// Workflow state is therefore only ever touched from this task. The loop ends
/// on `Shutdown`, Ctrl+C, or once every external command sender is dropped.
pub struct App {
    workflow: CaptureWorkflow,
    config: Config,
    feedback: Option<Box<dyn FeedbackSink>>,
    /// Weak so pending status timers never keep the channel open
    cmd_tx: mpsc::WeakSender<AppCommand>,
    cmd_rx: mpsc::Receiver<AppCommand>,
    snapshot_tx: watch::Sender<Snapshot>,
    scanning: bool,
}

impl App {
    /// Returns the app and the sender used to feed it commands.
    pub fn new(
        config: Config,
        feedback: Option<Box<dyn FeedbackSink>>,
    ) -> (Self, mpsc::Sender<AppCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let workflow = CaptureWorkflow::new();
        let (snapshot_tx, _) = watch::channel(Snapshot {
            prompt: workflow.prompt(),
            record_count: 0,
            status: String::new(),
            scanning: true,
        });

        let app = Self {
            workflow,
            config,
            feedback,
            cmd_tx: cmd_tx.downgrade(),
            cmd_rx,
            snapshot_tx,
            scanning: true,
        };
        (app, cmd_tx)
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    pub async fn run(mut self) -> Result<()> {
        tracing::info!("{}", self.workflow.prompt());

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(AppCommand::Shutdown) => break,
                        None => {
                            tracing::info!("All command senders closed, shutting down");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        tracing::info!(
            "Capture stopped with {} rows in memory",
            self.workflow.record_count()
        );
        Ok(())
    }

    async fn handle_command(&mut self, cmd: AppCommand) {
        match cmd {
            AppCommand::Scan(event) => self.handle_scan(event).await,
            AppCommand::Cancel => {
                let id = self.workflow.cancel_current(now());
                self.schedule_clear(id);
            }
            AppCommand::Undo => {
                if let Some(id) = self.workflow.undo_last_row(now()) {
                    self.schedule_clear(id);
                } else {
                    tracing::debug!("Undo with no rows, ignoring");
                }
            }
            AppCommand::Export => self.handle_export().await,
            AppCommand::StartScanning => {
                tracing::info!("Scanning started");
                self.scanning = true;
            }
            AppCommand::StopScanning => {
                tracing::info!("Scanning stopped");
                self.scanning = false;
            }
            AppCommand::ClearStatus(id) => {
                if !self.workflow.clear_message(id) {
                    tracing::debug!("Status {:?} already superseded", id);
                }
            }
            AppCommand::Shutdown => {}
        }

        self.publish();
    }

    async fn handle_scan(&mut self, event: ScanEvent) {
        if !self.scanning {
            tracing::debug!("Scanner stopped, dropping {:?}", event);
            return;
        }

        let outcome = self.workflow.handle_scan(event, now());

        if let Some(id) = outcome.status() {
            self.schedule_clear(id);
        }

        let sound = match outcome {
            ScanOutcome::PrimaryCaptured => Some(FeedbackSoundType::Captured),
            ScanOutcome::RecordCompleted => Some(FeedbackSoundType::Paired),
            _ => None,
        };
        if let (Some(sound), Some(feedback)) = (sound, &self.feedback) {
            feedback.signal(sound).await;
        }
    }

    async fn handle_export(&mut self) {
        match self.export().await {
            Ok(path) => {
                let count = self.workflow.record_count();
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.show_message(format!("Exported {} rows to {}", count, file_name));

                if let Some(hook) = &self.config.post_export_hook {
                    hooks::run_export_hook(hook, &path, count);
                }
            }
            Err(e) => {
                tracing::error!("Export failed: {:#}", e);
                self.show_message(format!("Export failed: {:#}", e));
            }
        }
    }

    /// Snapshot the current records to a new CSV file. The list is left as is.
    async fn export(&self) -> Result<PathBuf> {
        let csv = export::serialize(self.workflow.records());
        let file_name = export::export_file_name(&chrono::Local::now());
        tracing::info!(
            "Exporting {} rows as {}",
            self.workflow.record_count(),
            file_name
        );
        export::write_export(&self.config.export_dir, &file_name, csv).await
    }

    fn show_message(&mut self, text: String) {
        let id = self.workflow.show_message(text, now());
        self.schedule_clear(id);
    }

    fn schedule_clear(&self, id: MessageId) {
        let tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(STATUS_TTL).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(AppCommand::ClearStatus(id)).await;
            }
        });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(Snapshot {
            prompt: self.workflow.prompt(),
            record_count: self.workflow.record_count(),
            status: self.workflow.status_text().to_string(),
            scanning: self.scanning,
        });
    }
}

/// Event time for the workflow; follows tokio's clock so paused-time tests work
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Symbology;
    use crate::workflow::{MSG_CANCELED, MSG_ONLY_QR, Record};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct RecordingFeedback {
        signals: Arc<Mutex<Vec<FeedbackSoundType>>>,
    }

    #[async_trait]
    impl FeedbackSink for RecordingFeedback {
        async fn signal(&self, sound_type: FeedbackSoundType) {
            self.signals.lock().unwrap().push(sound_type);
        }
    }

    fn test_config(export_dir: PathBuf) -> Config {
        Config {
            export_dir,
            audio_feedback: false,
            ..Config::default()
        }
    }

    fn qr(value: &str) -> AppCommand {
        AppCommand::Scan(ScanEvent::new(value, Symbology::Qr))
    }

    fn code128(value: &str) -> AppCommand {
        AppCommand::Scan(ScanEvent::new(value, Symbology::Code128))
    }

    #[tokio::test(start_paused = true)]
    async fn test_scans_produce_records_and_feedback() {
        let feedback = RecordingFeedback::default();
        let (mut app, _tx) = App::new(
            test_config(PathBuf::from(".")),
            Some(Box::new(feedback.clone())),
        );

        app.handle_command(qr("ID-001")).await;
        // Held in front of the camera: debounced, no second cue
        app.handle_command(qr("ID-001")).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        app.handle_command(code128("PC-777")).await;

        assert_eq!(app.workflow.records(), &[Record::new("ID-001", "PC-777")]);
        assert_eq!(
            *feedback.signals.lock().unwrap(),
            vec![FeedbackSoundType::Captured, FeedbackSoundType::Paired]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_scan_has_no_feedback() {
        let feedback = RecordingFeedback::default();
        let (mut app, _tx) = App::new(
            test_config(PathBuf::from(".")),
            Some(Box::new(feedback.clone())),
        );
        let snapshots = app.subscribe();

        app.handle_command(code128("PC-777")).await;

        assert!(feedback.signals.lock().unwrap().is_empty());
        assert_eq!(snapshots.borrow().status, MSG_ONLY_QR);
        assert_eq!(snapshots.borrow().record_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_scanner_drops_scans() {
        let (mut app, _tx) = App::new(test_config(PathBuf::from(".")), None);

        app.handle_command(AppCommand::StopScanning).await;
        app.handle_command(qr("ID-001")).await;
        assert_eq!(app.workflow.state().pending_primary_code(), None);
        assert!(!app.subscribe().borrow().scanning);

        app.handle_command(AppCommand::StartScanning).await;
        app.handle_command(qr("ID-001")).await;
        assert_eq!(app.workflow.state().pending_primary_code(), Some("ID-001"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_clears_after_ttl() {
        let (app, tx) = App::new(test_config(PathBuf::from(".")), None);
        let snapshots = app.subscribe();
        let handle = tokio::spawn(app.run());

        tx.send(AppCommand::Cancel).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(snapshots.borrow().status, MSG_CANCELED);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(snapshots.borrow().status, MSG_CANCELED);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(snapshots.borrow().status, "");

        tx.send(AppCommand::Shutdown).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_clear_does_not_hide_newer_message() {
        let (app, tx) = App::new(test_config(PathBuf::from(".")), None);
        let snapshots = app.subscribe();
        let handle = tokio::spawn(app.run());

        tx.send(AppCommand::Cancel).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        // Same text, new message
        tx.send(AppCommand::Cancel).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(snapshots.borrow().status, MSG_CANCELED);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(snapshots.borrow().status, "");

        tx.send(AppCommand::Shutdown).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_export_writes_csv_and_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _tx) = App::new(test_config(dir.path().to_path_buf()), None);

        app.handle_command(qr("ID-001")).await;
        app.handle_command(code128("A,1")).await;
        app.handle_command(AppCommand::Export).await;

        assert_eq!(app.workflow.record_count(), 1);
        assert!(app.workflow.status_text().starts_with("Exported 1 rows to scan_export_"));

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("scan_export_") && name.ends_with(".csv"));
        assert_eq!(
            std::fs::read_to_string(&files[0]).unwrap(),
            "o1,l1,s1\nID-001,\"A,1\",1"
        );
    }

    #[tokio::test]
    async fn test_repeated_exports_are_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _tx) = App::new(test_config(dir.path().to_path_buf()), None);

        app.handle_command(qr("A")).await;
        app.handle_command(code128("B")).await;
        app.handle_command(AppCommand::Export).await;
        app.handle_command(AppCommand::Undo).await;
        app.handle_command(AppCommand::Export).await;

        let mut contents: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| std::fs::read_to_string(e.unwrap().path()).unwrap())
            .collect();
        contents.sort();
        assert_eq!(contents, ["o1,l1,s1", "o1,l1,s1\nA,B,1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ends_when_senders_dropped() {
        let (app, tx) = App::new(test_config(PathBuf::from(".")), None);
        let snapshots = app.subscribe();
        let handle = tokio::spawn(app.run());

        // Leaves a status timer pending
        tx.send(AppCommand::Cancel).await.unwrap();
        drop(tx);

        handle.await.unwrap().unwrap();
        assert_eq!(snapshots.borrow().status, MSG_CANCELED);
    }

    #[tokio::test]
    async fn test_export_failure_keeps_records() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let (mut app, _tx) = App::new(test_config(blocker.path().join("exports")), None);

        app.handle_command(qr("ID-001")).await;
        app.handle_command(code128("PC-777")).await;
        app.handle_command(AppCommand::Export).await;

        assert!(app.workflow.status_text().starts_with("Export failed: "));
        assert_eq!(app.workflow.records(), &[Record::new("ID-001", "PC-777")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_on_empty_list_publishes_nothing() {
        let (mut app, _tx) = App::new(test_config(PathBuf::from(".")), None);
        let snapshots = app.subscribe();

        app.handle_command(AppCommand::Undo).await;

        assert_eq!(snapshots.borrow().status, "");
        assert_eq!(snapshots.borrow().record_count, 0);
    }
}
