use pairscan::feedback::{AudioFeedback, FeedbackSink, FeedbackSoundType};
use pairscan::{App, Config, Snapshot, input};

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the status line
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting pairscan capture");

    let config = Config::load()?;
    config.validate()?;

    let feedback = build_feedback(&config);
    let (app, cmd_tx) = App::new(config, feedback);

    tokio::spawn(render(app.subscribe()));
    input::monitor_stdin(cmd_tx);

    app.run().await?;

    tracing::info!("pairscan shutdown complete");
    Ok(())
}

fn build_feedback(config: &Config) -> Option<Box<dyn FeedbackSink>> {
    if !config.audio_feedback {
        return None;
    }

    let paths = HashMap::from([
        (
            FeedbackSoundType::Captured,
            PathBuf::from(&config.capture_sound_path),
        ),
        (
            FeedbackSoundType::Paired,
            PathBuf::from(&config.pair_sound_path),
        ),
    ]);
    Some(Box::new(AudioFeedback::new(paths)))
}

/// Print the observable state whenever it changes
async fn render(mut rx: watch::Receiver<Snapshot>) {
    loop {
        {
            let snapshot = rx.borrow_and_update();
            let scanner = if snapshot.scanning { "" } else { " (scanner stopped)" };
            if snapshot.status.is_empty() {
                println!(
                    "[{} rows]{} {}",
                    snapshot.record_count, scanner, snapshot.prompt
                );
            } else {
                println!(
                    "[{} rows]{} {} | {}",
                    snapshot.record_count, scanner, snapshot.prompt, snapshot.status
                );
            }
        }

        if rx.changed().await.is_err() {
            break;
        }
    }
}
