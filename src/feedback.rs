use async_trait::async_trait;
use rodio::OutputStreamBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackSoundType {
    /// Primary code accepted, waiting for the barcode
    Captured,
    /// Record completed
    Paired,
}

/// Receives the "scan accepted" cue
///
/// Implementations must return promptly; the caller is the event loop.
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn signal(&self, sound_type: FeedbackSoundType);
}

/// Plays a short sound per cue through the default output device
pub struct AudioFeedback {
    paths: HashMap<FeedbackSoundType, PathBuf>,
}

impl AudioFeedback {
    pub fn new(paths: HashMap<FeedbackSoundType, PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl FeedbackSink for AudioFeedback {
    async fn signal(&self, sound_type: FeedbackSoundType) {
        if let Some(path) = self.paths.get(&sound_type) {
            let path = path.clone();
            // Playback is not awaited; the next scan must not wait for the cue
            drop(tokio::task::spawn_blocking(move || {
                if let Err(e) = play_sound_blocking(&path) {
                    tracing::warn!("Failed to play sound {}: {}", path.display(), e);
                }
            }));
        }
    }
}

fn play_sound_blocking(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(path)
        .or_else(|_| File::open(PathBuf::from("assets").join(path)))
        .or_else(|_| File::open(PathBuf::from("/usr/share/pairscan/assets").join(path)))?;

    let stream_handle = OutputStreamBuilder::open_default_stream()?;
    let sink = rodio::play(stream_handle.mixer(), BufReader::new(file))?;
    sink.sleep_until_end();

    Ok(())
}
