use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use super::types::VoiceEvent;
use super::voice::decode_voice_urc;

/// Handles ongoing decoding of voice notification lines.
///
/// Consumes the unsolicited lines the daemon's port layer hands over and
/// fans decoded events out to any number of watchers. Lines that decode to
/// nothing are dropped; they never become errors anywhere.
pub struct VoiceMonitor {
    events_tx: broadcast::Sender<VoiceEvent>,
    task: tokio::task::JoinHandle<()>,
}

impl VoiceMonitor {
    /// Start decoding `lines` in a background task.
    pub fn start<S>(mut lines: S) -> Self
    where
        S: Stream<Item = String> + Send + Unpin + 'static,
    {
        let (events_tx, _) = broadcast::channel(32);
        let task_tx = events_tx.clone();

        let task = tokio::spawn(async move {
            while let Some(line) = lines.next().await {
                let Some(event) = decode_voice_urc(&line) else {
                    continue;
                };
                debug!("decoded voice event: {event:?}");
                let _ = task_tx.send(event);
            }
        });

        Self { events_tx, task }
    }

    /// Watch decoded voice events.
    ///
    /// Each watcher sees events emitted after it subscribed.
    pub fn events(&self) -> impl Stream<Item = VoiceEvent> + Send {
        BroadcastStream::new(self.events_tx.subscribe()).filter_map(|event| async { event.ok() })
    }
}

impl Drop for VoiceMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
