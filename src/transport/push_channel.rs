use tokio::{
    runtime::Handle,
    sync::{mpsc, watch},
};

use crate::{domain::events::PushEvent, transport::wire::decode_push_event};

const PUSH_MONITOR_STARTED: &str = "PUSH_CHANNEL_MONITOR_STARTED";
const PUSH_MONITOR_STOPPED: &str = "PUSH_CHANNEL_MONITOR_STOPPED";
const PUSH_MONITOR_STOP_SIGNAL_SENT: &str = "PUSH_CHANNEL_MONITOR_STOP_SIGNAL_SENT";
const PUSH_MONITOR_FRAME_REJECTED: &str = "PUSH_CHANNEL_MONITOR_FRAME_REJECTED";
const PUSH_MONITOR_FORWARD_FAILED: &str = "PUSH_CHANNEL_MONITOR_FORWARD_FAILED";

/// Decodes raw push frames and forwards them, in arrival order, to the
/// session's push queue.
///
/// Malformed frames are logged and skipped; the monitor keeps running until
/// the frame source closes, the session goes away, or the monitor is dropped.
#[derive(Debug)]
pub struct PushChannelMonitor {
    stop_tx: Option<watch::Sender<bool>>,
}

impl PushChannelMonitor {
    pub fn start(
        runtime: &Handle,
        frames: mpsc::Receiver<String>,
        events_tx: mpsc::Sender<PushEvent>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        runtime.spawn(run_monitor(frames, events_tx, stop_rx));

        tracing::info!(code = PUSH_MONITOR_STARTED, "push channel monitor started");

        Self {
            stop_tx: Some(stop_tx),
        }
    }
}

impl Drop for PushChannelMonitor {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
            tracing::debug!(
                code = PUSH_MONITOR_STOP_SIGNAL_SENT,
                "push channel monitor shutdown signal sent"
            );
        }
    }
}

async fn run_monitor(
    mut frames: mpsc::Receiver<String>,
    events_tx: mpsc::Sender<PushEvent>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut received: u64 = 0;
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    break;
                };
                received += 1;

                let event = match decode_push_event(&frame) {
                    Ok(event) => event,
                    Err(error) => {
                        tracing::warn!(
                            code = PUSH_MONITOR_FRAME_REJECTED,
                            reason = error.code(),
                            error = %error,
                            frame = received,
                            "skipping undecodable push frame"
                        );
                        continue;
                    }
                };

                tracing::debug!(frame = received, event_kind = event.kind(), "push frame decoded");
                if events_tx.send(event).await.is_err() {
                    tracing::warn!(
                        code = PUSH_MONITOR_FORWARD_FAILED,
                        "push event queue closed; stopping monitor"
                    );
                    break;
                }
            }
        }
    }

    tracing::info!(
        code = PUSH_MONITOR_STOPPED,
        frames = received,
        "push channel monitor stopped"
    );
}
