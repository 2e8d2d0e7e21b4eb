use std::sync::Arc;

use tokio::{runtime::Handle, sync::mpsc};

use crate::{
    domain::viewport::{ScrollMetrics, ViewportAction},
    infra::{
        config::AppConfig,
        replay::{FixtureChats, FixtureHistory, RecordingSink, ReplayFixture, ReplayStep},
    },
    transport::{
        push_channel::PushChannelMonitor,
        wire::{decode_push_event, WireError},
    },
    usecases::{
        send_message::MessageSink,
        session::{start_session, SessionClosed, SessionCollaborators, SessionHandle},
        sync_engine::{SessionSettings, SessionView},
    },
};

const FRAME_QUEUE_CAPACITY: usize = 64;
const PUSH_EVENT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("fixture history is not a valid chatMessages answer: {0}")]
    History(#[from] WireError),
    #[error(transparent)]
    Closed(#[from] SessionClosed),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOutcome {
    pub view: SessionView,
    pub viewport_actions: Vec<ViewportAction>,
    pub sent_frames: Vec<String>,
    pub steps_run: usize,
}

/// Runs the fixture's script against a live session, waiting for the session
/// to go quiet after every step.
pub async fn run_replay(
    fixture: ReplayFixture,
    config: &AppConfig,
) -> Result<ReplayOutcome, ReplayError> {
    let sink = Arc::new(RecordingSink::default());
    let collaborators = SessionCollaborators {
        history: Arc::new(FixtureHistory::new(&fixture.history)?),
        chats: Arc::new(FixtureChats::new(&fixture.chats)),
        sink: Arc::clone(&sink) as Arc<dyn MessageSink>,
    };

    let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE_CAPACITY);
    let (push_tx, push_rx) = mpsc::channel(PUSH_EVENT_QUEUE_CAPACITY);
    let monitor = PushChannelMonitor::start(&Handle::current(), frame_rx, push_tx);

    let settings = SessionSettings::from_config(fixture.user_id.clone(), config);
    let mut session = start_session(settings, collaborators, push_rx);

    let mut inputs: u64 = 0;
    let mut viewport_actions = Vec::new();
    session.settled(inputs).await?;

    for (index, step) in fixture.steps.iter().enumerate() {
        tracing::debug!(step = index, "replaying step");
        if apply_step(&session, &frame_tx, step).await? {
            inputs += 1;
        }
        session.settled(inputs).await?;
        viewport_actions.extend(session.drain_viewport_actions());
    }

    let view = session.view();
    drop(monitor);
    session.shutdown().await;

    Ok(ReplayOutcome {
        view,
        viewport_actions,
        sent_frames: sink.frames(),
        steps_run: fixture.steps.len(),
    })
}

/// Returns whether the step reaches the session as an input.
async fn apply_step(
    session: &SessionHandle,
    frame_tx: &mpsc::Sender<String>,
    step: &ReplayStep,
) -> Result<bool, SessionClosed> {
    match step {
        ReplayStep::Open { chat_id } => session.open_chat(chat_id.clone()).await?,
        ReplayStep::Scroll {
            offset,
            content_height,
            viewport_height,
        } => {
            session
                .report_scroll(ScrollMetrics {
                    offset: *offset,
                    content_height: *content_height,
                    viewport_height: *viewport_height,
                })
                .await?
        }
        ReplayStep::ContentHeight { height } => session.report_content_height(*height).await?,
        ReplayStep::LoadMore => session.trigger_load_more().await?,
        ReplayStep::Send { text } => session.send_message(text.clone()).await?,
        ReplayStep::ScrollToBottom => session.scroll_to_bottom().await?,
        ReplayStep::Push { frame } => {
            let frame = frame.to_string();
            // The monitor drops undecodable frames, so they never count as input.
            let reaches_session = decode_push_event(&frame).is_ok();
            frame_tx.send(frame).await.map_err(|_| SessionClosed)?;
            return Ok(reaches_session);
        }
    }
    Ok(true)
}
