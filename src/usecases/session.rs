//! Async shell around [`SyncEngine`].
//!
//! One tokio task owns the engine and selects over UI intents, push events and
//! the results of the fetch and send work it started. Every mutation therefore
//! happens on that task, one input at a time. Outgoing messages go through a
//! single sender task so they leave in the order they were typed. The presentation layer reads
//! [`SessionView`] snapshots from a `watch` channel and receives
//! [`ViewportAction`]s in order on an unbounded queue.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    domain::{
        events::{PushEvent, UiIntent},
        pagination::HistoryPage,
        viewport::{ScrollMetrics, ViewportAction, ViewportThresholds},
    },
    infra::config::AppConfig,
    usecases::{
        list_chats::{list_chats, ChatsSource, ListChatsError, ListChatsOutput},
        load_history::{load_history, HistorySource, LoadHistoryQuery},
        send_message::{send_message, MessageSink, SendMessageCommand, SendMessageError},
        sync_engine::{Effect, FetchOutcome, SessionSettings, SessionView, SyncEngine},
    },
};

const INTENT_QUEUE_CAPACITY: usize = 64;
const SEND_FAILED: &str = "SYNC_SEND_FAILED";
const PUSH_CHANNEL_CLOSED: &str = "SYNC_PUSH_CHANNEL_CLOSED";

impl SessionSettings {
    pub fn from_config(local_user_id: impl Into<String>, config: &AppConfig) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            page_size: config.sync.page_size,
            fetch_timeout: Duration::from_millis(config.sync.fetch_timeout_ms),
            thresholds: ViewportThresholds {
                bottom: config.viewport.bottom_threshold,
                top: config.viewport.top_threshold,
            },
        }
    }
}

#[derive(Clone)]
pub struct SessionCollaborators {
    pub history: Arc<dyn HistorySource>,
    pub chats: Arc<dyn ChatsSource>,
    pub sink: Arc<dyn MessageSink>,
}

/// Bookkeeping published next to the view so callers can tell when the
/// session has gone quiet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionActivity {
    /// Intents and push events processed so far.
    pub inputs_applied: u64,
    /// Fetches, queued sends and the chat-list load that have not reported
    /// back.
    pub tasks_in_flight: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub view: SessionView,
    pub activity: SessionActivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sync session has shut down")]
pub struct SessionClosed;

#[derive(Debug)]
enum TaskOutcome {
    Fetched(FetchOutcome),
    ChatsLoaded(Result<ListChatsOutput, ListChatsError>),
    Sent(Result<(), SendMessageError>),
}

pub struct SessionHandle {
    intents: mpsc::Sender<UiIntent>,
    snapshots: watch::Receiver<SessionSnapshot>,
    viewport_actions: mpsc::UnboundedReceiver<ViewportAction>,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

/// Starts the session task on the current tokio runtime.
pub fn start_session(
    settings: SessionSettings,
    collaborators: SessionCollaborators,
    push_events: mpsc::Receiver<PushEvent>,
) -> SessionHandle {
    let (intent_tx, intent_rx) = mpsc::channel(INTENT_QUEUE_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
    let (viewport_tx, viewport_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    let send_tx = spawn_sender(Arc::clone(&collaborators.sink), outcome_tx.clone());

    let mut worker = SessionWorker {
        fetch_timeout: settings.fetch_timeout,
        engine: SyncEngine::new(settings),
        collaborators,
        outcome_tx,
        send_tx,
        viewport_tx,
        snapshot_tx,
        activity: SessionActivity::default(),
    };
    worker.spawn_chat_list_load();
    worker.publish();
    let task = tokio::spawn(worker.run(intent_rx, push_events, outcome_rx, stop_rx));

    SessionHandle {
        intents: intent_tx,
        snapshots: snapshot_rx,
        viewport_actions: viewport_rx,
        stop_tx,
        task: Some(task),
    }
}

impl SessionHandle {
    pub async fn open_chat(&self, chat_id: impl Into<String>) -> Result<(), SessionClosed> {
        self.submit(UiIntent::OpenChat {
            chat_id: chat_id.into(),
        })
        .await
    }

    pub async fn report_scroll(&self, metrics: ScrollMetrics) -> Result<(), SessionClosed> {
        self.submit(UiIntent::Scrolled(metrics)).await
    }

    pub async fn report_content_height(&self, content_height: f64) -> Result<(), SessionClosed> {
        self.submit(UiIntent::ContentResized { content_height })
            .await
    }

    pub async fn trigger_load_more(&self) -> Result<(), SessionClosed> {
        self.submit(UiIntent::LoadMore).await
    }

    pub async fn send_message(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.submit(UiIntent::SendMessage { text: text.into() })
            .await
    }

    pub async fn scroll_to_bottom(&self) -> Result<(), SessionClosed> {
        self.submit(UiIntent::ScrollToBottom).await
    }

    pub async fn submit(&self, intent: UiIntent) -> Result<(), SessionClosed> {
        self.intents.send(intent).await.map_err(|_| SessionClosed)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn view(&self) -> SessionView {
        self.snapshots.borrow().view.clone()
    }

    pub fn drain_viewport_actions(&mut self) -> Vec<ViewportAction> {
        let mut actions = Vec::new();
        while let Ok(action) = self.viewport_actions.try_recv() {
            actions.push(action);
        }
        actions
    }

    /// Waits until `inputs` inputs were applied and no spawned task is
    /// outstanding, then returns that snapshot.
    pub async fn settled(&self, inputs: u64) -> Result<SessionSnapshot, SessionClosed> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|snapshot| {
                snapshot.activity.inputs_applied >= inputs
                    && snapshot.activity.tasks_in_flight == 0
            })
            .await
            .map_err(|_| SessionClosed)?;
        Ok(snapshot.clone())
    }

    pub async fn shutdown(&mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!(error = %error, "sync session task ended abnormally");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Awaits each send before taking the next command off the queue.
fn spawn_sender(
    sink: Arc<dyn MessageSink>,
    outcome_tx: mpsc::UnboundedSender<TaskOutcome>,
) -> mpsc::UnboundedSender<SendMessageCommand> {
    let (send_tx, mut send_rx) = mpsc::unbounded_channel::<SendMessageCommand>();
    tokio::spawn(async move {
        while let Some(command) = send_rx.recv().await {
            let result = send_message(sink.as_ref(), command).await;
            if outcome_tx.send(TaskOutcome::Sent(result)).is_err() {
                break;
            }
        }
    });
    send_tx
}

struct SessionWorker {
    engine: SyncEngine,
    collaborators: SessionCollaborators,
    fetch_timeout: Duration,
    outcome_tx: mpsc::UnboundedSender<TaskOutcome>,
    send_tx: mpsc::UnboundedSender<SendMessageCommand>,
    viewport_tx: mpsc::UnboundedSender<ViewportAction>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    activity: SessionActivity,
}

impl SessionWorker {
    async fn run(
        mut self,
        mut intents: mpsc::Receiver<UiIntent>,
        mut push_events: mpsc::Receiver<PushEvent>,
        mut outcomes: mpsc::UnboundedReceiver<TaskOutcome>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        tracing::info!(
            local_user_id = %self.engine.settings().local_user_id,
            "sync session started"
        );

        let mut push_open = true;
        loop {
            tokio::select! {
                _ = stop_rx.changed() => break,
                intent = intents.recv() => {
                    let Some(intent) = intent else {
                        break;
                    };
                    let effects = self.engine.handle_intent(intent);
                    self.activity.inputs_applied += 1;
                    self.execute(effects);
                }
                event = push_events.recv(), if push_open => {
                    match event {
                        Some(event) => {
                            let effects = self.engine.handle_push(event);
                            self.activity.inputs_applied += 1;
                            self.execute(effects);
                        }
                        None => {
                            tracing::info!(code = PUSH_CHANNEL_CLOSED, "push channel closed");
                            push_open = false;
                        }
                    }
                }
                Some(outcome) = outcomes.recv() => {
                    self.activity.tasks_in_flight = self.activity.tasks_in_flight.saturating_sub(1);
                    self.apply_outcome(outcome);
                }
            }
            self.publish();
        }

        tracing::info!("sync session stopped");
    }

    fn apply_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Fetched(outcome) => {
                let effects = self.engine.handle_fetch_outcome(outcome);
                self.execute(effects);
            }
            TaskOutcome::ChatsLoaded(result) => self.engine.handle_chats_loaded(result),
            TaskOutcome::Sent(Ok(())) => {}
            TaskOutcome::Sent(Err(error)) => {
                tracing::warn!(
                    code = SEND_FAILED,
                    reason = error.code(),
                    error = %error,
                    "message send failed"
                );
            }
        }
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Fetch(ticket) => {
                    let history = Arc::clone(&self.collaborators.history);
                    let timeout = self.fetch_timeout;
                    self.spawn_task(async move {
                        let query = LoadHistoryQuery::from(&ticket);
                        let outcome = match load_history(history.as_ref(), query, timeout).await {
                            Ok(messages) => FetchOutcome::Loaded(HistoryPage { ticket, messages }),
                            Err(error) => FetchOutcome::Failed { ticket, error },
                        };
                        TaskOutcome::Fetched(outcome)
                    });
                }
                Effect::Send(command) => self.queue_send(command),
                Effect::Viewport(action) => {
                    let _ = self.viewport_tx.send(action);
                }
            }
        }
    }

    fn queue_send(&mut self, command: SendMessageCommand) {
        if self.send_tx.send(command).is_err() {
            tracing::warn!(code = SEND_FAILED, "message sender has stopped");
            return;
        }
        self.activity.tasks_in_flight += 1;
    }

    fn spawn_chat_list_load(&mut self) {
        let chats = Arc::clone(&self.collaborators.chats);
        self.spawn_task(async move { TaskOutcome::ChatsLoaded(list_chats(chats.as_ref()).await) });
    }

    fn spawn_task<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = TaskOutcome> + Send + 'static,
    {
        self.activity.tasks_in_flight += 1;
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let _ = outcome_tx.send(task.await);
        });
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot {
            view: self.engine.view(),
            activity: self.activity,
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}
