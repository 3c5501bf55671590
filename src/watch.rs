//! Side-effect executor for the task viewer.
//!
//! `update` only records [`Request`]s; [`Watcher`] carries them out (REST
//! calls, opening and closing the live session, exporting the log) and
//! reports results back as [`AppEvent`]s on the loop's channel.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use crate::app::{AppState, Request};
use crate::event::AppEvent;
use crate::model::{StreamMessage, TaskAction, TaskId};
use crate::stream::{
    ConnectionState, SessionDeps, StreamEvent, Subscription, TaskStreamSession, Topic,
};

type OpenResult = Result<Option<TaskStreamSession>, JoinError>;

pub struct Watcher {
    deps: SessionDeps,
    events: mpsc::UnboundedSender<AppEvent>,
    session: Option<TaskStreamSession>,
    subscriptions: Vec<Subscription>,
    opening: Option<JoinHandle<Option<TaskStreamSession>>>,
    export_dir: PathBuf,
}

impl Watcher {
    pub fn new(
        deps: SessionDeps,
        events: mpsc::UnboundedSender<AppEvent>,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            deps,
            events,
            session: None,
            subscriptions: Vec::new(),
            opening: None,
            export_dir,
        }
    }

    pub fn session(&self) -> Option<&TaskStreamSession> {
        self.session.as_ref()
    }

    pub fn is_opening(&self) -> bool {
        self.opening.is_some()
    }

    fn emit(&self, event: AppEvent) {
        if self.events.send(event).is_err() {
            debug!("event loop gone; dropping event");
        }
    }

    /// Fetch the task in the background; answers with `TaskLoaded` or `TaskFetchFailed`.
    pub fn refresh(&self, task_id: &TaskId) {
        let api = self.deps.api.clone();
        let tx = self.events.clone();
        let task_id = task_id.clone();
        tokio::spawn(async move {
            let event = match api.get_task(&task_id).await {
                Ok(task) => AppEvent::TaskLoaded(task),
                Err(error) => AppEvent::TaskFetchFailed(error),
            };
            let _ = tx.send(event);
        });
    }

    /// Carry out one request queued by `update`.
    pub fn perform(&mut self, state: &AppState, request: Request) {
        match request {
            Request::OpenSession => self.open_session(state),
            Request::CloseSession => {
                self.close_session();
                self.emit(AppEvent::SessionClosed);
            }
            Request::Cancel => self.run_action(state, TaskAction::Cancel),
            Request::Delete => self.run_action(state, TaskAction::Delete),
            Request::ExportLog => {
                let path = self
                    .export_dir
                    .join(format!("task-{}-output.txt", state.task_id));
                let result = state
                    .log
                    .write_to(&path)
                    .map(|()| path)
                    .map_err(|e| e.to_string());
                self.emit(AppEvent::LogExported(result));
            }
        }
    }

    fn open_session(&mut self, state: &AppState) {
        if self.session.is_some() || self.opening.is_some() {
            return;
        }
        let Some(task) = state.task.clone() else {
            return;
        };
        let deps = self.deps.clone();
        self.opening = Some(tokio::spawn(async move {
            TaskStreamSession::open(&deps, &task).await
        }));
    }

    /// Resolves when a pending session open finishes; never resolves if none is pending.
    pub async fn opened(&mut self) -> OpenResult {
        match self.opening.as_mut() {
            Some(handle) => {
                let result = handle.await;
                self.opening = None;
                result
            }
            None => std::future::pending().await,
        }
    }

    /// Adopt the result of [`Watcher::opened`].
    pub fn attach(&mut self, result: OpenResult) {
        let session = match result {
            Ok(Some(session)) => session,
            Ok(None) => {
                self.emit(AppEvent::SessionClosed);
                return;
            }
            Err(e) if e.is_cancelled() => return,
            Err(e) => {
                warn!(error = %e, "session open task failed");
                self.emit(AppEvent::StreamError(e.to_string()));
                self.emit(AppEvent::SessionClosed);
                return;
            }
        };

        let tx = self.events.clone();
        self.subscriptions.push(session.subscribe(Topic::Connected, move |_| {
            let _ = tx.send(AppEvent::ConnectionChanged(true));
        }));
        let tx = self.events.clone();
        self.subscriptions.push(session.subscribe(Topic::Disconnected, move |_| {
            let _ = tx.send(AppEvent::ConnectionChanged(false));
        }));
        let tx = self.events.clone();
        self.subscriptions.push(session.subscribe(Topic::Error, move |event| {
            let message = match event {
                StreamEvent::Message(StreamMessage::Error { error, .. }) => error.clone(),
                StreamEvent::TransportError(reason) => reason.clone(),
                _ => return,
            };
            let _ = tx.send(AppEvent::StreamError(message));
        }));

        self.emit(AppEvent::SessionOpened {
            log: session.log(),
            snapshot_error: session.snapshot_error().cloned(),
            connected: session.connection_state() == ConnectionState::Open,
        });
        self.session = Some(session);
    }

    fn close_session(&mut self) {
        if let Some(handle) = self.opening.take() {
            handle.abort();
        }
        self.subscriptions.clear();
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }

    fn run_action(&self, state: &AppState, action: TaskAction) {
        let api = self.deps.api.clone();
        let tx = self.events.clone();
        let task_id = state.task_id.clone();
        tokio::spawn(async move {
            let result = match action {
                TaskAction::Cancel => api.cancel_task(&task_id).await,
                TaskAction::Delete => api.delete_task(&task_id).await.map(|()| String::new()),
                TaskAction::ViewLive => return,
            };
            let _ = tx.send(AppEvent::ActionFinished { action, result });
        });
    }

    /// Close everything without reporting back. Used on exit.
    pub fn shutdown(&mut self) {
        self.close_session();
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
