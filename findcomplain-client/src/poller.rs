//! Follows one backend analysis job at a time.
//!
//! The poller owns a single slot. Every `start`/`track` takes a fresh token
//! and aborts whatever the slot held before; a status response is applied only
//! while its token is still current, so a superseded request can never
//! overwrite newer state. Published state flows through a `watch` channel.
//!
//! Status queries for the tracked session, whether from the schedule or from
//! `poll`, take turns and stop once the session has settled.

use crate::api::ApiClient;
use crate::retry::{RetryBudget, RetryConfig};
use async_trait::async_trait;
use findcomplain_core::{
    AnalysisSession, AnalyzeRequest, ClientConfig, CoreError, ErrorExt, PostLimit,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// The two calls the poller needs from the backend.
#[async_trait]
pub trait AnalysisBackend: Send + Sync + 'static {
    async fn submit_analysis(&self, request: &AnalyzeRequest) -> Result<AnalysisSession, CoreError>;
    async fn fetch_status(&self, session_id: i64) -> Result<AnalysisSession, CoreError>;
}

#[async_trait]
impl AnalysisBackend for ApiClient {
    async fn submit_analysis(&self, request: &AnalyzeRequest) -> Result<AnalysisSession, CoreError> {
        self.start_analysis(request).await
    }

    async fn fetch_status(&self, session_id: i64) -> Result<AnalysisSession, CoreError> {
        self.get_analysis_status(session_id).await
    }
}

/// Client-side view of the tracked job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PollerState {
    Idle,
    Starting {
        subreddit: String,
    },
    Polling {
        session: AnalysisSession,
    },
    Finished {
        session: AnalysisSession,
    },
    Error {
        session: Option<AnalysisSession>,
        message: String,
    },
    TimedOut {
        session: AnalysisSession,
    },
}

impl PollerState {
    /// No further updates will follow for the current schedule.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollerState::Finished { .. } | PollerState::Error { .. } | PollerState::TimedOut { .. }
        )
    }

    pub fn session(&self) -> Option<&AnalysisSession> {
        match self {
            PollerState::Polling { session }
            | PollerState::Finished { session }
            | PollerState::TimedOut { session } => Some(session),
            PollerState::Error { session, .. } => session.as_ref(),
            PollerState::Idle | PollerState::Starting { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub max_duration: Duration,
    pub retry: RetryConfig,
}

impl From<&ClientConfig> for PollSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_duration: config.max_poll_duration(),
            retry: RetryConfig::polling(config),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

#[derive(Debug, PartialEq)]
enum Applied {
    Accepted(AnalysisSession),
    /// The report was not applied; carries the report as received.
    Ignored(AnalysisSession),
    Stale,
    /// The tracked session is already terminal. Nothing was sent.
    Settled(AnalysisSession),
}

#[derive(Debug, Default)]
struct Slot {
    token: u64,
    session: Option<AnalysisSession>,
    task: Option<JoinHandle<()>>,
}

/// Slot bookkeeping shared by the poller, its task and its handles.
#[derive(Debug)]
struct Tracker {
    slot: Mutex<Slot>,
    state_tx: watch::Sender<PollerState>,
    /// Held across one status query for the tracked session.
    turn: tokio::sync::Mutex<()>,
}

impl Tracker {
    fn new() -> Self {
        let (state_tx, _) = watch::channel(PollerState::Idle);
        Self {
            slot: Mutex::new(Slot::default()),
            state_tx,
            turn: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a new token, aborting the previous schedule.
    fn begin(&self) -> u64 {
        let mut slot = self.lock();
        slot.token += 1;
        slot.session = None;
        if let Some(task) = slot.task.take() {
            debug!("Aborting previous polling schedule");
            task.abort();
        }
        slot.token
    }

    /// Invalidates `token` if it is still current.
    fn release(&self, token: u64) -> bool {
        let mut slot = self.lock();
        if slot.token != token {
            return false;
        }
        slot.token += 1;
        slot.session = None;
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        // Wake waiters without changing the published state
        self.state_tx.send_modify(|_| {});
        true
    }

    fn is_current(&self, token: u64) -> bool {
        self.lock().token == token
    }

    fn token_for(&self, session_id: i64) -> Option<u64> {
        let slot = self.lock();
        match &slot.session {
            Some(session) if session.session_id == session_id => Some(slot.token),
            _ => None,
        }
    }

    /// The tracked session if it has already reached a terminal status.
    fn settled(&self, token: u64) -> Result<Option<AnalysisSession>, ()> {
        let slot = self.lock();
        if slot.token != token {
            return Err(());
        }
        Ok(slot.session.clone().filter(AnalysisSession::is_terminal))
    }

    fn publish(&self, token: u64, state: PollerState) -> bool {
        let slot = self.lock();
        if slot.token != token {
            return false;
        }
        self.state_tx.send_replace(state);
        true
    }

    /// Records the session returned by submit/track as the tracked one.
    fn install(&self, token: u64, session: &AnalysisSession) -> bool {
        let mut slot = self.lock();
        if slot.token != token {
            return false;
        }
        slot.session = Some(session.clone());
        self.state_tx.send_replace(progress_state(session.clone()));
        true
    }

    fn attach(&self, token: u64, task: JoinHandle<()>) {
        let mut slot = self.lock();
        if slot.token == token {
            slot.task = Some(task);
        } else {
            task.abort();
        }
    }

    /// Applies a status response through the token and monotonicity guards.
    fn apply(&self, token: u64, session: AnalysisSession) -> Applied {
        let mut slot = self.lock();
        if slot.token != token {
            warn!(
                "Discarding stale status for session {} ({})",
                session.session_id, session.status
            );
            return Applied::Stale;
        }

        if let Some(current) = slot.session.clone() {
            if current.session_id != session.session_id {
                warn!(
                    "Ignoring status for session {} while tracking {}",
                    session.session_id, current.session_id
                );
                return Applied::Ignored(session);
            }
            if !current.status.can_advance_to(session.status) {
                warn!(
                    "Ignoring backward status {} -> {} for session {}",
                    current.status, session.status, session.session_id
                );
                if current.is_terminal() {
                    stop_schedule(&mut slot);
                }
                return Applied::Ignored(session);
            }
            if current.status != session.status {
                info!(
                    "Session {}: {} -> {}",
                    session.session_id, current.status, session.status
                );
            }
        }

        if session.is_terminal() {
            stop_schedule(&mut slot);
        }
        slot.session = Some(session.clone());
        self.state_tx.send_replace(progress_state(session.clone()));
        Applied::Accepted(session)
    }

    fn fail(&self, token: u64, error: &CoreError) {
        let mut slot = self.lock();
        if slot.token != token {
            return;
        }
        slot.task = None;
        self.state_tx.send_replace(PollerState::Error {
            session: slot.session.clone(),
            message: error.user_friendly_message(),
        });
    }

    fn time_out(&self, token: u64) {
        let mut slot = self.lock();
        if slot.token != token {
            return;
        }
        slot.task = None;
        if let Some(session) = slot.session.clone() {
            self.state_tx.send_replace(PollerState::TimedOut { session });
        }
    }
}

fn stop_schedule(slot: &mut Slot) {
    if let Some(task) = slot.task.take() {
        debug!("Session settled, stopping its polling schedule");
        task.abort();
    }
}

/// One status query for the tracked session, applied under `token`.
async fn poll_tracked<B: AnalysisBackend>(
    backend: &B,
    tracker: &Tracker,
    token: u64,
    session_id: i64,
) -> Result<Applied, CoreError> {
    let _turn = tracker.turn.lock().await;
    match tracker.settled(token) {
        Err(()) => return Ok(Applied::Stale),
        Ok(Some(session)) => return Ok(Applied::Settled(session)),
        Ok(None) => {}
    }
    let session = backend.fetch_status(session_id).await?;
    Ok(tracker.apply(token, session))
}

fn progress_state(session: AnalysisSession) -> PollerState {
    if session.is_terminal() {
        PollerState::Finished { session }
    } else {
        PollerState::Polling { session }
    }
}

/// Handle to one polling schedule.
#[derive(Debug)]
pub struct PollHandle {
    session: AnalysisSession,
    token: u64,
    tracker: Arc<Tracker>,
    state_rx: watch::Receiver<PollerState>,
}

impl PollHandle {
    /// The session as first reported by the backend.
    pub fn session(&self) -> &AnalysisSession {
        &self.session
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn is_active(&self) -> bool {
        self.tracker.is_current(self.token) && !self.state_rx.borrow().is_terminal()
    }

    /// Stops this schedule. Does nothing if a newer one already replaced it.
    pub fn cancel(&self) {
        if self.tracker.release(self.token) {
            info!("Cancelled polling for session {}", self.session.session_id);
        }
    }

    /// Waits until the schedule reaches a terminal state.
    pub async fn wait(&mut self) -> Result<PollerState, CoreError> {
        loop {
            if !self.tracker.is_current(self.token) {
                return Err(CoreError::Cancelled {
                    operation: format!("Polling session {}", self.session.session_id),
                });
            }
            let state = self.state_rx.borrow_and_update().clone();
            if state.is_terminal() {
                return Ok(state);
            }
            if self.state_rx.changed().await.is_err() {
                return Ok(self.state_rx.borrow().clone());
            }
        }
    }
}

pub struct AnalysisSessionPoller<B: AnalysisBackend> {
    backend: Arc<B>,
    settings: PollSettings,
    tracker: Arc<Tracker>,
}

impl<B: AnalysisBackend> Clone for AnalysisSessionPoller<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            settings: self.settings.clone(),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl<B: AnalysisBackend> AnalysisSessionPoller<B> {
    pub fn new(backend: Arc<B>, settings: PollSettings) -> Self {
        Self {
            backend,
            settings,
            tracker: Arc::new(Tracker::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.tracker.state_tx.subscribe()
    }

    pub fn state(&self) -> PollerState {
        self.tracker.state_tx.borrow().clone()
    }

    /// Submits a new analysis and follows it. Any schedule this poller owned
    /// is cancelled before the request goes out.
    pub async fn start(
        &self,
        subreddit: &str,
        keywords: Option<Vec<String>>,
        limit: PostLimit,
    ) -> Result<PollHandle, CoreError> {
        let token = self.tracker.begin();

        let request = match AnalyzeRequest::new(subreddit, keywords, limit) {
            Ok(request) => request,
            Err(e) => {
                self.publish_error(token, &e);
                return Err(e);
            }
        };

        self.tracker.publish(
            token,
            PollerState::Starting {
                subreddit: request.subreddit.clone(),
            },
        );
        info!("Starting analysis for r/{} (limit {})", request.subreddit, limit);

        let session = match self.backend.submit_analysis(&request).await {
            Ok(session) => session,
            Err(e) => {
                e.log_error();
                self.publish_error(token, &e);
                return Err(e);
            }
        };

        self.follow(token, session)
    }

    /// Follows a session that is already running on the backend.
    pub async fn track(&self, session_id: i64) -> Result<PollHandle, CoreError> {
        let token = self.tracker.begin();

        let session = match self.backend.fetch_status(session_id).await {
            Ok(session) => session,
            Err(e) => {
                e.log_error();
                self.publish_error(token, &e);
                return Err(e);
            }
        };

        self.follow(token, session)
    }

    /// Queries the status once. The result is applied only when `session_id`
    /// is the tracked session; a tracked session that already settled is
    /// returned without a request.
    pub async fn poll(&self, session_id: i64) -> Result<AnalysisSession, CoreError> {
        let token = match self.tracker.token_for(session_id) {
            Some(token) => token,
            None => return self.backend.fetch_status(session_id).await,
        };
        match poll_tracked(&*self.backend, &self.tracker, token, session_id).await? {
            Applied::Accepted(session) | Applied::Ignored(session) | Applied::Settled(session) => {
                Ok(session)
            }
            Applied::Stale => Err(CoreError::Cancelled {
                operation: format!("Polling session {}", session_id),
            }),
        }
    }

    /// Stops the active schedule. The last published state stays visible.
    pub fn cancel(&self) {
        let token = self.tracker.lock().token;
        if self.tracker.release(token) {
            info!("Polling cancelled");
        }
    }

    fn publish_error(&self, token: u64, error: &CoreError) {
        self.tracker.publish(
            token,
            PollerState::Error {
                session: None,
                message: error.user_friendly_message(),
            },
        );
    }

    fn follow(&self, token: u64, session: AnalysisSession) -> Result<PollHandle, CoreError> {
        if !self.tracker.install(token, &session) {
            return Err(CoreError::Cancelled {
                operation: format!("Analysis of r/{}", session.subreddit),
            });
        }

        if !session.is_terminal() {
            let task = tokio::spawn(run_schedule(
                Arc::clone(&self.backend),
                Arc::clone(&self.tracker),
                self.settings.clone(),
                token,
                session.session_id,
            ));
            self.tracker.attach(token, task);
        }

        Ok(PollHandle {
            session,
            token,
            tracker: Arc::clone(&self.tracker),
            state_rx: self.tracker.state_tx.subscribe(),
        })
    }
}

async fn run_schedule<B: AnalysisBackend>(
    backend: Arc<B>,
    tracker: Arc<Tracker>,
    settings: PollSettings,
    token: u64,
    session_id: i64,
) {
    let deadline = Instant::now() + settings.max_duration;
    let mut budget = RetryBudget::new(settings.retry.clone());
    let mut delay = settings.poll_interval;

    loop {
        tokio::time::sleep(delay).await;

        if !tracker.is_current(token) {
            debug!("Polling for session {} superseded", session_id);
            return;
        }
        if Instant::now() >= deadline {
            warn!(
                "Session {} still running after {:?}, giving up",
                session_id, settings.max_duration
            );
            tracker.time_out(token);
            return;
        }

        match poll_tracked(&*backend, &tracker, token, session_id).await {
            Ok(Applied::Accepted(session)) if session.is_terminal() => {
                info!("Session {} finished with {}", session_id, session.status);
                return;
            }
            Ok(Applied::Accepted(_)) | Ok(Applied::Ignored(_)) => {
                budget.reset();
                delay = settings.poll_interval;
            }
            Ok(Applied::Stale) | Ok(Applied::Settled(_)) => return,
            Err(e) => {
                if !tracker.is_current(token) {
                    return;
                }
                match budget.next_delay(&e) {
                    Some(retry_delay) => {
                        warn!(
                            "Status poll for session {} failed (attempt {}/{}): {}. Retrying in {:?}",
                            session_id,
                            budget.consecutive_failures(),
                            budget.max_retries(),
                            e,
                            retry_delay
                        );
                        delay = retry_delay;
                    }
                    None => {
                        e.log_error();
                        tracker.fail(token, &e);
                        return;
                    }
                }
            }
        }
    }
}
