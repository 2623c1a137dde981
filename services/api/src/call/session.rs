//! Manages the lifecycle of one bridged call.
//!
//! Each call is a single logical actor: one event loop owns all session
//! state and fully processes a frame before dequeuing the next, even though
//! the two sockets deliver concurrently at the transport layer. Audio relay,
//! tool execution, and socket writes each live on their own task and talk to
//! the loop over channels, so a slow tool call never stalls the relay.

use super::{
    agent::{self, AgentCommand, AgentEvent},
    control::CallControl,
    lifecycle::SessionDeadline,
    protocol::{OutboundTelephonyFrame, TelephonyFrame},
};
use crate::state::AppState;
use anyhow::{Context, Result};
use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use switchboard_core::{
    driver::HttpMailDriver,
    history::ConversationHistory,
    lookup::AccountContext,
    tools::{ToolDispatcher, ToolOutcome, ToolParams, mailbox_tools},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, instrument, warn};

/// Where a link is in its lifecycle, driven by the frames it has seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Connecting,
    Initiated,
    Active,
    Closing,
    Closed,
}

/// The orchestrator's own progression. The terminating work runs exactly
/// once no matter how many triggers race it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    Created,
    Linking,
    Active,
    Terminating,
    Terminated,
}

/// A tool invocation awaiting its correlated result.
#[derive(Debug, Clone)]
struct PendingToolCall {
    tool_name: String,
}

/// A unit of work for the session's tool worker.
#[derive(Debug)]
pub struct ToolJob {
    pub tool_name: String,
    pub tool_call_id: String,
    pub parameters: ToolParams,
}

/// All state for one bridged call, mutated only by the session event loop.
pub struct CallSession {
    call_sid: String,
    stream_sid: Option<String>,
    telephony_state: LinkState,
    agent_state: LinkState,
    phase: SessionPhase,
    history: ConversationHistory,
    dispatcher: Option<Arc<ToolDispatcher>>,
    pending_tools: HashMap<String, PendingToolCall>,
    agent_tx: mpsc::Sender<AgentCommand>,
    caller_tx: mpsc::Sender<OutboundTelephonyFrame>,
    job_tx: Option<mpsc::Sender<ToolJob>>,
    control: Arc<dyn CallControl>,
    deadline: SessionDeadline,
}

impl CallSession {
    #[allow(clippy::too_many_arguments)]
    fn new(
        call_sid: String,
        dispatcher: Arc<ToolDispatcher>,
        agent_tx: mpsc::Sender<AgentCommand>,
        caller_tx: mpsc::Sender<OutboundTelephonyFrame>,
        job_tx: mpsc::Sender<ToolJob>,
        control: Arc<dyn CallControl>,
        ttl: Duration,
    ) -> Self {
        Self {
            call_sid,
            stream_sid: None,
            telephony_state: LinkState::Connecting,
            agent_state: LinkState::Connecting,
            phase: SessionPhase::Created,
            history: ConversationHistory::new(),
            dispatcher: Some(dispatcher),
            pending_tools: HashMap::new(),
            agent_tx,
            caller_tx,
            job_tx: Some(job_tx),
            control,
            deadline: SessionDeadline::new(ttl),
        }
    }

    fn begin_linking(&mut self) {
        if self.phase == SessionPhase::Created {
            self.phase = SessionPhase::Linking;
        }
    }

    fn is_finished(&self) -> bool {
        self.phase == SessionPhase::Terminated
    }

    fn deadline_wake(&self) -> tokio::time::Instant {
        self.deadline.wake_instant()
    }

    async fn on_telephony_frame(&mut self, frame: TelephonyFrame) {
        match frame {
            TelephonyFrame::Connected { protocol, version } => {
                info!(?protocol, ?version, "Caller stream connected");
                self.telephony_state = LinkState::Initiated;
            }
            TelephonyFrame::Start { stream_sid, start } => {
                info!(%stream_sid, call_sid = %start.call_sid, "Caller media stream started");
                self.stream_sid = Some(stream_sid);
                self.telephony_state = LinkState::Active;
                self.update_phase();
            }
            TelephonyFrame::Media { media, .. } => {
                if self.telephony_state != LinkState::Active || self.stream_sid.is_none() {
                    error!("Audio frame before stream start; dropping");
                    return;
                }
                self.send_agent(AgentCommand::SendAudio(media.payload)).await;
            }
            TelephonyFrame::Stop { .. } => {
                info!("Caller media stream stopped");
                self.telephony_state = LinkState::Closing;
                self.terminate("caller stream stopped").await;
            }
        }
    }

    async fn on_agent_event(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::Ready {
                conversation_id,
                agent_audio_format,
                user_audio_format,
            } => {
                info!(
                    ?conversation_id,
                    ?agent_audio_format,
                    ?user_audio_format,
                    "Agent conversation established"
                );
                self.agent_state = LinkState::Active;
                self.update_phase();
            }
            AgentEvent::UserTranscript(text) => {
                debug!(transcript = %text, "Caller transcript");
                self.deadline.refresh();
                self.history.push_user(text);
            }
            AgentEvent::AgentResponse(text) => {
                debug!(response = %text, "Agent response");
                self.deadline.refresh();
                self.history.push_assistant(text);
            }
            AgentEvent::AgentResponseCorrection(text) => {
                if !self.history.correct_last_assistant(text) {
                    warn!("Response correction with no assistant turn to correct");
                }
            }
            AgentEvent::Audio(payload) => {
                let Some(stream_sid) = self.stream_sid.clone() else {
                    // A relay-ordering bug: agent audio can only be addressed
                    // once the telephony stream has identified itself.
                    error!("Agent audio before stream start; no stream id to address it to");
                    return;
                };
                if self
                    .caller_tx
                    .send(OutboundTelephonyFrame::media(stream_sid, payload))
                    .await
                    .is_err()
                {
                    warn!("Caller socket writer is gone; dropping agent audio");
                }
            }
            AgentEvent::ToolCall {
                tool_name,
                tool_call_id,
                parameters,
            } => {
                self.on_tool_call(tool_name, tool_call_id, parameters).await;
            }
            AgentEvent::Closed => {
                self.agent_state = LinkState::Closed;
                self.terminate("agent link closed").await;
            }
        }
    }

    async fn on_tool_call(&mut self, tool_name: String, tool_call_id: String, parameters: ToolParams) {
        let Some(job_tx) = &self.job_tx else {
            warn!(tool = %tool_name, "Tool call after tool table was cleared; dropping");
            return;
        };
        info!(tool = %tool_name, id = %tool_call_id, "Agent requested tool");
        self.pending_tools.insert(
            tool_call_id.clone(),
            PendingToolCall {
                tool_name: tool_name.clone(),
            },
        );
        let job = ToolJob {
            tool_name,
            tool_call_id: tool_call_id.clone(),
            parameters,
        };
        if job_tx.send(job).await.is_err() {
            warn!("Tool worker is gone; discarding tool call");
            self.pending_tools.remove(&tool_call_id);
        }
    }

    async fn on_tool_outcome(&mut self, outcome: ToolOutcome) {
        if matches!(self.phase, SessionPhase::Terminating | SessionPhase::Terminated)
            || self.agent_state == LinkState::Closed
        {
            debug!(id = %outcome.tool_call_id, "Discarding tool result; session is closing");
            return;
        }
        let Some(pending) = self.pending_tools.remove(&outcome.tool_call_id) else {
            debug!(id = %outcome.tool_call_id, "Result for unknown or discarded tool call");
            return;
        };
        debug!(tool = %pending.tool_name, id = %outcome.tool_call_id, "Delivering tool result");
        self.send_agent(AgentCommand::SendToolResult {
            tool_call_id: outcome.tool_call_id,
            result: outcome.result,
            is_error: outcome.is_error,
        })
        .await;
    }

    /// The one-shot wake-up fired. Expiry is decided by the timestamp, not by
    /// the timer; an early fire leaves everything untouched. Returns whether
    /// the session expired.
    async fn on_expiry_fired(&mut self, now: chrono::DateTime<Utc>) -> bool {
        if !self.deadline.is_expired(now) {
            debug!("Early expiry wake-up; deadline has moved");
            return false;
        }
        info!("Session TTL expired; clearing all session state");
        self.history.clear();
        self.dispatcher = None;
        self.job_tx = None;
        self.pending_tools.clear();
        self.terminate("session expired").await;
        true
    }

    /// Tears the session down. Idempotent: only the first trigger closes the
    /// links and marks the call completed; later triggers are no-ops.
    async fn terminate(&mut self, reason: &str) {
        if matches!(self.phase, SessionPhase::Terminating | SessionPhase::Terminated) {
            return;
        }
        self.phase = SessionPhase::Terminating;
        info!(reason, "Terminating call session");

        self.pending_tools.clear();
        if self.agent_state != LinkState::Closed {
            self.agent_state = LinkState::Closing;
            self.send_agent(AgentCommand::Close).await;
        }
        // The provider-side hangup is best effort: the socket close already
        // ends the call for the caller.
        if let Err(e) = self.control.complete_call(&self.call_sid).await {
            warn!(error = ?e, "Failed to mark call completed");
        }
        self.phase = SessionPhase::Terminated;
    }

    async fn send_agent(&self, cmd: AgentCommand) {
        if self.agent_tx.send(cmd).await.is_err() {
            warn!("Agent link is gone; dropping outbound frame");
        }
    }

    fn update_phase(&mut self) {
        if self.phase == SessionPhase::Linking
            && self.telephony_state == LinkState::Active
            && self.agent_state == LinkState::Active
        {
            self.phase = SessionPhase::Active;
            info!("Both links established; call is live");
        }
    }
}

/// Axum handler for the telephony media stream endpoint.
///
/// A plain GET without the WebSocket upgrade handshake is answered with
/// `426 Upgrade Required`.
pub async fn call_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Path(call_sid): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_call_socket(socket, call_sid, state)),
        Err(rejection) => {
            warn!(%call_sid, %rejection, "Rejected non-upgrade request to call endpoint");
            (StatusCode::UPGRADE_REQUIRED, "WebSocket upgrade required").into_response()
        }
    }
}

/// Resolves the caller's account from the provider's call record.
async fn resolve_account(call_sid: &str, state: &AppState) -> Result<Option<AccountContext>> {
    let caller = state
        .call_control
        .caller_number(call_sid)
        .await
        .context("Failed to fetch caller number")?;
    let account = state
        .lookup
        .resolve(&caller)
        .await
        .context("Account lookup failed")?;
    if account.is_none() {
        warn!(%caller, "No account mapped to caller");
    }
    Ok(account)
}

/// Entry point for an accepted media stream connection.
///
/// Resolves the caller first; a call with no account never gets an agent
/// link and is torn down immediately. Otherwise the per-call tasks are
/// spawned and the session loop runs until termination.
#[instrument(name = "call_session", skip_all, fields(call_sid = %call_sid))]
async fn handle_call_socket(socket: WebSocket, call_sid: String, state: Arc<AppState>) {
    info!("Telephony stream connected. Resolving caller account...");

    let account = match resolve_account(&call_sid, &state).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return abort_call_setup(&call_sid, &state).await;
        }
        Err(e) => {
            error!(error = ?e, "Caller resolution failed");
            return abort_call_setup(&call_sid, &state).await;
        }
    };
    info!(email = %account.email, "Caller resolved");

    let driver = Arc::new(HttpMailDriver::new(
        state.http.clone(),
        state.config.mail_api_base.clone(),
        account.access_token.clone(),
    ));
    let dispatcher = Arc::new(mailbox_tools(driver));

    let (socket_tx, socket_rx) = socket.split();
    let (caller_tx, caller_rx) = mpsc::channel(128);
    let writer = spawn_caller_writer(socket_tx, caller_rx);

    let (agent_tx, agent_rx, agent_handle) =
        agent::start_agent_link(state.config.clone(), state.http.clone());

    let (job_tx, job_rx) = mpsc::channel(16);
    let (outcome_tx, outcome_rx) = mpsc::channel(16);
    // The worker winds down on its own once the job queue closes; a tool
    // call already in flight is allowed to finish and its result is then
    // discarded by the closed session.
    spawn_tool_worker(dispatcher.clone(), job_rx, outcome_tx);

    let session = CallSession::new(
        call_sid,
        dispatcher,
        agent_tx,
        caller_tx,
        job_tx,
        state.call_control.clone(),
        state.config.session_ttl,
    );

    run_call_session(session, socket_rx, agent_rx, outcome_rx).await;

    agent_handle.abort();
    writer.abort();
    info!("Call session finished.");
}

/// Fatal-setup path: mark the call completed and drop the socket without
/// ever creating an agent link.
async fn abort_call_setup(call_sid: &str, state: &AppState) {
    if let Err(e) = state.call_control.complete_call(call_sid).await {
        warn!(error = ?e, "Failed to mark call completed during setup abort");
    }
}

/// The session's sequential event loop.
async fn run_call_session(
    mut session: CallSession,
    mut socket_rx: SplitStream<WebSocket>,
    mut agent_rx: mpsc::Receiver<AgentEvent>,
    mut outcome_rx: mpsc::Receiver<ToolOutcome>,
) {
    session.begin_linking();
    loop {
        let wake_at = session.deadline_wake();
        tokio::select! {
            msg = socket_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => match TelephonyFrame::decode(&text) {
                    Ok(frame) => session.on_telephony_frame(frame).await,
                    Err(e) => warn!(error = %e, "Dropping unrecognized telephony frame"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    session.terminate("caller socket closed").await;
                }
                // Transport-level ping/pong and binary frames carry nothing for us.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(error = %e, "Caller socket error");
                    session.terminate("caller socket error").await;
                }
            },
            Some(event) = agent_rx.recv() => session.on_agent_event(event).await,
            Some(outcome) = outcome_rx.recv() => session.on_tool_outcome(outcome).await,
            _ = tokio::time::sleep_until(wake_at) => {
                session.on_expiry_fired(Utc::now()).await;
            }
        }
        if session.is_finished() {
            break;
        }
    }
}

/// Pumps outbound frames onto the caller's socket in queue order.
fn spawn_caller_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<OutboundTelephonyFrame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            let text = match frame.encode() {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "Failed to encode caller frame");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                warn!("Caller socket closed while writing; stopping writer");
                break;
            }
        }
    })
}

/// Executes tool jobs one at a time, posting each outcome back onto the
/// session's inbox. Serializing per session keeps results in request order;
/// the session loop keeps relaying audio while a job runs.
fn spawn_tool_worker(
    dispatcher: Arc<ToolDispatcher>,
    mut jobs: mpsc::Receiver<ToolJob>,
    outcomes: mpsc::Sender<ToolOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(job) = jobs.recv().await {
            let outcome = dispatcher
                .execute(&job.tool_name, &job.tool_call_id, &job.parameters)
                .await;
            if outcomes.send(outcome).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::protocol::{MediaChunk, StreamStart, StreamStop};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeCallControl {
        completed: AtomicUsize,
    }

    impl FakeCallControl {
        fn completed(&self) -> usize {
            self.completed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CallControl for FakeCallControl {
        async fn caller_number(&self, _call_sid: &str) -> Result<String> {
            Ok("+18185550199".to_string())
        }

        async fn complete_call(&self, _call_sid: &str) -> Result<()> {
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_session(
        control: Arc<FakeCallControl>,
    ) -> (
        CallSession,
        mpsc::Receiver<AgentCommand>,
        mpsc::Receiver<OutboundTelephonyFrame>,
        mpsc::Receiver<ToolJob>,
    ) {
        let (agent_tx, agent_rx) = mpsc::channel(32);
        let (caller_tx, caller_rx) = mpsc::channel(32);
        let (job_tx, job_rx) = mpsc::channel(32);
        let mut session = CallSession::new(
            "CA123".to_string(),
            Arc::new(ToolDispatcher::new()),
            agent_tx,
            caller_tx,
            job_tx,
            control,
            Duration::from_secs(3600),
        );
        session.begin_linking();
        (session, agent_rx, caller_rx, job_rx)
    }

    fn start_frame(stream_sid: &str) -> TelephonyFrame {
        TelephonyFrame::Start {
            stream_sid: stream_sid.to_string(),
            start: StreamStart {
                account_sid: "AC1".to_string(),
                call_sid: "CA123".to_string(),
                tracks: vec!["inbound".to_string()],
            },
        }
    }

    fn media_frame(stream_sid: &str, payload: &str) -> TelephonyFrame {
        TelephonyFrame::Media {
            stream_sid: stream_sid.to_string(),
            media: MediaChunk {
                track: None,
                chunk: None,
                timestamp: None,
                payload: payload.to_string(),
            },
        }
    }

    fn stop_frame(stream_sid: &str) -> TelephonyFrame {
        TelephonyFrame::Stop {
            stream_sid: stream_sid.to_string(),
            stop: StreamStop {
                account_sid: "AC1".to_string(),
                call_sid: "CA123".to_string(),
            },
        }
    }

    fn tool_call(id: &str) -> AgentEvent {
        AgentEvent::ToolCall {
            tool_name: "list_emails".to_string(),
            tool_call_id: id.to_string(),
            parameters: ToolParams::new(),
        }
    }

    #[tokio::test]
    async fn media_is_relayed_in_arrival_order_and_stop_completes_once() {
        let control = Arc::new(FakeCallControl::default());
        let (mut session, mut agent_rx, _caller_rx, _job_rx) = test_session(control.clone());

        session.on_telephony_frame(start_frame("MZ1")).await;
        for payload in ["a", "b", "c"] {
            session.on_telephony_frame(media_frame("MZ1", payload)).await;
        }
        for expected in ["a", "b", "c"] {
            assert_eq!(
                agent_rx.try_recv().unwrap(),
                AgentCommand::SendAudio(expected.to_string())
            );
        }
        assert_eq!(control.completed(), 0);

        session.on_telephony_frame(stop_frame("MZ1")).await;
        assert!(session.is_finished());
        assert_eq!(control.completed(), 1);
        assert_eq!(agent_rx.try_recv().unwrap(), AgentCommand::Close);

        // A racing second trigger must be a no-op.
        session.on_agent_event(AgentEvent::Closed).await;
        assert_eq!(control.completed(), 1);
        assert!(agent_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn media_before_stream_start_is_rejected() {
        let control = Arc::new(FakeCallControl::default());
        let (mut session, mut agent_rx, _caller_rx, _job_rx) = test_session(control);

        session.on_telephony_frame(media_frame("MZ1", "a")).await;
        assert!(agent_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn agent_audio_is_addressed_to_the_captured_stream() {
        let control = Arc::new(FakeCallControl::default());
        let (mut session, _agent_rx, mut caller_rx, _job_rx) = test_session(control);

        // Before the stream identifies itself there is nothing to address.
        session
            .on_agent_event(AgentEvent::Audio("early".to_string()))
            .await;
        assert!(caller_rx.try_recv().is_err());

        session.on_telephony_frame(start_frame("MZ1")).await;
        session
            .on_agent_event(AgentEvent::Audio("dGVzdA==".to_string()))
            .await;
        assert_eq!(
            caller_rx.try_recv().unwrap(),
            OutboundTelephonyFrame::media("MZ1", "dGVzdA==")
        );
    }

    #[tokio::test]
    async fn transcripts_and_corrections_shape_the_history() {
        let control = Arc::new(FakeCallControl::default());
        let (mut session, _agent_rx, _caller_rx, _job_rx) = test_session(control);

        session
            .on_agent_event(AgentEvent::UserTranscript("read my email".to_string()))
            .await;
        session
            .on_agent_event(AgentEvent::AgentResponse("You have ten emails.".to_string()))
            .await;
        session
            .on_agent_event(AgentEvent::AgentResponseCorrection(
                "You have two emails.".to_string(),
            ))
            .await;

        let turns = session.history.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "read my email");
        assert_eq!(turns[1].content, "You have two emails.");
    }

    #[tokio::test]
    async fn tool_calls_are_enqueued_and_results_correlated() {
        let control = Arc::new(FakeCallControl::default());
        let (mut session, mut agent_rx, _caller_rx, mut job_rx) = test_session(control);

        session.on_agent_event(tool_call("abc")).await;
        let job = job_rx.try_recv().unwrap();
        assert_eq!(job.tool_call_id, "abc");
        assert_eq!(job.tool_name, "list_emails");

        session
            .on_tool_outcome(ToolOutcome {
                tool_call_id: "abc".to_string(),
                result: "You have two new emails.".to_string(),
                is_error: false,
            })
            .await;
        assert_eq!(
            agent_rx.try_recv().unwrap(),
            AgentCommand::SendToolResult {
                tool_call_id: "abc".to_string(),
                result: "You have two new emails.".to_string(),
                is_error: false,
            }
        );
    }

    #[tokio::test]
    async fn tool_results_after_termination_are_discarded() {
        let control = Arc::new(FakeCallControl::default());
        let (mut session, mut agent_rx, _caller_rx, mut job_rx) = test_session(control);

        session.on_agent_event(tool_call("abc")).await;
        job_rx.try_recv().unwrap();

        session.on_telephony_frame(stop_frame("MZ1")).await;
        assert_eq!(agent_rx.try_recv().unwrap(), AgentCommand::Close);

        session
            .on_tool_outcome(ToolOutcome {
                tool_call_id: "abc".to_string(),
                result: "too late".to_string(),
                is_error: false,
            })
            .await;
        assert!(agent_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn expiry_clears_state_and_an_early_fire_does_not() {
        let control = Arc::new(FakeCallControl::default());
        let (mut session, _agent_rx, _caller_rx, _job_rx) = test_session(control.clone());

        session
            .on_agent_event(AgentEvent::UserTranscript("hello".to_string()))
            .await;

        // Simulated early fire: the deadline is an hour out.
        assert!(!session.on_expiry_fired(Utc::now()).await);
        assert_eq!(session.history.len(), 1);
        assert!(session.dispatcher.is_some());
        assert_eq!(control.completed(), 0);

        let past_deadline = Utc::now() + chrono::Duration::hours(2);
        assert!(session.on_expiry_fired(past_deadline).await);
        assert!(session.history.is_empty());
        assert!(session.dispatcher.is_none());
        assert!(session.job_tx.is_none());
        assert!(session.is_finished());
        assert_eq!(control.completed(), 1);
    }

    #[tokio::test]
    async fn termination_is_idempotent_across_triggers() {
        let control = Arc::new(FakeCallControl::default());
        let (mut session, _agent_rx, _caller_rx, _job_rx) = test_session(control.clone());

        session.terminate("caller stream stopped").await;
        session.terminate("agent link closed").await;
        session.on_agent_event(AgentEvent::Closed).await;
        assert_eq!(control.completed(), 1);
    }
}
