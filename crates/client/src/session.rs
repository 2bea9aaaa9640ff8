//! Log-stream session driver.
//!
//! Owns the websocket connection to `/ws`, the retry and heartbeat timers,
//! and the control calls made on behalf of the user. All decisions about
//! when to connect, retry or give up come from
//! [`ReconnectMachine`]; this module only carries them out.
//!
//! Everything runs in one task driven by `tokio::select!`. Slow work
//! (connecting, HTTP calls) is spawned and reports back through a channel,
//! so commands are always handled promptly.

use std::future::{pending, Future};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use hirewatch_core::log_entry::LogEntry;
use hirewatch_core::protocol::{
    encode_control, parse_server_frame, ControlFrame, ServerFrame, ABNORMAL_CLOSURE,
    WELCOME_MESSAGE,
};
use hirewatch_core::session::{
    ConnectionState, ReconnectMachine, ReconnectPolicy, SessionAction, SessionEvent,
};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::ClientConfig;
use crate::control::{ControlClient, ControlError, StartReply};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code reported when the server closed without giving one.
const NO_STATUS_RECEIVED: u16 = 1005;

/// How long a deliberate close may take before the socket is dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// What the front end can ask of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Reset the retry counter and connect again now.
    Reconnect,
    /// `POST /start` with already validated form values.
    Start {
        links: Vec<String>,
        positions: Vec<String>,
    },
    /// `POST /stop`.
    Stop,
    /// `GET /status`, reporting failures in the log.
    RefreshStatus,
    /// Close the connection and end the session task.
    Shutdown,
}

/// What a session reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A line for the session log, in arrival order.
    Log(LogEntry),
    /// Connection or run state changed.
    Status(SessionStatus),
}

/// Snapshot of everything the status line shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub connection: ConnectionState,
    pub retry_count: u32,
    pub max_retries: u32,
    pub retry_pending: bool,
    /// `None` until the first status answer arrives.
    pub is_running: Option<bool>,
}

impl SessionStatus {
    /// One human-readable line, always non-empty.
    pub fn status_line(&self) -> String {
        let connection = match self.connection {
            ConnectionState::Connected => "Connected".to_string(),
            ConnectionState::Connecting if self.retry_count > 0 => format!(
                "Connecting (attempt {}/{})",
                self.retry_count, self.max_retries
            ),
            ConnectionState::Connecting => "Connecting...".to_string(),
            ConnectionState::Disconnected if self.retry_pending => format!(
                "Disconnected, retrying (attempt {}/{})",
                self.retry_count, self.max_retries
            ),
            ConnectionState::Disconnected => "Disconnected".to_string(),
            ConnectionState::GaveUp => format!(
                "Disconnected, gave up after {} attempts (type `reconnect`)",
                self.max_retries
            ),
        };
        let run = match self.is_running {
            Some(true) => "monitoring running",
            Some(false) => "monitoring stopped",
            None => "monitoring status unknown",
        };
        format!("{connection} | {run}")
    }
}

/// The front end's side of a running session.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    updates: mpsc::UnboundedReceiver<SessionUpdate>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Queue a command. Returns `false` once the session has ended.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Next update, or `None` once the session has ended.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        self.updates.recv().await
    }

    /// Ask the session to close and wait for it.
    pub async fn shutdown(self) {
        let _ = self.commands.send(SessionCommand::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Session task failed");
        }
    }
}

/// Start a session with the standard reconnect policy.
pub fn spawn(config: ClientConfig) -> SessionHandle {
    spawn_with_policy(config, ReconnectPolicy::default())
}

/// Start a session task. It connects immediately.
pub fn spawn_with_policy(config: ClientConfig, policy: ReconnectPolicy) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

    let session = Session {
        control: ControlClient::new(config.server_url.clone()),
        ws_url: config.ws_url(),
        poll_interval: config.status_poll_interval,
        heartbeat_interval: config.heartbeat_interval,
        machine: ReconnectMachine::new(policy),
        updates: update_tx,
        outcomes: outcome_tx,
        stream: None,
        connecting: None,
        retry_at: None,
        heartbeat: None,
        is_running: None,
        last_status: None,
    };

    SessionHandle {
        commands: command_tx,
        updates: update_rx,
        task: tokio::spawn(session.run(command_rx, outcome_rx)),
    }
}

// ---------------------------------------------------------------------------
// Session driver
// ---------------------------------------------------------------------------

/// Result of a spawned control call.
enum ControlOutcome {
    Status {
        result: Result<bool, ControlError>,
        requested: bool,
    },
    Started(Result<StartReply, ControlError>),
    Stopped(Result<String, ControlError>),
}

/// One wake-up of the select loop.
enum LoopEvent {
    Command(Option<SessionCommand>),
    Connected(Result<WsStream, String>),
    Frame(Option<Result<Message, tungstenite::Error>>),
    RetryElapsed,
    Heartbeat,
    PollTick,
    Control(ControlOutcome),
}

type ConnectTask = JoinHandle<Result<WsStream, tungstenite::Error>>;

struct Session {
    control: ControlClient,
    ws_url: String,
    poll_interval: Duration,
    heartbeat_interval: Duration,
    machine: ReconnectMachine,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    outcomes: mpsc::UnboundedSender<ControlOutcome>,
    stream: Option<WsStream>,
    connecting: Option<ConnectTask>,
    retry_at: Option<Instant>,
    heartbeat: Option<Interval>,
    is_running: Option<bool>,
    last_status: Option<SessionStatus>,
}

impl Session {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        mut outcomes: mpsc::UnboundedReceiver<ControlOutcome>,
    ) {
        self.apply(SessionEvent::Mount).await;

        let mut poll = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                command = commands.recv() => LoopEvent::Command(command),
                result = join_connect(&mut self.connecting), if self.connecting.is_some() => {
                    LoopEvent::Connected(result)
                }
                frame = next_frame(&mut self.stream), if self.stream.is_some() => {
                    LoopEvent::Frame(frame)
                }
                () = sleep_until(self.retry_at.unwrap_or_else(Instant::now)), if self.retry_at.is_some() => {
                    LoopEvent::RetryElapsed
                }
                () = tick(&mut self.heartbeat), if self.heartbeat.is_some() => LoopEvent::Heartbeat,
                _ = poll.tick() => LoopEvent::PollTick,
                Some(outcome) = outcomes.recv() => LoopEvent::Control(outcome),
            };

            if !self.on_event(event).await {
                break;
            }
        }

        self.close_channel().await;
        tracing::debug!("Session ended");
    }

    /// Handle one loop event. Returns `false` when the session should end.
    async fn on_event(&mut self, event: LoopEvent) -> bool {
        match event {
            LoopEvent::Command(None | Some(SessionCommand::Shutdown)) => return false,
            LoopEvent::Command(Some(command)) => self.on_command(command).await,

            LoopEvent::Connected(Ok(stream)) => {
                if self.machine.state() == ConnectionState::Connecting {
                    self.stream = Some(stream);
                    self.apply(SessionEvent::Opened).await;
                }
            }
            LoopEvent::Connected(Err(e)) => {
                tracing::warn!(error = %e, url = %self.ws_url, "Log stream connection failed");
                self.apply(SessionEvent::Closed {
                    code: ABNORMAL_CLOSURE,
                })
                .await;
            }

            LoopEvent::Frame(Some(Ok(Message::Text(text)))) => self.on_text(&text),
            LoopEvent::Frame(Some(Ok(Message::Close(frame)))) => {
                let code = frame.map_or(NO_STATUS_RECEIVED, |f| u16::from(f.code));
                self.stream = None;
                self.apply(SessionEvent::Closed { code }).await;
            }
            LoopEvent::Frame(Some(Ok(_))) => {
                // Ping/Pong are answered by tungstenite; binary is unused.
            }
            LoopEvent::Frame(Some(Err(e))) => {
                tracing::warn!(error = %e, "Log stream error");
                self.stream = None;
                self.apply(SessionEvent::Closed {
                    code: ABNORMAL_CLOSURE,
                })
                .await;
            }
            LoopEvent::Frame(None) => {
                self.stream = None;
                self.apply(SessionEvent::Closed {
                    code: ABNORMAL_CLOSURE,
                })
                .await;
            }

            LoopEvent::RetryElapsed => {
                self.retry_at = None;
                self.apply(SessionEvent::RetryElapsed).await;
            }
            LoopEvent::Heartbeat => self.send_heartbeat().await,
            LoopEvent::PollTick => {
                if self.machine.state() == ConnectionState::Connected {
                    self.spawn_status(false);
                }
            }
            LoopEvent::Control(outcome) => self.on_outcome(outcome),
        }
        true
    }

    async fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Reconnect => self.apply(SessionEvent::ManualReconnect).await,
            SessionCommand::Start { links, positions } => {
                let control = self.control.clone();
                self.spawn_control(async move {
                    ControlOutcome::Started(control.start(&links, &positions).await)
                });
            }
            SessionCommand::Stop => {
                let control = self.control.clone();
                self.spawn_control(async move { ControlOutcome::Stopped(control.stop().await) });
            }
            SessionCommand::RefreshStatus => self.spawn_status(true),
            SessionCommand::Shutdown => {}
        }
    }

    /// Feed `event` to the state machine and carry out its actions.
    async fn apply(&mut self, event: SessionEvent) {
        for action in self.machine.handle(event) {
            self.perform(action).await;
        }
        self.publish_status();
    }

    async fn perform(&mut self, action: SessionAction) {
        match action {
            SessionAction::Connect => {
                if let Some(task) = self.connecting.take() {
                    task.abort();
                }
                let url = self.ws_url.clone();
                tracing::debug!(url = %url, "Connecting to log stream");
                self.connecting = Some(tokio::spawn(async move {
                    connect_async(url).await.map(|(stream, _response)| stream)
                }));
            }
            SessionAction::CloseChannel => self.close_channel().await,
            SessionAction::CancelRetry => self.retry_at = None,
            SessionAction::ScheduleRetry(delay) => self.retry_at = Some(Instant::now() + delay),
            SessionAction::PollStatus => self.spawn_status(false),
            SessionAction::StartHeartbeat => {
                let mut heartbeat =
                    interval_at(Instant::now() + self.heartbeat_interval, self.heartbeat_interval);
                heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.heartbeat = Some(heartbeat);
            }
            SessionAction::StopHeartbeat => self.heartbeat = None,
            SessionAction::RecordLog(line) => self.record(line),
        }
    }

    /// Abort a pending connect and close the open socket, if any.
    async fn close_channel(&mut self) {
        if let Some(task) = self.connecting.take() {
            task.abort();
        }
        if let Some(mut stream) = self.stream.take() {
            match tokio::time::timeout(CLOSE_TIMEOUT, stream.close(None)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(error = %e, "Close handshake failed"),
                Err(_) => tracing::debug!("Close handshake timed out"),
            }
        }
    }

    fn on_text(&mut self, text: &str) {
        match parse_server_frame(text) {
            Ok(ServerFrame::Welcome) => self.emit(LogEntry::now(WELCOME_MESSAGE)),
            Ok(ServerFrame::Log(frame)) => {
                let entry = match frame.timestamp {
                    Some(timestamp) => LogEntry {
                        message: frame.log,
                        timestamp,
                    },
                    None => LogEntry::now(frame.log),
                };
                self.emit(entry);
            }
            Ok(ServerFrame::HeartbeatResponse) => {
                tracing::trace!("Heartbeat acknowledged");
            }
            Err(e) => {
                tracing::warn!(error = %e, raw = %text, "Ignoring malformed frame");
            }
        }
    }

    async fn send_heartbeat(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        let frame = encode_control(ControlFrame::Heartbeat);
        if let Err(e) = stream.send(Message::Text(frame)).await {
            // The read side reports the failure and drives the reconnect.
            tracing::warn!(error = %e, "Failed to send heartbeat");
        }
    }

    fn on_outcome(&mut self, outcome: ControlOutcome) {
        match outcome {
            ControlOutcome::Status {
                result: Ok(running),
                ..
            } => {
                self.is_running = Some(running);
                self.publish_status();
            }
            ControlOutcome::Status {
                result: Err(e),
                requested,
            } => {
                if requested {
                    self.record(format!("Failed to fetch status: {e}"));
                } else {
                    tracing::warn!(error = %e, "Status poll failed");
                }
            }
            ControlOutcome::Started(Ok(reply)) => {
                self.record(format!(
                    "{} for {} ({})",
                    reply.message,
                    reply.config.target_url,
                    reply.config.target_positions.join(", ")
                ));
                self.is_running = Some(true);
                self.publish_status();
            }
            ControlOutcome::Started(Err(e)) => {
                self.record(format!("Failed to start monitoring: {e}"));
            }
            ControlOutcome::Stopped(Ok(message)) => {
                self.record(message);
                self.is_running = Some(false);
                self.publish_status();
            }
            ControlOutcome::Stopped(Err(e)) => {
                self.record(format!("Failed to stop monitoring: {e}"));
            }
        }
    }

    fn spawn_status(&self, requested: bool) {
        let control = self.control.clone();
        self.spawn_control(async move {
            ControlOutcome::Status {
                result: control.status().await,
                requested,
            }
        });
    }

    fn spawn_control<F>(&self, call: F)
    where
        F: Future<Output = ControlOutcome> + Send + 'static,
    {
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let _ = outcomes.send(call.await);
        });
    }

    fn record(&self, line: String) {
        tracing::info!("{line}");
        self.emit(LogEntry::now(line));
    }

    fn emit(&self, entry: LogEntry) {
        let _ = self.updates.send(SessionUpdate::Log(entry));
    }

    fn publish_status(&mut self) {
        let status = SessionStatus {
            connection: self.machine.state(),
            retry_count: self.machine.retry_count(),
            max_retries: self.machine.policy().max_retries,
            retry_pending: self.machine.retry_pending(),
            is_running: self.is_running,
        };
        if self.last_status.as_ref() != Some(&status) {
            self.last_status = Some(status.clone());
            let _ = self.updates.send(SessionUpdate::Status(status));
        }
    }
}

// ---------------------------------------------------------------------------
// select! helpers: each only runs while its guard holds.
// ---------------------------------------------------------------------------

async fn join_connect(task: &mut Option<ConnectTask>) -> Result<WsStream, String> {
    let result = match task.as_mut() {
        Some(handle) => handle.await,
        None => pending().await,
    };
    *task = None;
    match result {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}

async fn next_frame(stream: &mut Option<WsStream>) -> Option<Result<Message, tungstenite::Error>> {
    match stream.as_mut() {
        Some(stream) => stream.next().await,
        None => pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval.as_mut() {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}
