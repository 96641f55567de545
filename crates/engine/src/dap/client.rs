// SnapTrace - Execution Snapshot Tracer
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! A Debug Adapter Protocol client driving one adapter process.
//!
//! Two background tasks own the transport. The writer task drains an outgoing
//! queue into the adapter's stdin. The reader task routes every response to the
//! request waiting on its `request_seq` and forwards events in arrival order.
//! Requests the adapter sends back to us (`runInTerminal`, `startDebugging`) are
//! declined.

use std::{
    collections::{HashMap, VecDeque},
    process::Stdio,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader},
    process::{Child, Command},
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, trace, warn};

use super::{
    codec::{DapReader, DapWriter},
    messages::{
        Event, ExitedBody, IncomingMessage, OutputBody, Request, Response, ScopesBody,
        SourceBreakpoints, StackTraceBody, StoppedBody, VariablesBody,
    },
};
use crate::{
    InspectionError, InspectionService, PauseEvent, RawVariable, Scope, StackFrame, StepCommand,
};

/// Waiting requests by `seq`; `None` once the adapter stream has closed
type PendingMap = Arc<Mutex<Option<HashMap<i64, oneshot::Sender<Response>>>>>;

/// A request that has been sent and not yet answered
#[derive(Debug)]
struct PendingRequest {
    command: String,
    rx: oneshot::Receiver<Response>,
}

/// Client side of a DAP session.
#[derive(Debug)]
pub struct DapClient {
    outgoing: mpsc::UnboundedSender<Value>,
    pending: PendingMap,
    events: mpsc::UnboundedReceiver<Event>,
    backlog: VecDeque<Event>,
    seq: Arc<AtomicI64>,
    timeout: Duration,
    child: Option<Child>,
    tasks: Vec<JoinHandle<()>>,
    launch: Option<PendingRequest>,
}

impl DapClient {
    /// Spawn an adapter that speaks DAP on its stdio.
    pub fn spawn(
        command: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<Self, InspectionError> {
        info!("Spawning debug adapter: {} {}", command, args.join(" "));
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| InspectionError::Protocol("adapter stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| InspectionError::Protocol("adapter stdout unavailable".to_string()))?;
        let stderr = child.stderr.take();

        let mut client = Self::connect(stdout, stdin, timeout);
        if let Some(stderr) = stderr {
            client.tasks.push(tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "snaptrace::adapter", "{line}");
                }
            }));
        }
        client.child = Some(child);
        Ok(client)
    }

    /// Run a client over an already connected transport.
    pub fn connect<R, W>(reader: R, writer: W, timeout: Duration) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let pending: PendingMap = Arc::new(Mutex::new(Some(HashMap::new())));
        let seq = Arc::new(AtomicI64::new(1));

        let writer_task = tokio::spawn(write_loop(DapWriter::new(writer), outgoing_rx));
        let reader_task = tokio::spawn(read_loop(
            DapReader::new(reader),
            pending.clone(),
            events_tx,
            outgoing.clone(),
            seq.clone(),
        ));

        Self {
            outgoing,
            pending,
            events,
            backlog: VecDeque::new(),
            seq,
            timeout,
            child: None,
            tasks: vec![writer_task, reader_task],
            launch: None,
        }
    }

    /// Bring the debuggee up to its first pause.
    ///
    /// `launch` is forwarded verbatim as the `launch` request arguments. Breakpoints
    /// are installed between the `initialized` event and `configurationDone`. Some
    /// adapters answer `launch` only after `configurationDone`, so the launch
    /// response is awaited last.
    pub async fn start(
        &mut self,
        adapter_id: &str,
        launch: Value,
        breakpoints: &[SourceBreakpoints],
    ) -> Result<(), InspectionError> {
        let capabilities = self
            .request_body(
                "initialize",
                json!({
                    "clientID": "snaptrace",
                    "clientName": "SnapTrace",
                    "adapterID": adapter_id,
                    "linesStartAt1": true,
                    "columnsStartAt1": true,
                    "pathFormat": "path",
                    "supportsVariableType": true,
                    "supportsRunInTerminalRequest": false,
                }),
            )
            .await?;
        debug!(?capabilities, "Debug adapter initialized");

        let launch_request = self.send_request("launch", launch).await?;
        self.launch = Some(launch_request);

        self.wait_for_event("initialized").await?;
        debug!("Received initialized event");

        for source in breakpoints {
            let lines: Vec<Value> =
                source.lines.iter().map(|line| json!({ "line": line })).collect();
            self.request_body(
                "setBreakpoints",
                json!({
                    "source": { "path": source.path },
                    "breakpoints": lines,
                }),
            )
            .await?;
            debug!("Breakpoints set in {}: {:?}", source.path.display(), source.lines);
        }

        self.request_body("configurationDone", json!({})).await?;

        if let Some(launch) = self.launch.take() {
            self.await_response(launch).await?;
        }
        info!("Debuggee launched");
        Ok(())
    }

    async fn send_request(
        &self,
        command: &str,
        arguments: Value,
    ) -> Result<PendingRequest, InspectionError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        match self.pending.lock().await.as_mut() {
            Some(pending) => pending.insert(seq, tx),
            None => return Err(InspectionError::Disconnected),
        };

        let request = serde_json::to_value(Request::new(seq, command, arguments))?;
        trace!("-> {request}");
        if self.outgoing.send(request).is_err() {
            if let Some(pending) = self.pending.lock().await.as_mut() {
                pending.remove(&seq);
            }
            return Err(InspectionError::Disconnected);
        }
        Ok(PendingRequest { command: command.to_string(), rx })
    }

    async fn await_response(
        &self,
        pending: PendingRequest,
    ) -> Result<Option<Value>, InspectionError> {
        let PendingRequest { command, rx } = pending;
        let response = match tokio::time::timeout(self.timeout, rx).await {
            Err(_) => return Err(InspectionError::Timeout { command, timeout: self.timeout }),
            Ok(Err(_)) => return Err(InspectionError::Disconnected),
            Ok(Ok(response)) => response,
        };
        if !response.success {
            return Err(InspectionError::Request {
                command,
                message: response.message.unwrap_or_else(|| "no message".to_string()),
            });
        }
        Ok(response.body)
    }

    async fn request_body(
        &self,
        command: &str,
        arguments: Value,
    ) -> Result<Option<Value>, InspectionError> {
        let pending = self.send_request(command, arguments).await?;
        self.await_response(pending).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        command: &str,
        arguments: Value,
    ) -> Result<T, InspectionError> {
        let body = self.request_body(command, arguments).await?.unwrap_or(Value::Null);
        Ok(serde_json::from_value(body)?)
    }

    /// Wait for a named event, keeping everything that arrives before it.
    async fn wait_for_event(&mut self, name: &str) -> Result<Event, InspectionError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            let event = tokio::time::timeout_at(deadline, self.events.recv())
                .await
                .map_err(|_| InspectionError::Timeout {
                    command: format!("wait for `{name}`"),
                    timeout: self.timeout,
                })?
                .ok_or(InspectionError::Disconnected)?;
            if event.event == name {
                return Ok(event);
            }
            if matches!(event.event.as_str(), "exited" | "terminated") {
                return Err(InspectionError::Protocol(format!(
                    "debuggee ended before `{name}`"
                )));
            }
            self.backlog.push_back(event);
        }
    }

    async fn next_raw_event(&mut self) -> Option<Event> {
        match self.backlog.pop_front() {
            Some(event) => Some(event),
            None => self.events.recv().await,
        }
    }
}

#[async_trait]
impl InspectionService for DapClient {
    async fn stack_frames(&mut self, thread_id: i64) -> Result<Vec<StackFrame>, InspectionError> {
        let body: StackTraceBody =
            self.request("stackTrace", json!({ "threadId": thread_id })).await?;
        Ok(body.stack_frames.into_iter().map(Into::into).collect())
    }

    async fn scopes(&mut self, frame_id: i64) -> Result<Vec<Scope>, InspectionError> {
        let body: ScopesBody = self.request("scopes", json!({ "frameId": frame_id })).await?;
        Ok(body.scopes.into_iter().map(Into::into).collect())
    }

    async fn variables(&mut self, reference: u64) -> Result<Vec<RawVariable>, InspectionError> {
        let body: VariablesBody =
            self.request("variables", json!({ "variablesReference": reference })).await?;
        Ok(body.variables.into_iter().map(Into::into).collect())
    }

    async fn resume(
        &mut self,
        thread_id: i64,
        command: StepCommand,
    ) -> Result<(), InspectionError> {
        self.request_body(command.as_str(), json!({ "threadId": thread_id })).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Result<PauseEvent, InspectionError> {
        loop {
            let Some(event) = self.next_raw_event().await else {
                debug!("Adapter event stream closed");
                return Ok(PauseEvent::Terminated);
            };
            match event.event.as_str() {
                "stopped" => {
                    let body: StoppedBody =
                        serde_json::from_value(event.body.unwrap_or(Value::Null))?;
                    let thread_id = body.thread_id.ok_or_else(|| {
                        InspectionError::Protocol("`stopped` event without a thread id".to_string())
                    })?;
                    return Ok(PauseEvent::Stopped { thread_id, reason: body.reason });
                }
                "exited" => {
                    let body: ExitedBody =
                        serde_json::from_value(event.body.unwrap_or(Value::Null))?;
                    return Ok(PauseEvent::Exited { exit_code: body.exit_code });
                }
                "terminated" => return Ok(PauseEvent::Terminated),
                "output" => {
                    if let Some(Ok(body)) =
                        event.body.map(serde_json::from_value::<OutputBody>)
                    {
                        debug!(
                            category = body.category.as_deref().unwrap_or("console"),
                            "{}",
                            body.output.trim_end()
                        );
                    }
                }
                other => debug!("Ignoring `{other}` event"),
            }
        }
    }

    async fn shutdown(&mut self) -> Result<(), InspectionError> {
        let disconnect = self
            .request_body("disconnect", json!({ "terminateDebuggee": true }))
            .await;
        if let Err(e) = disconnect {
            debug!("Disconnect request failed: {e}");
        }
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                debug!("Failed to kill debug adapter: {e}");
            }
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        Ok(())
    }
}

impl Drop for DapClient {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: DapWriter<W>,
    mut outgoing: mpsc::UnboundedReceiver<Value>,
) {
    while let Some(message) = outgoing.recv().await {
        if let Err(e) = writer.write_message(&message).await {
            warn!("Failed to write to debug adapter: {e}");
            break;
        }
    }
}

async fn read_loop<R: AsyncRead + Unpin>(
    mut reader: DapReader<R>,
    pending: PendingMap,
    events: mpsc::UnboundedSender<Event>,
    outgoing: mpsc::UnboundedSender<Value>,
    seq: Arc<AtomicI64>,
) {
    loop {
        let value = match reader.read_value().await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!("Debug adapter closed its output");
                break;
            }
            Err(e) => {
                warn!("Failed to read from debug adapter: {e}");
                break;
            }
        };
        trace!("<- {value}");

        match serde_json::from_value::<IncomingMessage>(value) {
            Ok(IncomingMessage::Response(response)) => {
                let waiter =
                    pending.lock().await.as_mut().and_then(|p| p.remove(&response.request_seq));
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => debug!("Unsolicited response to `{}`", response.command),
                }
            }
            Ok(IncomingMessage::Event(event)) => {
                if events.send(event).is_err() {
                    break;
                }
            }
            Ok(IncomingMessage::Request(request)) => {
                debug!("Declining reverse request `{}`", request.command);
                let reply = Response {
                    seq: seq.fetch_add(1, Ordering::SeqCst),
                    request_seq: request.seq,
                    success: false,
                    command: request.command,
                    message: Some("not supported".to_string()),
                    body: None,
                };
                let Ok(mut reply) = serde_json::to_value(reply) else { continue };
                reply["type"] = json!("response");
                let _ = outgoing.send(reply);
            }
            Err(e) => warn!("Skipping unrecognized adapter message: {e}"),
        }
    }
    // Dropping the senders wakes every waiting request with `Disconnected`.
    pending.lock().await.take();
}
