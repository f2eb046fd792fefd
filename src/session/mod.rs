//! Debug session: one frontend connection bound to at most one engine connection.
//!
//! All session state lives on the thread running [`serve`]. The DAP reader
//! thread, the engine reader thread and the log forwarder only feed the
//! session through its inbox, so handlers never race each other.

mod paths;
mod reference;

pub use paths::PathResolver;
pub use reference::{ReferenceError, ScopeKind, ScopeReference};

use crate::breakpoint::{BreakpointLocation, BreakpointManager, SourceBreakpoint};
use crate::dap::protocol::{
    EvaluateArguments, ScopesArguments, SetBreakpointsArguments, SetVariableArguments,
    StackTraceArguments, VariablesArguments,
};
use crate::dap::{DapReader, DapRequest, DapWriter, EvaluateContext, LaunchArguments, Tracer};
use crate::remote::correlator::{wait_all, DEFAULT_EVAL_TIMEOUT};
use crate::remote::{
    self, CommandSink, Correlator, ReaderEvent, RemoteCommand, RemoteEvent, RemoteWriter,
    StackFrameDescriptor,
};
use crate::scope::ScopeCache;
use anyhow::{anyhow, Context};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// The engine runs a single script thread.
pub const THREAD_ID: i64 = 1;
const THREAD_NAME: &str = "TorqueScript";

const FAILED_TO_FETCH: &str = "Failed to fetch!";
const FAILED_TO_EVALUATE: &str = "Failed to evaluate!";
/// Engine rendering of an unset variable.
const EMPTY_VALUE: &str = "\"\"";

const DEFAULT_LEVELS: usize = 1000;
const CONFIGURATION_WAIT: Duration = Duration::from_secs(1);
/// Upper bound of evaluations in flight for one variables request.
const MAX_IN_FLIGHT: usize = 64;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub eval_timeout: Duration,
    /// Bounds both the TCP connect and the password handshake.
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            eval_timeout: DEFAULT_EVAL_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Connecting,
    Authenticating,
    Running,
    Stopped,
    Disconnected,
}

enum Incoming {
    Request(DapRequest),
    ClientClosed,
    Remote(ReaderEvent),
    Log(String),
}

struct PendingLaunch {
    req: DapRequest,
    args: LaunchArguments,
    since: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StopReason {
    Breakpoint(i64),
    Step,
    Pause,
}

impl StopReason {
    fn name(self) -> &'static str {
        match self {
            StopReason::Breakpoint(_) => "breakpoint",
            StopReason::Step => "step",
            StopReason::Pause => "pause",
        }
    }
}

/// Why the engine stopped with `frames`, ignoring a requested pause.
fn stop_reason(breakpoints: &BreakpointManager, frames: &[StackFrameDescriptor]) -> StopReason {
    frames
        .first()
        .and_then(|top| breakpoints.find(&top.file, top.line))
        .map(|bp| StopReason::Breakpoint(bp.id))
        .unwrap_or(StopReason::Step)
}

/// Variables shown for `names`: timeouts get a placeholder, unset variables are hidden.
fn visible_variables(names: Vec<String>, values: Vec<Option<String>>) -> Vec<Value> {
    names
        .into_iter()
        .zip(values)
        .filter_map(|(name, value)| {
            let value = value.unwrap_or_else(|| FAILED_TO_FETCH.to_string());
            (value != EMPTY_VALUE).then(|| {
                json!({
                    "name": name,
                    "value": value,
                    "variablesReference": 0,
                })
            })
        })
        .collect()
}

/// Run one debug session over a frontend connection until it disconnects.
pub fn serve<R, W>(
    reader: R,
    writer: W,
    config: SessionConfig,
    tracer: Option<Tracer>,
) -> anyhow::Result<()>
where
    R: Read + Send + 'static,
    W: Write,
{
    let session = DebugSession::new(DapWriter::new(writer, tracer.clone()), config);
    session.spawn_client_reader(DapReader::new(reader, tracer))?;
    session.run()
}

struct DebugSession<W: Write> {
    output: DapWriter<W>,
    config: SessionConfig,
    state: State,
    inbox_tx: Sender<Incoming>,
    inbox: Receiver<Incoming>,
    pending_launch: Option<PendingLaunch>,
    configuration_done: bool,
    trace: bool,
    remote: RemoteWriter,
    correlator: Correlator,
    breakpoints: BreakpointManager,
    paths: PathResolver,
    scopes: ScopeCache,
    /// Engine stack of the last stop, innermost first.
    frames: Vec<StackFrameDescriptor>,
    /// Offset of the last served stack window, view frame ids are relative to it.
    stack_start: usize,
    pause_pending: bool,
}

impl<W: Write> DebugSession<W> {
    fn new(output: DapWriter<W>, config: SessionConfig) -> Self {
        let (inbox_tx, inbox) = mpsc::channel();
        let workspace = std::env::current_dir().unwrap_or_default();
        Self {
            output,
            correlator: Correlator::new(config.eval_timeout),
            config,
            state: State::Idle,
            inbox_tx,
            inbox,
            pending_launch: None,
            configuration_done: false,
            trace: false,
            remote: RemoteWriter::default(),
            breakpoints: BreakpointManager::default(),
            paths: PathResolver::new(&workspace, None),
            scopes: ScopeCache::default(),
            frames: vec![],
            stack_start: 0,
            pause_pending: false,
        }
    }

    fn spawn_client_reader<R: Read + Send + 'static>(
        &self,
        mut reader: DapReader<R>,
    ) -> anyhow::Result<()> {
        let tx = self.inbox_tx.clone();
        thread::Builder::new()
            .name("dap-reader".to_string())
            .spawn(move || loop {
                let msg = match reader.read_message() {
                    Ok(Some(msg)) => msg,
                    Ok(None) => {
                        let _ = tx.send(Incoming::ClientClosed);
                        return;
                    }
                    Err(err) => {
                        warn!(target: "dap", "read failed: {err:#}");
                        let _ = tx.send(Incoming::ClientClosed);
                        return;
                    }
                };
                match serde_json::from_value::<DapRequest>(msg) {
                    Ok(req) if req.r#type == "request" => {
                        if tx.send(Incoming::Request(req)).is_err() {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(err) => warn!(target: "dap", "malformed request: {err}"),
                }
            })
            .context("spawn DAP reader")?;
        Ok(())
    }

    fn run(mut self) -> anyhow::Result<()> {
        let result = self.event_loop();
        self.remote.shutdown();
        self.stop_trace();
        result
    }

    fn event_loop(&mut self) -> anyhow::Result<()> {
        loop {
            let incoming = match self.pending_launch.as_ref().map(|l| l.since + CONFIGURATION_WAIT) {
                Some(deadline) => {
                    match self
                        .inbox
                        .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                    {
                        Ok(incoming) => incoming,
                        Err(RecvTimeoutError::Timeout) => {
                            self.start_launch()?;
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => return Ok(()),
                    }
                }
                None => match self.inbox.recv() {
                    Ok(incoming) => incoming,
                    Err(_) => return Ok(()),
                },
            };

            match incoming {
                Incoming::Request(req) => {
                    if !self.handle_request(&req)? {
                        return Ok(());
                    }
                }
                Incoming::ClientClosed => {
                    info!(target: "dap", "client closed the connection");
                    return Ok(());
                }
                Incoming::Remote(event) => self.handle_remote(event)?,
                Incoming::Log(line) => {
                    self.send_event_body("output", json!({"category": "console", "output": line}))?
                }
            }
        }
    }

    fn handle_request(&mut self, req: &DapRequest) -> anyhow::Result<bool> {
        debug!(target: "dap", "request #{} {}", req.seq, req.command);
        match self.dispatch(req) {
            Ok(cont) => Ok(cont),
            Err(e) => {
                self.send_err(req, format!("{e:#}"))?;
                Ok(true)
            }
        }
    }

    fn dispatch(&mut self, req: &DapRequest) -> anyhow::Result<bool> {
        match req.command.as_str() {
            "initialize" => self.handle_initialize(req)?,
            "launch" | "attach" => self.handle_launch(req)?,
            "configurationDone" => self.handle_configuration_done(req)?,
            "setBreakpoints" => self.handle_set_breakpoints(req)?,
            "threads" => self.handle_threads(req)?,
            "stackTrace" => self.handle_stack_trace(req)?,
            "scopes" => self.handle_scopes(req)?,
            "variables" => self.handle_variables(req)?,
            "setVariable" => self.handle_set_variable(req)?,
            "continue" => self.handle_continue(req)?,
            "next" => self.handle_step(req, RemoteCommand::StepOver)?,
            "stepIn" => self.handle_step(req, RemoteCommand::StepIn)?,
            "stepOut" => self.handle_step(req, RemoteCommand::StepOut)?,
            "pause" => self.handle_pause(req)?,
            "evaluate" => self.handle_evaluate(req)?,
            "disconnect" => {
                self.handle_disconnect(req)?;
                return Ok(false);
            }
            other => {
                self.send_err(req, format!("Unsupported DAP command: {other}"))?;
            }
        }
        Ok(true)
    }

    fn send_success(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        self.output.respond(req, true, None, None)
    }

    fn send_success_body<T: Serialize>(&mut self, req: &DapRequest, body: T) -> anyhow::Result<()> {
        let body = serde_json::to_value(body)?;
        self.output.respond(req, true, None, Some(body))
    }

    fn send_err(&mut self, req: &DapRequest, message: impl ToString) -> anyhow::Result<()> {
        self.output.respond(req, false, Some(message.to_string()), None)
    }

    fn send_event(&mut self, name: &'static str) -> anyhow::Result<()> {
        self.output.event(name, None)
    }

    fn send_event_body<T: Serialize>(&mut self, name: &'static str, body: T) -> anyhow::Result<()> {
        let body = serde_json::to_value(body)?;
        self.output.event(name, Some(body))
    }

    /// Fire-and-forget engine write, a closed connection is not an error here.
    fn send_remote(&self, cmd: &RemoteCommand) {
        if let Err(e) = self.remote.send(cmd) {
            warn!(target: "remote", "{cmd}: {e}");
        }
    }

    /// Execution control command, the engine resumes.
    fn resume(&mut self, cmd: RemoteCommand) -> anyhow::Result<()> {
        self.remote
            .send(&cmd)
            .with_context(|| format!("send {cmd}"))?;
        if self.state == State::Stopped {
            self.state = State::Running;
        }
        Ok(())
    }

    fn source(&self, file: &str) -> Value {
        let name = Path::new(file)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| file.to_string());
        json!({
            "name": name,
            "path": self.paths.to_client(file).to_string_lossy(),
        })
    }

    /// Engine frame index of a view-relative frame id.
    fn engine_frame(&self, view_frame: usize) -> usize {
        self.stack_start.saturating_add(view_frame)
    }

    fn view_frame(&self, view_frame: usize) -> Option<&StackFrameDescriptor> {
        self.frames.get(self.engine_frame(view_frame))
    }

    fn handle_initialize(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        let body = json!({
            "supportsConfigurationDoneRequest": true,
            "supportsEvaluateForHovers": true,
            "supportsConditionalBreakpoints": true,
            "supportsHitConditionalBreakpoints": true,
            "supportsSetVariable": true,
            "supportsStepBack": false,
            "supportsDataBreakpoints": false,
            "supportsCompletionsRequest": false,
            "supportsDisassembleRequest": false,
            "supportsReadMemoryRequest": false,
            "supportsWriteMemoryRequest": false,
            "supportsFunctionBreakpoints": false,
            "supportsDelayedStackTraceLoading": false,
            "supportsExceptionInfoRequest": false,
        });
        self.send_success_body(req, body)?;
        self.send_event("initialized")
    }

    /// Remember the launch, the engine is contacted once configuration is done.
    fn handle_launch(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        if self.state != State::Idle || self.pending_launch.is_some() {
            return Err(anyhow!("{}: session already started", req.command));
        }
        let args: LaunchArguments = req.arguments()?;
        let workspace = match &args.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir().context("resolve working directory")?,
        };
        self.paths = PathResolver::new(&workspace, args.root_dir.as_deref());
        if args.trace && !self.trace {
            self.start_trace();
        }

        info!(target: "dap", "{} {}:{}", req.command, args.address, args.port);
        self.pending_launch = Some(PendingLaunch {
            req: req.clone(),
            args,
            since: Instant::now(),
        });
        if self.configuration_done {
            self.start_launch()?;
        }
        Ok(())
    }

    fn start_trace(&mut self) {
        let tx = Mutex::new(self.inbox_tx.clone());
        crate::log::forward_to(Some(Box::new(move |line| {
            if let Ok(tx) = tx.lock() {
                let _ = tx.send(Incoming::Log(line));
            }
        })));
        self.trace = true;
    }

    fn stop_trace(&mut self) {
        if self.trace {
            crate::log::forward_to(None);
            self.trace = false;
        }
    }

    fn handle_configuration_done(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        self.configuration_done = true;
        self.send_success(req)?;
        self.start_launch()
    }

    fn start_launch(&mut self) -> anyhow::Result<()> {
        let Some(PendingLaunch { req, args, since }) = self.pending_launch.take() else {
            return Ok(());
        };
        if !self.configuration_done {
            debug!(target: "dap", "no configurationDone after {:?}, connecting anyway", since.elapsed());
        }

        match self.connect(&args) {
            Ok(()) => {
                self.send_success(&req)?;
                // release the engine if it waits in a break
                self.send_remote(&RemoteCommand::Continue);
                Ok(())
            }
            Err(e) => {
                warn!(target: "dap", "{} failed: {e}", req.command);
                self.state = State::Idle;
                self.stop_trace();
                self.send_err(&req, e)
            }
        }
    }

    fn connect(&mut self, args: &LaunchArguments) -> Result<(), remote::Error> {
        self.state = State::Connecting;
        let mut stream = remote::connect(&args.address, args.port, self.config.connect_timeout)?;

        self.state = State::Authenticating;
        let leftover = remote::authenticate(&mut stream, &args.password, self.config.connect_timeout)?;

        self.remote = RemoteWriter::new(stream.try_clone()?);
        let tx = self.inbox_tx.clone();
        remote::spawn_reader(stream, leftover, self.correlator.clone(), move |event| {
            tx.send(Incoming::Remote(event)).is_ok()
        })?;
        self.state = State::Running;

        for cmd in self.breakpoints.replay() {
            self.send_remote(&cmd);
        }
        Ok(())
    }

    fn handle_set_breakpoints(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        let args: SetBreakpointsArguments = req.arguments()?;
        let path = args
            .source
            .path
            .as_deref()
            .ok_or_else(|| anyhow!("setBreakpoints: missing arguments.source.path"))?;
        let file = self.paths.to_remote(path);

        let requested = args
            .breakpoints
            .into_iter()
            .map(|bp| SourceBreakpoint {
                line: bp.line,
                condition: bp.condition,
                hit_condition: bp.hit_condition,
            })
            .collect::<Vec<_>>();
        let update = self.breakpoints.replace(&file, &requested);
        // not connected yet: the whole table is replayed after the handshake
        if self.remote.is_connected() {
            for cmd in &update.commands {
                self.send_remote(cmd);
            }
        }

        let breakpoints = update
            .installed
            .iter()
            .map(|bp| json!({"id": bp.id, "verified": true, "line": bp.line}))
            .collect::<Vec<_>>();
        self.send_success_body(req, json!({"breakpoints": breakpoints}))
    }

    fn handle_threads(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        self.send_success_body(
            req,
            json!({"threads": [{"id": THREAD_ID, "name": THREAD_NAME}]}),
        )
    }

    fn handle_stack_trace(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        let args: StackTraceArguments = req.arguments()?;
        let start = args.start_frame.unwrap_or(0);
        let levels = args.levels.filter(|l| *l > 0).unwrap_or(DEFAULT_LEVELS);

        let frames = self
            .frames
            .iter()
            .skip(start)
            .take(levels)
            .enumerate()
            .map(|(id, frame)| {
                json!({
                    "id": id,
                    "name": frame.function,
                    "source": self.source(&frame.file),
                    "line": frame.line,
                    "column": 0,
                })
            })
            .collect::<Vec<_>>();
        self.stack_start = start;

        let total = frames.len();
        self.send_success_body(req, json!({"stackFrames": frames, "totalFrames": total}))
    }

    fn handle_scopes(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        let args: ScopesArguments = req.arguments()?;
        let source = self.view_frame(args.frame_id).map(|f| self.source(&f.file));

        let mut locals = json!({
            "name": "Locals",
            "presentationHint": "locals",
            "variablesReference": ScopeReference::new(args.frame_id, ScopeKind::Local).encode()?,
            "expensive": false,
        });
        let mut globals = json!({
            "name": "Globals",
            "variablesReference": ScopeReference::new(args.frame_id, ScopeKind::Global).encode()?,
            "expensive": true,
        });
        if let Some(source) = source {
            locals["source"] = source.clone();
            globals["source"] = source;
        }
        self.send_success_body(req, json!({"scopes": [locals, globals]}))
    }

    fn handle_variables(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        let args: VariablesArguments = req.arguments()?;
        let reference = ScopeReference::decode(args.variables_reference)?;
        let variables = self.scope_variables(reference);
        self.send_success_body(req, json!({"variables": variables}))
    }

    fn scope_variables(&mut self, reference: ScopeReference) -> Vec<Value> {
        let Some(frame) = self.view_frame(reference.frame).cloned() else {
            debug!(target: "dap", "variables of unknown frame {}", reference.frame);
            return vec![];
        };

        let path = self.paths.to_client(&frame.file);
        let names = match self.scopes.get_or_parse(&path) {
            Some(scopes) => match reference.kind {
                ScopeKind::Local => scopes.locals_of(&frame.function),
                ScopeKind::Global => scopes.globals(),
            },
            None => vec![],
        };

        let values = self.fetch_values(self.engine_frame(reference.frame), &names);
        visible_variables(names, values)
    }

    /// Evaluate every name concurrently in chunks, keeping input order.
    fn fetch_values(&self, frame: usize, names: &[String]) -> Vec<Option<String>> {
        names
            .chunks(MAX_IN_FLIGHT)
            .flat_map(|chunk| {
                let requests = chunk
                    .iter()
                    .map(|name| self.correlator.evaluate(&self.remote, frame, name))
                    .collect();
                wait_all(requests)
            })
            .collect()
    }

    fn handle_set_variable(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        let args: SetVariableArguments = req.arguments()?;
        let reference = ScopeReference::decode(args.variables_reference)?;
        let frame = self.engine_frame(reference.frame);

        // the assignment answer is of no interest, dropping the request forgets its tag
        drop(self.correlator.evaluate(
            &self.remote,
            frame,
            &format!("{}={}", args.name, args.value),
        ));
        let value = self
            .correlator
            .evaluate(&self.remote, frame, &args.name)
            .wait()
            .unwrap_or_else(|| FAILED_TO_FETCH.to_string());
        self.send_success_body(req, json!({"value": value, "variablesReference": 0}))
    }

    fn handle_continue(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        self.resume(RemoteCommand::Continue)?;
        self.send_success_body(req, json!({"allThreadsContinued": true}))
    }

    fn handle_step(&mut self, req: &DapRequest, cmd: RemoteCommand) -> anyhow::Result<()> {
        self.resume(cmd)?;
        self.send_success(req)
    }

    /// The engine has no pause command: single-step and report the next stop as a pause.
    fn handle_pause(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        self.resume(RemoteCommand::StepIn)?;
        self.pause_pending = true;
        self.send_success(req)
    }

    fn handle_evaluate(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        let args: EvaluateArguments = req.arguments()?;
        let context = args.context();
        if context == EvaluateContext::Repl {
            // answered through COUT lines
            self.remote
                .send(&RemoteCommand::ConsoleEval {
                    expr: args.expression,
                })
                .context("evaluate")?;
            return self.send_success_body(req, json!({"result": "", "variablesReference": 0}));
        }

        let frame = self.engine_frame(args.frame_id.unwrap_or(0));
        let result = self
            .correlator
            .evaluate(&self.remote, frame, &args.expression)
            .wait();
        match (result, context) {
            (Some(result), _) => {
                self.send_success_body(req, json!({"result": result, "variablesReference": 0}))
            }
            (None, EvaluateContext::Hover) => self.output.respond(req, false, None, None),
            (None, _) => self.send_err(req, FAILED_TO_EVALUATE),
        }
    }

    fn handle_disconnect(&mut self, req: &DapRequest) -> anyhow::Result<()> {
        self.remote.shutdown();
        self.state = State::Disconnected;
        self.send_success(req)
    }

    fn handle_remote(&mut self, event: ReaderEvent) -> anyhow::Result<()> {
        match event {
            ReaderEvent::Event(event) => self.handle_remote_event(event),
            ReaderEvent::Consumed => {
                if std::mem::take(&mut self.pause_pending) {
                    self.stop_for_pause()?;
                }
                Ok(())
            }
            ReaderEvent::Closed => {
                info!(target: "remote", "engine closed the connection");
                self.on_remote_closed()
            }
            ReaderEvent::Failed(e) => {
                warn!(target: "remote", "engine connection failed: {e}");
                self.on_remote_closed()
            }
        }
    }

    fn on_remote_closed(&mut self) -> anyhow::Result<()> {
        self.remote.shutdown();
        if self.state == State::Disconnected {
            return Ok(());
        }
        self.state = State::Disconnected;
        self.send_event("terminated")
    }

    fn handle_remote_event(&mut self, event: RemoteEvent) -> anyhow::Result<()> {
        let pausing = std::mem::take(&mut self.pause_pending);

        match event {
            RemoteEvent::ConsoleOutput(text) => self.send_event_body(
                "output",
                json!({"category": "stdout", "output": format!("{text}\n")}),
            )?,
            RemoteEvent::Running => {
                self.state = State::Running;
                self.send_event_body(
                    "continued",
                    json!({"threadId": THREAD_ID, "allThreadsContinued": true}),
                )?;
            }
            RemoteEvent::BreakpointCleared { file, line } => {
                if let Some(bp) = self.breakpoints.remote_clear(&file, line) {
                    self.send_breakpoint_event("removed", &file, &bp, false)?;
                }
            }
            RemoteEvent::BreakpointMoved {
                file,
                line,
                new_line,
            } => {
                if let Some(bp) = self.breakpoints.remote_move(&file, line, new_line) {
                    self.send_breakpoint_event("changed", &file, &bp, true)?;
                }
            }
            RemoteEvent::Break(frames) => {
                self.frames = frames;
                self.state = State::Stopped;
                let reason = if pausing {
                    StopReason::Pause
                } else {
                    stop_reason(&self.breakpoints, &self.frames)
                };
                return self.send_stopped(reason);
            }
            RemoteEvent::EvalOut { tag, .. } => {
                debug!(target: "remote", "EVALOUT {tag} bypassed the correlator")
            }
            RemoteEvent::Pass(token) => debug!(target: "remote", "unexpected PASS {token}"),
            RemoteEvent::Unknown(line) => debug!(target: "remote", "ignored line: {line}"),
        }

        if pausing {
            self.stop_for_pause()?;
        }
        Ok(())
    }

    /// Report the line that followed a `pause` request as the pause stop.
    fn stop_for_pause(&mut self) -> anyhow::Result<()> {
        self.state = State::Stopped;
        self.send_stopped(StopReason::Pause)
    }

    fn send_stopped(&mut self, reason: StopReason) -> anyhow::Result<()> {
        let mut body = json!({
            "reason": reason.name(),
            "threadId": THREAD_ID,
            "allThreadsStopped": true,
        });
        if let StopReason::Breakpoint(id) = reason {
            body["hitBreakpointIds"] = json!([id]);
        }
        self.send_event_body("stopped", body)
    }

    fn send_breakpoint_event(
        &mut self,
        reason: &str,
        file: &str,
        bp: &BreakpointLocation,
        verified: bool,
    ) -> anyhow::Result<()> {
        let body = json!({
            "reason": reason,
            "breakpoint": {
                "id": bp.id,
                "verified": verified,
                "line": bp.line,
                "source": self.source(file),
            },
        });
        self.send_event_body("breakpoint", body)
    }
}
