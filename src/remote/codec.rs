//! Wire format of the engine debugger.
//!
//! Every message is one line of space separated tokens, the first token
//! names the message. Inbound lines end with CRLF, outbound lines with LF.
//! There is no escaping: a value that contains CRLF cannot be transported.

use itertools::Itertools;
use log::warn;
use std::fmt;
use std::str::FromStr;
use strum_macros::EnumString;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CodecError {
    #[error("empty line")]
    Empty,
    #[error("{verb}: missing {field}")]
    MissingField {
        verb: &'static str,
        field: &'static str,
    },
    #[error("{verb}: invalid {field} `{value}`")]
    InvalidNumber {
        verb: &'static str,
        field: &'static str,
        value: String,
    },
}

/// Command sent to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCommand {
    BreakpointSet {
        file: String,
        line: i64,
        hit_count: i64,
        condition: Option<String>,
    },
    BreakpointClear {
        file: String,
        line: i64,
    },
    /// Evaluate an expression in a stack frame, answered with `EVALOUT <tag>`.
    Eval {
        tag: u64,
        frame: usize,
        expr: String,
    },
    /// Console evaluation, output arrives as `COUT` lines.
    ConsoleEval {
        expr: String,
    },
    Continue,
    StepOver,
    StepIn,
    StepOut,
}

impl RemoteCommand {
    /// Line ready to be written to the socket.
    pub fn encode(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteCommand::BreakpointSet {
                file,
                line,
                hit_count,
                condition,
            } => write!(
                f,
                "BRKSET {file} {line} false {hit_count} {}",
                condition.as_deref().unwrap_or("true")
            ),
            RemoteCommand::BreakpointClear { file, line } => write!(f, "BRKCLR {file} {line}"),
            RemoteCommand::Eval { tag, frame, expr } => write!(f, "EVAL {tag} {frame} {expr}"),
            RemoteCommand::ConsoleEval { expr } => write!(f, "CEVAL {expr}"),
            RemoteCommand::Continue => f.write_str("CONTINUE"),
            RemoteCommand::StepOver => f.write_str("STEPOVER"),
            RemoteCommand::StepIn => f.write_str("STEPIN"),
            RemoteCommand::StepOut => f.write_str("STEPOUT"),
        }
    }
}

/// One level of the remote call stack.
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrameDescriptor {
    pub file: String,
    pub function: String,
    pub line: i64,
}

/// Message received from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// Handshake answer, `WrongPassword` on failure.
    Pass(String),
    ConsoleOutput(String),
    Running,
    BreakpointCleared {
        file: String,
        line: i64,
    },
    BreakpointMoved {
        file: String,
        line: i64,
        new_line: i64,
    },
    /// Full stack, innermost frame first.
    Break(Vec<StackFrameDescriptor>),
    EvalOut {
        tag: u64,
        value: String,
    },
    Unknown(String),
}

#[derive(EnumString, Clone, Copy)]
#[strum(serialize_all = "UPPERCASE")]
enum Verb {
    Pass,
    Cout,
    Running,
    BrkClr,
    BrkMov,
    Break,
    EvalOut,
}

pub const WRONG_PASSWORD: &str = "WrongPassword";

/// Engines answer either `WrongPassword` or `WrongPassword.`.
pub fn is_wrong_password(token: &str) -> bool {
    token.trim_end_matches(|c: char| c == '.' || c.is_whitespace()) == WRONG_PASSWORD
}

fn field<'a>(
    tokens: &[&'a str],
    idx: usize,
    verb: &'static str,
    name: &'static str,
) -> Result<&'a str, CodecError> {
    tokens
        .get(idx)
        .copied()
        .ok_or(CodecError::MissingField { verb, field: name })
}

fn number<T: FromStr>(value: &str, verb: &'static str, name: &'static str) -> Result<T, CodecError> {
    value.parse().map_err(|_| CodecError::InvalidNumber {
        verb,
        field: name,
        value: value.to_string(),
    })
}

impl RemoteEvent {
    /// Decode a single line, without its terminator.
    pub fn parse(line: &str) -> Result<RemoteEvent, CodecError> {
        let tokens = line.split(' ').collect_vec();
        let verb_str = tokens.first().copied().unwrap_or_default();
        if verb_str.is_empty() {
            return Err(CodecError::Empty);
        }
        let Ok(verb) = Verb::from_str(verb_str) else {
            return Ok(RemoteEvent::Unknown(line.to_string()));
        };

        let event = match verb {
            Verb::Pass => RemoteEvent::Pass(field(&tokens, 1, "PASS", "token")?.to_string()),
            Verb::Cout => RemoteEvent::ConsoleOutput(line.get(5..).unwrap_or_default().to_string()),
            Verb::Running => RemoteEvent::Running,
            Verb::BrkClr => RemoteEvent::BreakpointCleared {
                file: field(&tokens, 1, "BRKCLR", "file")?.to_string(),
                line: number(field(&tokens, 2, "BRKCLR", "line")?, "BRKCLR", "line")?,
            },
            Verb::BrkMov => RemoteEvent::BreakpointMoved {
                file: field(&tokens, 1, "BRKMOV", "file")?.to_string(),
                line: number(field(&tokens, 2, "BRKMOV", "line")?, "BRKMOV", "line")?,
                new_line: number(field(&tokens, 3, "BRKMOV", "new line")?, "BRKMOV", "new line")?,
            },
            Verb::Break => {
                // frames with a garbled line stay, EVAL addresses frames by index
                let frames = tokens
                    .iter()
                    .skip(1)
                    .tuples::<(_, _, _)>()
                    .map(|(file, line, function)| StackFrameDescriptor {
                        file: file.to_string(),
                        function: function.to_string(),
                        line: number(line, "BREAK", "line").unwrap_or_else(|e| {
                            warn!(target: "remote", "{e}");
                            0
                        }),
                    })
                    .collect();
                RemoteEvent::Break(frames)
            }
            Verb::EvalOut => RemoteEvent::EvalOut {
                tag: number(field(&tokens, 1, "EVALOUT", "tag")?, "EVALOUT", "tag")?,
                value: tokens.iter().skip(2).join(" "),
            },
        };
        Ok(event)
    }
}

/// Reassembles CRLF terminated lines from a byte stream.
#[derive(Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Next complete line without its terminator, `None` until a CRLF arrives.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.windows(2).position(|w| w == b"\r\n")?;
        let line = String::from_utf8_lossy(&self.buf[..pos]).into_owned();
        self.buf.drain(..pos + 2);
        Some(line)
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
