//! Content-Length framing of DAP messages.

use crate::dap::protocol::{DapEvent, DapRequest, DapResponse};
use crate::dap::tracer::Tracer;
use anyhow::anyhow;
use serde::Serialize;
use serde_json::Value;
use std::io::{BufRead, BufReader, Read, Write};

pub struct DapReader<R> {
    reader: BufReader<R>,
    tracer: Option<Tracer>,
}

impl<R: Read> DapReader<R> {
    pub fn new(reader: R, tracer: Option<Tracer>) -> Self {
        Self {
            reader: BufReader::new(reader),
            tracer,
        }
    }

    /// Read the next message, `None` when the stream ends between messages.
    pub fn read_message(&mut self) -> anyhow::Result<Option<Value>> {
        let mut content_length: Option<usize> = None;
        let mut header_seen = false;
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                if header_seen {
                    return Err(anyhow!("DAP connection closed inside a message header"));
                }
                return Ok(None);
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if header_seen {
                    break;
                }
                continue;
            }
            header_seen = true;
            if let Some(v) = line.strip_prefix("Content-Length:") {
                content_length = Some(v.trim().parse()?);
            }
        }

        let len = content_length.ok_or_else(|| anyhow!("Missing Content-Length header"))?;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        let msg: Value = serde_json::from_slice(&buf)?;
        if let Some(tracer) = &self.tracer {
            tracer.incoming(&msg);
        }
        Ok(Some(msg))
    }
}

/// Write half, owns the sequence counter of outgoing messages.
pub struct DapWriter<W> {
    writer: W,
    seq: i64,
    tracer: Option<Tracer>,
}

impl<W: Write> DapWriter<W> {
    pub fn new(writer: W, tracer: Option<Tracer>) -> Self {
        Self {
            writer,
            seq: 1,
            tracer,
        }
    }

    fn next_seq(&mut self) -> i64 {
        let s = self.seq;
        self.seq += 1;
        s
    }

    pub fn respond(
        &mut self,
        req: &DapRequest,
        success: bool,
        message: Option<String>,
        body: Option<Value>,
    ) -> anyhow::Result<()> {
        let rsp = DapResponse {
            seq: self.next_seq(),
            r#type: "response",
            request_seq: req.seq,
            success,
            command: req.command.clone(),
            message,
            body,
        };
        self.write_message(&rsp)
    }

    pub fn event(&mut self, name: &'static str, body: Option<Value>) -> anyhow::Result<()> {
        let ev = DapEvent {
            seq: self.next_seq(),
            r#type: "event",
            event: name,
            body,
        };
        self.write_message(&ev)
    }

    fn write_message<T: Serialize>(&mut self, v: &T) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(v)?;
        if let Some(tracer) = &self.tracer {
            tracer.outgoing(v);
        }
        write!(self.writer, "Content-Length: {}\r\n\r\n", payload.len())?;
        self.writer.write_all(&payload)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn frame(msg: &Value) -> String {
        let payload = msg.to_string();
        format!("Content-Length: {}\r\n\r\n{payload}", payload.len())
    }

    #[test]
    fn test_read_messages() {
        let first = json!({"seq": 1, "type": "request", "command": "initialize"});
        let second = json!({"seq": 2, "type": "request", "command": "threads", "arguments": {"x": "é"}});
        let input = format!("{}{}", frame(&first), frame(&second));

        let mut reader = DapReader::new(Cursor::new(input), None);
        assert_eq!(reader.read_message().unwrap(), Some(first));
        assert_eq!(reader.read_message().unwrap(), Some(second));
        assert_eq!(reader.read_message().unwrap(), None);
    }

    #[test]
    fn test_read_malformed() {
        let mut reader = DapReader::new(Cursor::new("Content-Type: json\r\n\r\n{}"), None);
        assert!(reader.read_message().is_err());

        let mut reader = DapReader::new(Cursor::new("Content-Length: 10\r\n"), None);
        assert!(reader.read_message().is_err());

        let mut reader = DapReader::new(Cursor::new("Content-Length: 2\r\n\r\n{"), None);
        assert!(reader.read_message().is_err());
    }

    #[test]
    fn test_write_sequence() {
        let req: DapRequest =
            serde_json::from_value(json!({"seq": 7, "type": "request", "command": "next"})).unwrap();

        let mut out = Vec::new();
        let mut writer = DapWriter::new(&mut out, None);
        writer.respond(&req, true, None, None).unwrap();
        writer
            .event("stopped", Some(json!({"reason": "step"})))
            .unwrap();
        drop(writer);

        let mut reader = DapReader::new(Cursor::new(out), None);
        let rsp = reader.read_message().unwrap().unwrap();
        assert_eq!(
            rsp,
            json!({"seq": 1, "type": "response", "request_seq": 7, "success": true, "command": "next"})
        );
        let ev = reader.read_message().unwrap().unwrap();
        assert_eq!(ev["seq"], 2);
        assert_eq!(ev["event"], "stopped");
        assert_eq!(ev["body"]["reason"], "step");
    }
}
