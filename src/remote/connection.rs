use crate::remote::codec::{is_wrong_password, LineBuffer, RemoteCommand, RemoteEvent};
use crate::remote::{CommandSink, Correlator, Error};
use log::{debug, info, warn};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Open the engine socket, trying every resolved address in turn.
pub fn connect(address: &str, port: u16, timeout: Duration) -> Result<TcpStream, Error> {
    let target = format!("{address}:{port}");
    let addrs = target
        .to_socket_addrs()
        .map_err(|_| Error::Resolve(target.clone()))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                info!(target: "remote", "connected to {addr}");
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(Error::Connect {
        addr: target,
        source: last_err.unwrap_or_else(|| ErrorKind::AddrNotAvailable.into()),
    })
}

/// Send the password line and wait for the `PASS` answer.
///
/// Returns whatever was received after the answer, it belongs to the
/// regular event stream.
pub fn authenticate(
    stream: &mut TcpStream,
    password: &str,
    timeout: Duration,
) -> Result<LineBuffer, Error> {
    stream.write_all(format!("{password}\n").as_bytes())?;
    stream.flush()?;

    let deadline = Instant::now() + timeout;
    let mut buffer = LineBuffer::default();
    let mut chunk = [0u8; 4096];
    loop {
        while let Some(line) = buffer.next_line() {
            match RemoteEvent::parse(&line) {
                Ok(RemoteEvent::Pass(token)) => {
                    stream.set_read_timeout(None)?;
                    if is_wrong_password(&token) {
                        return Err(Error::WrongPassword);
                    }
                    debug!(target: "remote", "authenticated: {token}");
                    return Ok(buffer);
                }
                _ => debug!(target: "remote", "ignored during handshake: {line}"),
            }
        }

        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(Error::HandshakeTimeout(timeout));
        }
        stream.set_read_timeout(Some(left))?;
        match stream.read(&mut chunk) {
            Ok(0) => return Err(Error::Closed),
            Ok(n) => buffer.push(&chunk[..n]),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(Error::HandshakeTimeout(timeout));
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
}

/// What the reader thread reports to the session. `EVALOUT` answers go to
/// the correlator directly.
#[derive(Debug)]
pub enum ReaderEvent {
    Event(RemoteEvent),
    /// A line the reader dealt with itself: an `EVALOUT` answer or a
    /// malformed line.
    Consumed,
    Closed,
    Failed(std::io::Error),
}

/// Read engine lines until the socket closes.
///
/// `on_event` returning `false` stops the thread, this happens once the
/// session that owns the callback is gone.
pub fn spawn_reader(
    mut stream: TcpStream,
    mut buffer: LineBuffer,
    correlator: Correlator,
    mut on_event: impl FnMut(ReaderEvent) -> bool + Send + 'static,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("engine-reader".to_string())
        .spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                while let Some(line) = buffer.next_line() {
                    debug!(target: "remote", "<- {line}");
                    let event = match RemoteEvent::parse(&line) {
                        Ok(RemoteEvent::EvalOut { tag, value }) => {
                            correlator.resolve(tag, value);
                            ReaderEvent::Consumed
                        }
                        Ok(event) => ReaderEvent::Event(event),
                        Err(e) => {
                            warn!(target: "remote", "malformed line `{line}`: {e}");
                            ReaderEvent::Consumed
                        }
                    };
                    if !on_event(event) {
                        return;
                    }
                }

                match stream.read(&mut chunk) {
                    Ok(0) => {
                        on_event(ReaderEvent::Closed);
                        return;
                    }
                    Ok(n) => buffer.push(&chunk[..n]),
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) => {
                        on_event(ReaderEvent::Failed(e));
                        return;
                    }
                }
            }
        })
}

/// Shared write half of the engine socket.
///
/// After [`RemoteWriter::shutdown`] every send fails with
/// [`Error::NotConnected`] instead of touching the socket.
#[derive(Clone, Default)]
pub struct RemoteWriter {
    stream: Arc<Mutex<Option<TcpStream>>>,
}

impl RemoteWriter {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: Arc::new(Mutex::new(Some(stream))),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Close both directions of the socket, the reader thread sees EOF.
    pub fn shutdown(&self) {
        let stream = self.stream.lock().ok().and_then(|mut s| s.take());
        if let Some(stream) = stream {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!(target: "remote", "shutdown: {e}");
            }
        }
    }
}

impl CommandSink for RemoteWriter {
    fn send(&self, cmd: &RemoteCommand) -> Result<(), Error> {
        let mut guard = self.stream.lock().map_err(|_| Error::NotConnected)?;
        let stream = guard.as_mut().ok_or(Error::NotConnected)?;
        debug!(target: "remote", "-> {cmd}");
        stream.write_all(cmd.encode().as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::remote::test_util::RecordingSink;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::sync::mpsc::{self, Receiver};

    /// Connected loopback sockets: adapter side, engine side.
    fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let adapter = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (engine, _) = listener.accept().unwrap();
        (adapter, engine)
    }

    fn describe(event: ReaderEvent) -> String {
        match event {
            ReaderEvent::Event(e) => format!("{e:?}"),
            ReaderEvent::Consumed => "consumed".to_string(),
            ReaderEvent::Closed => "closed".to_string(),
            ReaderEvent::Failed(e) => format!("failed: {e}"),
        }
    }

    fn spawn_collector(stream: TcpStream, buffer: LineBuffer, correlator: Correlator) -> Receiver<String> {
        let (tx, rx) = mpsc::channel();
        spawn_reader(stream, buffer, correlator, move |event| {
            tx.send(describe(event)).is_ok()
        })
        .unwrap();
        rx
    }

    /// Everything the reader reported up to and including `closed`.
    fn drain(events: Receiver<String>) -> Vec<String> {
        let mut seen = vec![];
        while let Ok(event) = events.recv_timeout(Duration::from_secs(5)) {
            let closed = event == "closed";
            seen.push(event);
            if closed {
                break;
            }
        }
        seen
    }

    #[test]
    fn test_reader_matches_interleaved_answers() {
        let (adapter, mut engine) = socket_pair();
        let sink = RecordingSink::default();
        let correlator = Correlator::new(Duration::from_secs(5));
        let first = correlator.evaluate(&sink, 0, "%a");
        let second = correlator.evaluate(&sink, 0, "%b");
        let events = spawn_collector(adapter, LineBuffer::default(), correlator.clone());

        engine.write_all(b"EVALOUT 1 bee\r\nCOUT mid\r\nEVAL").unwrap();
        engine.flush().unwrap();
        thread::sleep(Duration::from_millis(50));
        engine.write_all(b"OUT 0 ay ay\r\nRUNNING\r\n").unwrap();

        assert_eq!(first.wait().as_deref(), Some("ay ay"));
        assert_eq!(second.wait().as_deref(), Some("bee"));
        assert_eq!(correlator.pending_count(), 0);

        engine.shutdown(Shutdown::Both).unwrap();
        assert_eq!(
            drain(events),
            vec!["consumed", "ConsoleOutput(\"mid\")", "consumed", "Running", "closed"]
        );
    }

    #[test]
    fn test_reader_reports_malformed_lines() {
        let (adapter, mut engine) = socket_pair();
        let events = spawn_collector(adapter, LineBuffer::default(), Correlator::default());

        engine.write_all(b"BRKCLR a.cs\r\nEVALOUT 7 late\r\n").unwrap();
        engine.shutdown(Shutdown::Both).unwrap();
        assert_eq!(drain(events), vec!["consumed", "consumed", "closed"]);
    }

    #[test]
    fn test_handshake_failures() {
        struct TestCase {
            name: &'static str,
            reply: &'static [u8],
            close: bool,
            check: fn(&Error) -> bool,
        }
        let cases = [
            TestCase {
                name: "silent engine",
                reply: b"",
                close: false,
                check: |e| matches!(e, Error::HandshakeTimeout(_)),
            },
            TestCase {
                name: "noise without PASS",
                reply: b"COUT loading\r\nRUNNING\r\n",
                close: false,
                check: |e| matches!(e, Error::HandshakeTimeout(_)),
            },
            TestCase {
                name: "early close",
                reply: b"",
                close: true,
                check: |e| matches!(e, Error::Closed),
            },
            TestCase {
                name: "close mid line",
                reply: b"PASS Conn",
                close: true,
                check: |e| matches!(e, Error::Closed),
            },
            TestCase {
                name: "wrong password",
                reply: b"PASS WrongPassword.\r\n",
                close: false,
                check: |e| matches!(e, Error::WrongPassword),
            },
        ];

        for case in cases {
            let (mut adapter, mut engine) = socket_pair();
            engine.write_all(case.reply).unwrap();
            if case.close {
                engine.shutdown(Shutdown::Write).unwrap();
            }

            let err = match authenticate(&mut adapter, "secret", Duration::from_millis(200)) {
                Ok(_) => panic!("{}: handshake passed", case.name),
                Err(e) => e,
            };
            assert!((case.check)(&err), "{}: {err}", case.name);
            drop(engine);
        }
    }

    #[test]
    fn test_handshake_leftover_goes_to_reader() {
        let (mut adapter, mut engine) = socket_pair();
        engine
            .write_all(b"COUT banner\r\nPASS Connected.\r\nCOUT after\r\nRUN")
            .unwrap();

        let leftover = authenticate(&mut adapter, "secret", Duration::from_secs(5)).unwrap();
        let mut password = String::new();
        BufReader::new(&engine).read_line(&mut password).unwrap();
        assert_eq!(password, "secret\n");

        let events = spawn_collector(adapter, leftover, Correlator::default());
        engine.write_all(b"NING\r\n").unwrap();
        engine.shutdown(Shutdown::Both).unwrap();
        assert_eq!(
            drain(events),
            vec!["ConsoleOutput(\"after\")", "Running", "closed"]
        );
    }
}
