use anyhow::Context;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Append-only file with adapter diagnostics and, optionally, the raw DAP traffic.
#[derive(Clone)]
pub struct Tracer {
    file: Arc<Mutex<File>>,
    traffic: bool,
}

impl Tracer {
    pub fn open(path: &Path, traffic: bool) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            traffic,
        })
    }

    pub fn note(&self, text: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{text}");
        }
    }

    pub fn incoming<T: Serialize>(&self, message: &T) {
        self.message("<-", message);
    }

    pub fn outgoing<T: Serialize>(&self, message: &T) {
        self.message("->", message);
    }

    fn message<T: Serialize>(&self, direction: &str, message: &T) {
        if !self.traffic {
            return;
        }
        if let Ok(line) = serde_json::to_string(message) {
            self.note(&format!("{direction} {line}"));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trace_file() {
        let path = std::env::temp_dir().join(format!("torque-dap-tracer-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let tracer = Tracer::open(&path, true).unwrap();
        tracer.note("client connected");
        tracer.incoming(&json!({"seq": 1}));
        tracer.clone().outgoing(&json!({"seq": 2}));
        let quiet = Tracer::open(&path, false).unwrap();
        quiet.outgoing(&json!({"seq": 3}));

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["client connected", r#"<- {"seq":1}"#, r#"-> {"seq":2}"#]
        );
        std::fs::remove_file(&path).unwrap();
    }
}
