//! torque-dap: Debug Adapter Protocol server for the TorqueScript engine.
//!
//! By default one session is served over stdin/stdout. With `--listen` the
//! adapter accepts TCP clients one after another, one client is one session.

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use torque_dap::args::Args;
use torque_dap::dap::Tracer;
use torque_dap::session::{self, SessionConfig};

fn serve_client(stream: TcpStream, config: SessionConfig, tracer: Option<Tracer>) -> anyhow::Result<()> {
    stream.set_nodelay(true)?;
    let reader = stream.try_clone().context("clone client stream")?;
    let result = session::serve(reader, &stream, config, tracer);
    // unblocks the reader thread of the finished session
    let _ = stream.shutdown(Shutdown::Both);
    result
}

fn main() -> anyhow::Result<()> {
    torque_dap::log::init();
    let args = Args::parse();

    let tracer = match &args.log_file {
        Some(path) => Some(Tracer::open(path, args.trace_dap)?),
        None => None,
    };
    if args.trace_dap && tracer.is_none() {
        warn!(target: "dap", "--trace-dap requires --log-file; tracing disabled");
    }
    let config = args.session_config();

    let Some(listen) = &args.listen else {
        info!(target: "dap", "serving DAP on stdio");
        return session::serve(std::io::stdin(), std::io::stdout(), config, tracer);
    };

    let addr: SocketAddr = listen.parse().context("Invalid listen address")?;
    let listener = TcpListener::bind(addr).with_context(|| format!("bind {addr}"))?;
    info!(target: "dap", "torque-dap listening on {addr}");

    loop {
        let (stream, peer) = match listener.accept() {
            Ok(v) => v,
            Err(err) => {
                warn!(target: "dap", "accept failed: {err:#}");
                continue;
            }
        };
        info!(target: "dap", "DAP client connected: {peer}");
        if let Some(t) = &tracer {
            t.note(&format!("client connected: {peer}"));
        }

        let res = serve_client(stream, config.clone(), tracer.clone());
        if let Err(err) = res {
            warn!(target: "dap", "session ended with error: {err:#}");
            if let Some(t) = &tracer {
                t.note(&format!("session error: {err:#}"));
            }
        } else if let Some(t) = &tracer {
            t.note("session finished OK");
        }

        if args.oneshot {
            break;
        }
    }
    Ok(())
}
