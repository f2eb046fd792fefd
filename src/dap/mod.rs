//! Frontend side of the adapter: DAP envelopes, argument types and framing.

mod io;
pub mod protocol;
mod tracer;

pub use io::{DapReader, DapWriter};
pub use protocol::{DapRequest, EvaluateContext, LaunchArguments};
pub use tracer::Tracer;
