//! Debug Adapter Protocol bridge for the TorqueScript remote debugger.
//!
//! The adapter speaks DAP with the IDE and the line based telnet debugger
//! protocol with a running engine. Variable names come from a light static
//! analysis of the script sources, since the engine cannot enumerate them.

pub mod args;
pub mod breakpoint;
pub mod dap;
pub mod log;
pub mod remote;
pub mod scope;
pub mod script;
pub mod session;
