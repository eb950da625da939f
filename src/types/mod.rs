//! Core type definitions.
//!
//! Newtypes and validated types shared by the engine and the CLI shell.

mod job_id;
mod port;
mod target;

pub use job_id::JobId;
pub use port::{PortError, PortRange};
pub use target::{CidrPolicy, TargetError, TargetHost, TargetSpec};
