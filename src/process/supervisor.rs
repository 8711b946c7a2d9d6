//! Process supervisor interface.
//!
//! The crate never runs a daemon itself. A [`ProcessSupervisor`] provided by
//! the emulation layer starts, probes and stops them; [`launch`] and
//! [`shutdown`] drive it through a [`Plan`] so that every started daemon is
//! stopped again, whether the launch succeeds or not.

use super::types::{DaemonSpec, Plan};
use log::{info, warn};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to start {daemon}: {reason}")]
    Start { daemon: String, reason: String },

    #[error("{daemon} did not become ready within {timeout:?}")]
    NotReady { daemon: String, timeout: Duration },

    #[error("failed to stop {daemon}: {reason}")]
    Stop { daemon: String, reason: String },
}

/// Runs daemons on behalf of the emulation layer
pub trait ProcessSupervisor {
    fn start(&mut self, daemon: &DaemonSpec) -> Result<(), SupervisorError>;

    /// Block until `daemon` accepts work or `timeout` expires
    fn wait_ready(&mut self, daemon: &DaemonSpec, timeout: Duration) -> Result<(), SupervisorError>;

    fn stop(&mut self, daemon: &DaemonSpec) -> Result<(), SupervisorError>;
}

fn stop_in_reverse<'a, S, I>(supervisor: &mut S, daemons: I) -> Result<(), SupervisorError>
where
    S: ProcessSupervisor + ?Sized,
    I: DoubleEndedIterator<Item = &'a DaemonSpec>,
{
    let mut first_error = None;
    for daemon in daemons.rev() {
        if let Err(e) = supervisor.stop(daemon) {
            warn!("{}", e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Start every daemon of `plan` in plan order
///
/// Each daemon must be ready before the next one starts. When a daemon
/// fails to start or to become ready, the daemons already started are
/// stopped in reverse order and the original error is returned.
pub fn launch<S: ProcessSupervisor + ?Sized>(plan: &Plan, supervisor: &mut S) -> Result<(), SupervisorError> {
    let mut started: Vec<&DaemonSpec> = Vec::new();
    for daemon in plan.daemons() {
        let result = supervisor.start(daemon).and_then(|()| {
            started.push(daemon);
            supervisor.wait_ready(daemon, plan.ready_timeout)
        });

        if let Err(e) = result {
            warn!("{}, stopping {} started daemon(s)", e, started.len());
            let _ = stop_in_reverse(supervisor, started.into_iter());
            return Err(e);
        }
    }

    info!("Started {} daemon(s)", started.len());
    Ok(())
}

/// Stop every daemon of `plan` in reverse plan order
///
/// Keeps going past failures and returns the first one.
pub fn shutdown<S: ProcessSupervisor + ?Sized>(plan: &Plan, supervisor: &mut S) -> Result<(), SupervisorError> {
    stop_in_reverse(supervisor, plan.daemons())
}
