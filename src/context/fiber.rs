/*!
 * Fibers
 * One OS thread per process, running only while it holds the baton
 */

use super::{Baton, Handoff, Shared};
use crate::core::errors::ContextError;
use crate::core::limits::HOST_PID;
use crate::core::types::Pid;
use log::{trace, warn};
use std::sync::Arc;

/// Execution handle given to a process body
///
/// `state` is the live copy of the process's registers and stack; it is
/// written back to the context table on every switch away.
pub struct Fiber<S> {
    pid: Pid,
    state: S,
    resumed_by: Pid,
    inbox: flume::Receiver<Baton>,
    shared: Arc<Shared<S>>,
}

impl<S: Clone + Send + 'static> Fiber<S> {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Pid that most recently handed this fiber the baton
    pub fn resumed_by(&self) -> Pid {
        self.resumed_by
    }

    /// Suspend this process and resume `target`
    ///
    /// Returns once some other process (or the host, reported as
    /// `HOST_PID`) switches back here, yielding the pid of that process.
    /// Switching to oneself returns immediately.
    pub fn switch_to(&mut self, target: Pid) -> Result<Pid, ContextError> {
        if target == self.pid {
            return Ok(self.pid);
        }

        self.shared.save(self.pid, &self.state)?;
        if target == HOST_PID {
            self.shared.to_host(Handoff::Yielded { from: self.pid })?;
        } else {
            self.shared.pass_baton(target, self.pid)?;
        }
        trace!("Fiber {} switched to {}", self.pid, target);

        match self.inbox.recv() {
            Ok(Baton::Resume { from }) => {
                self.state = self.shared.restore(self.pid)?;
                self.resumed_by = from;
                Ok(from)
            }
            Ok(Baton::Shutdown) | Err(_) => Err(ContextError::Terminated),
        }
    }
}

/// Reports completion to the host if the body unwinds
struct CompletionGuard<S> {
    pid: Pid,
    shared: Arc<Shared<S>>,
    armed: bool,
}

impl<S> Drop for CompletionGuard<S> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Fiber {} terminated abnormally", self.pid);
            if self.shared.mark_finished(self.pid).is_ok() {
                let _ = self.shared.to_host(Handoff::Finished { pid: self.pid });
            }
        }
    }
}

/// Thread body of a launched fiber
pub(super) fn run<S, F>(shared: Arc<Shared<S>>, pid: Pid, inbox: flume::Receiver<Baton>, body: F)
where
    S: Clone + Send + 'static,
    F: FnOnce(&mut Fiber<S>) -> Option<Pid>,
{
    let from = match inbox.recv() {
        Ok(Baton::Resume { from }) => from,
        Ok(Baton::Shutdown) | Err(_) => return,
    };
    let Ok(state) = shared.restore(pid) else {
        return;
    };

    let mut guard = CompletionGuard {
        pid,
        shared: Arc::clone(&shared),
        armed: true,
    };

    let mut fiber = Fiber {
        pid,
        state,
        resumed_by: from,
        inbox,
        shared: Arc::clone(&shared),
    };
    let next = body(&mut fiber);

    // A released context no longer owns the baton; the host must not hear from it
    let released =
        shared.save(pid, &fiber.state).is_err() || shared.mark_finished(pid).is_err();
    guard.armed = false;

    if released || shared.is_terminated() {
        trace!("Fiber {} exited after release", pid);
        return;
    }

    let handed_off = match next {
        Some(target) if target != HOST_PID && target != pid => {
            match shared.pass_baton(target, pid) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Fiber {} could not hand off to {}: {}", pid, target, e);
                    false
                }
            }
        }
        _ => false,
    };

    if !handed_off {
        let _ = shared.to_host(Handoff::Finished { pid });
    }
    trace!("Fiber {} finished", pid);
}
