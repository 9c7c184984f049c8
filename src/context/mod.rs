/*!
 * Context Switching
 * Saved execution contexts and cooperative hand-off between processes
 *
 * Every registered process owns a deep copy of its initial snapshot. A
 * launched process runs as a fiber: an OS thread that blocks until it is
 * handed the baton, so exactly one fiber (or the host) executes at a time.
 */

mod fiber;
mod machine;

pub use fiber::Fiber;
pub use machine::{MachineContext, GP_REGISTERS};

use crate::core::errors::ContextError;
use crate::core::limits::{FIBER_STACK_SIZE, HOST_PID, MAX_PROCS};
use crate::core::types::Pid;
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Message resuming a suspended fiber
#[derive(Debug, Clone, Copy)]
pub(crate) enum Baton {
    Resume { from: Pid },
    Shutdown,
}

/// How control came back to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Handoff {
    /// A fiber switched to `HOST_PID`
    Yielded { from: Pid },
    /// A fiber's body returned without handing off
    Finished { pid: Pid },
}

struct ContextSlot<S> {
    pid: Pid,
    saved: S,
    baton: flume::Sender<Baton>,
    inbox: Option<flume::Receiver<Baton>>,
    thread: Option<JoinHandle<()>>,
    finished: bool,
}

pub(crate) struct Shared<S> {
    slots: Mutex<Box<[Option<ContextSlot<S>>]>>,
    host_tx: flume::Sender<Handoff>,
    terminated: AtomicBool,
}

impl<S> Shared<S> {
    fn with_slot<T, F>(&self, pid: Pid, f: F) -> Result<T, ContextError>
    where
        F: FnOnce(&mut ContextSlot<S>) -> Result<T, ContextError>,
    {
        let mut slots = self.slots.lock();
        let slot = slots
            .iter_mut()
            .flatten()
            .find(|s| s.pid == pid)
            .ok_or(ContextError::UnknownProcess(pid))?;
        f(slot)
    }

    pub(crate) fn pass_baton(&self, target: Pid, from: Pid) -> Result<(), ContextError> {
        if self.is_terminated() {
            return Err(ContextError::Terminated);
        }
        self.with_slot(target, |slot| {
            if slot.finished {
                return Err(ContextError::FiberGone(target));
            }
            if slot.inbox.is_some() {
                return Err(ContextError::NotLaunched(target));
            }
            slot.baton
                .send(Baton::Resume { from })
                .map_err(|_| ContextError::FiberGone(target))
        })
    }

    /// Fails with `UnknownProcess` once the context was released
    pub(crate) fn mark_finished(&self, pid: Pid) -> Result<(), ContextError> {
        self.with_slot(pid, |slot| {
            slot.finished = true;
            Ok(())
        })
    }

    pub(crate) fn to_host(&self, handoff: Handoff) -> Result<(), ContextError> {
        self.host_tx
            .send(handoff)
            .map_err(|_| ContextError::Terminated)
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

impl<S: Clone> Shared<S> {
    pub(crate) fn save(&self, pid: Pid, state: &S) -> Result<(), ContextError> {
        self.with_slot(pid, |slot| {
            slot.saved = state.clone();
            Ok(())
        })
    }

    pub(crate) fn restore(&self, pid: Pid) -> Result<S, ContextError> {
        self.with_slot(pid, |slot| Ok(slot.saved.clone()))
    }
}

/// Table of saved contexts plus the fibers running them
pub struct ContextSwitcher<S = MachineContext>
where
    S: Clone + Send + 'static,
{
    shared: Arc<Shared<S>>,
    host_rx: flume::Receiver<Handoff>,
    capacity: usize,
}

impl<S: Clone + Send + 'static> ContextSwitcher<S> {
    pub fn new(capacity: usize) -> Self {
        let (host_tx, host_rx) = flume::unbounded();
        let slots = (0..capacity).map(|_| None).collect::<Vec<_>>();

        Self {
            shared: Arc::new(Shared {
                slots: Mutex::new(slots.into_boxed_slice()),
                host_tx,
                terminated: AtomicBool::new(false),
            }),
            host_rx,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of registered contexts
    pub fn len(&self) -> usize {
        self.shared.slots.lock().iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a private copy of the initial snapshot for `pid`
    ///
    /// The caller's snapshot may be reused or freed as soon as this returns.
    /// Pid 0 is reserved for the host.
    pub fn register_initial_state(&self, pid: Pid, snapshot: &S) -> Result<(), ContextError> {
        if pid == HOST_PID {
            return Err(ContextError::AlreadyRegistered(pid));
        }

        let mut slots = self.shared.slots.lock();
        if slots.iter().flatten().any(|s| s.pid == pid) {
            return Err(ContextError::AlreadyRegistered(pid));
        }
        let free = slots
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(ContextError::TableFull {
                capacity: self.capacity,
            })?;

        let (baton, inbox) = flume::unbounded();
        *free = Some(ContextSlot {
            pid,
            saved: snapshot.clone(),
            baton,
            inbox: Some(inbox),
            thread: None,
            finished: false,
        });

        debug!("Registered initial context for process {}", pid);
        Ok(())
    }

    /// Start the fiber of `pid`; it stays suspended until first switched to
    ///
    /// When `body` returns `Some(next)` the baton passes to `next`; on `None`
    /// the host is told the fiber finished.
    pub fn launch<F>(&self, pid: Pid, body: F) -> Result<(), ContextError>
    where
        F: FnOnce(&mut Fiber<S>) -> Option<Pid> + Send + 'static,
    {
        let inbox = self.shared.with_slot(pid, |slot| {
            slot.inbox.take().ok_or(ContextError::AlreadyLaunched(pid))
        })?;

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name(format!("fiber-{}", pid))
            .stack_size(FIBER_STACK_SIZE)
            .spawn(move || fiber::run(shared, pid, inbox, body))
            .map_err(|e| ContextError::SpawnFailed(e.to_string()))?;

        self.shared.with_slot(pid, |slot| {
            slot.thread = Some(handle);
            Ok(())
        })?;

        info!("Launched fiber for process {}", pid);
        Ok(())
    }

    /// Hand the baton from the host to `pid` and wait for it to come back
    pub fn resume(&self, pid: Pid) -> Result<Handoff, ContextError> {
        self.shared.pass_baton(pid, HOST_PID)?;
        self.host_rx.recv().map_err(|_| ContextError::Terminated)
    }

    /// Copy of the context last saved for `pid`
    pub fn saved_state(&self, pid: Pid) -> Option<S> {
        self.shared.restore(pid).ok()
    }

    pub fn is_finished(&self, pid: Pid) -> bool {
        self.shared
            .with_slot(pid, |slot| Ok(slot.finished))
            .unwrap_or(false)
    }

    /// Forget the context of `pid`, stopping its fiber if still suspended
    pub fn release(&self, pid: Pid) -> Result<(), ContextError> {
        let mut slots = self.shared.slots.lock();
        let entry = slots
            .iter_mut()
            .find(|s| s.as_ref().is_some_and(|s| s.pid == pid))
            .ok_or(ContextError::UnknownProcess(pid))?;

        if let Some(slot) = entry.take() {
            if !slot.finished {
                let _ = slot.baton.send(Baton::Shutdown);
            }
        }
        debug!("Released context of process {}", pid);
        Ok(())
    }

    /// Stop every suspended fiber and wait for their threads
    pub fn shutdown(self) {
        for handle in self.terminate() {
            let _ = handle.join();
        }
        info!("Context switcher shut down");
    }

    fn terminate(&self) -> Vec<JoinHandle<()>> {
        self.shared.terminated.store(true, Ordering::Release);

        let mut slots = self.shared.slots.lock();
        slots
            .iter_mut()
            .flatten()
            .filter_map(|slot| {
                if !slot.finished {
                    let _ = slot.baton.send(Baton::Shutdown);
                }
                slot.thread.take()
            })
            .collect()
    }
}

impl<S: Clone + Send + 'static> Default for ContextSwitcher<S> {
    fn default() -> Self {
        Self::new(MAX_PROCS)
    }
}

impl<S: Clone + Send + 'static> Drop for ContextSwitcher<S> {
    fn drop(&mut self) {
        // Fibers are signalled, not joined
        let _ = self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_copies_snapshot() {
        let switcher: ContextSwitcher = ContextSwitcher::new(2);
        let mut snapshot = MachineContext::new(0x1000, 32);
        switcher.register_initial_state(1, &snapshot).unwrap();

        snapshot.pc = 0xdead;
        snapshot.stack.clear();

        let saved = switcher.saved_state(1).unwrap();
        assert_eq!(saved.pc, 0x1000);
        assert_eq!(saved.stack.len(), 32);
    }

    #[test]
    fn test_register_errors() {
        let switcher: ContextSwitcher<u64> = ContextSwitcher::new(1);
        assert_eq!(
            switcher.register_initial_state(HOST_PID, &0),
            Err(ContextError::AlreadyRegistered(HOST_PID))
        );
        switcher.register_initial_state(1, &0).unwrap();
        assert_eq!(
            switcher.register_initial_state(1, &0),
            Err(ContextError::AlreadyRegistered(1))
        );
        assert_eq!(
            switcher.register_initial_state(2, &0),
            Err(ContextError::TableFull { capacity: 1 })
        );

        switcher.release(1).unwrap();
        assert!(switcher.is_empty());
        switcher.register_initial_state(2, &0).unwrap();
    }

    #[test]
    fn test_resume_and_finish() {
        let switcher: ContextSwitcher<u64> = ContextSwitcher::new(2);
        switcher.register_initial_state(1, &5).unwrap();
        switcher
            .launch(1, |fiber| {
                *fiber.state_mut() += fiber.resumed_by() as u64 + 1;
                None
            })
            .unwrap();

        assert_eq!(switcher.resume(1), Ok(Handoff::Finished { pid: 1 }));
        assert!(switcher.is_finished(1));
        assert_eq!(switcher.saved_state(1), Some(6));
        assert_eq!(switcher.resume(1), Err(ContextError::FiberGone(1)));
    }

    #[test]
    fn test_launch_twice() {
        let switcher: ContextSwitcher<u64> = ContextSwitcher::new(2);
        switcher.register_initial_state(1, &0).unwrap();
        switcher.launch(1, |_| None).unwrap();
        assert_eq!(
            switcher.launch(1, |_| None),
            Err(ContextError::AlreadyLaunched(1))
        );
        assert_eq!(
            switcher.launch(9, |_| None),
            Err(ContextError::UnknownProcess(9))
        );
        switcher.shutdown();
    }
}
