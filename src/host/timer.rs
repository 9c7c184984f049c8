/*!
 * Timer Task
 * Background task delivering periodic timer callbacks to the scheduling core
 */

use super::{Host, SchedCore};
use crate::core::limits::ticks_to_duration;
use log::{info, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Control messages for the timer task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Arm (or re-arm) the timer for a callback every N ticks; 0 disarms
    Arm(u32),
    /// Stop delivering callbacks
    Pause,
    /// Deliver callbacks again
    Resume,
    /// Deliver one callback immediately
    Fire,
    /// Stop the task
    Shutdown,
}

/// Handle to the timer background task
pub struct TimerTask {
    command_tx: mpsc::UnboundedSender<TimerCommand>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TimerTask {
    /// Spawn a timer task driving `core`, one tick lasting `tick`
    ///
    /// The task starts disarmed; the core arms it from `initialize()` once
    /// the host forwards `arm_timer` as [`TimerCommand::Arm`].
    pub fn spawn<H: Host + 'static>(core: Arc<SchedCore<H>>, tick: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            run_timer_loop(core, tick, command_rx).await;
        });

        info!("Timer task spawned with {:?} tick", tick);

        Self {
            command_tx,
            handle: Some(handle),
        }
    }

    /// Sender for forwarding host `arm_timer` calls
    pub fn sender(&self) -> mpsc::UnboundedSender<TimerCommand> {
        self.command_tx.clone()
    }

    pub fn arm(&self, interval_ticks: u32) {
        let _ = self.command_tx.send(TimerCommand::Arm(interval_ticks));
    }

    pub fn pause(&self) {
        let _ = self.command_tx.send(TimerCommand::Pause);
    }

    pub fn resume(&self) {
        let _ = self.command_tx.send(TimerCommand::Resume);
    }

    /// Deliver a timer callback now, outside the periodic schedule
    pub fn fire(&self) {
        let _ = self.command_tx.send(TimerCommand::Fire);
    }

    /// Shutdown the timer task gracefully
    pub async fn shutdown(mut self) {
        let _ = self.command_tx.send(TimerCommand::Shutdown);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Timer task shutdown error: {}", e);
            } else {
                info!("Timer task shutdown complete");
            }
        }
    }
}

fn periodic(period: Duration) -> Interval {
    // First callback one full period after arming
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn run_timer_loop<H: Host>(
    core: Arc<SchedCore<H>>,
    tick: Duration,
    mut command_rx: mpsc::UnboundedReceiver<TimerCommand>,
) {
    let mut armed: u32 = 0;
    let mut active = true;
    let mut interval = periodic(tick);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if active && armed > 0 {
                    trace!("Timer fired");
                    core.on_timer_tick();
                }
            }

            Some(cmd) = command_rx.recv() => {
                match cmd {
                    TimerCommand::Arm(ticks) if ticks == armed => {}

                    TimerCommand::Arm(0) => {
                        info!("Timer disarmed");
                        armed = 0;
                    }

                    TimerCommand::Arm(ticks) => {
                        let period = ticks_to_duration(tick, ticks);
                        info!("Timer armed: every {} tick(s) ({:?})", ticks, period);
                        armed = ticks;
                        interval = periodic(period);
                    }

                    TimerCommand::Pause => {
                        info!("Timer paused");
                        active = false;
                    }

                    TimerCommand::Resume => {
                        info!("Timer resumed");
                        active = true;
                    }

                    TimerCommand::Fire => {
                        trace!("Manual timer fire");
                        core.on_timer_tick();
                    }

                    TimerCommand::Shutdown => {
                        info!("Timer task shutting down");
                        break;
                    }
                }
            }

            else => break,
        }
    }
}

impl Drop for TimerTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.command_tx.send(TimerCommand::Shutdown);
        }
    }
}
