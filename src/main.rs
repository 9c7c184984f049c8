/*!
 * Proportional-Share Kernel - Demonstration Entry Point
 *
 * Runs a simulated host for a fixed number of timer ticks:
 * - Three processes (40% and 20% reservations, one unreserved)
 * - Timer-driven scheduling decisions
 * - Each decision dispatched to the process's fiber
 */

use propshare_kernel::{
    init_tracing, ContextSwitcher, Fiber, Handoff, KernelConfig, KernelError, MachineContext,
    Pid, SchedCore, SimulatedHost, TimerTask, HOST_PID,
};
use std::sync::Arc;
use tracing::{info, warn};

/// (pid, requested CPU percent); 0 leaves the process unreserved
const DEMO_PROCESSES: [(Pid, i32); 3] = [(1, 40), (2, 20), (3, 0)];

const DEMO_STACK_SIZE: usize = 4096;

/// Body of a demonstration process: one unit of work per dispatch
fn run_process(fiber: &mut Fiber<MachineContext>) -> Option<Pid> {
    loop {
        let ctx = fiber.state_mut();
        ctx.regs[0] += 1;
        ctx.pc += 4;

        if fiber.switch_to(HOST_PID).is_err() {
            return None;
        }
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let config = KernelConfig::from_env()?;
    init_tracing(config.trace_json);

    info!("Kernel starting...");
    info!(
        policy = %config.policy,
        max_procs = config.max_procs,
        tick_ms = config.tick_ms,
        run_ticks = config.run_ticks,
        "Configuration loaded"
    );

    let host = Arc::new(SimulatedHost::new());
    let core = Arc::new(SchedCore::new(Arc::clone(&host), config.clone()));
    let timer = TimerTask::spawn(Arc::clone(&core), config.tick());
    host.attach_timer(timer.sender());
    core.initialize();

    let switcher: Arc<ContextSwitcher> = Arc::new(ContextSwitcher::new(config.max_procs));
    for (pid, rate) in DEMO_PROCESSES {
        let entry = 0x1000 * u64::from(pid);
        switcher.register_initial_state(pid, &MachineContext::new(entry, DEMO_STACK_SIZE))?;
        switcher.launch(pid, run_process)?;

        if !core.start(pid) {
            warn!(pid, "Process not admitted");
            continue;
        }
        if rate > 0 && !core.request_rate(pid, rate) {
            warn!(pid, rate, "Reservation rejected, running unreserved");
        }
    }

    info!("Kernel entering main loop...");
    let mut dispatched: u64 = 0;

    while core.stats().map_or(0, |s| s.ticks) < config.run_ticks {
        tokio::select! {
            _ = host.decision_requested() => {}
            _ = tokio::time::sleep(config.tick()) => {}
        }
        if host.take_decisions() == 0 {
            continue;
        }
        let Some(pid) = core.schedule() else {
            continue;
        };

        let handoff = tokio::task::block_in_place(|| switcher.resume(pid))?;
        if let Handoff::Finished { pid } = handoff {
            warn!(pid, "Process finished unexpectedly");
            core.end(pid);
        }
        dispatched += 1;
    }

    timer.shutdown().await;

    info!(dispatched, "Run complete");
    println!("{:<6} {:>9} {:>8} {:>7}", "pid", "requested", "units", "share");
    for (pid, rate) in DEMO_PROCESSES {
        let units = switcher.saved_state(pid).map_or(0, |ctx| ctx.regs[0]);
        let share = if dispatched == 0 {
            0.0
        } else {
            units as f64 * 100.0 / dispatched as f64
        };
        let requested = if rate > 0 {
            format!("{}%", rate)
        } else {
            "-".to_string()
        };
        println!("{:<6} {:>9} {:>8} {:>6.1}%", pid, requested, units, share);
        core.end(pid);
    }

    if let Some(stats) = core.stats() {
        let json = serde_json::to_string_pretty(&stats).map_err(KernelError::from)?;
        println!("{}", json);
    }

    if let Ok(switcher) = Arc::try_unwrap(switcher) {
        tokio::task::block_in_place(|| switcher.shutdown());
    }
    info!("Kernel shut down");
    Ok(())
}
