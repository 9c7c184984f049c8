/*!
 * Context Switching Tests
 * Fiber hand-off, snapshot isolation and host resumption
 */

use pretty_assertions::assert_eq;
use propshare_kernel::{ContextError, ContextSwitcher, Handoff, MachineContext, HOST_PID};

#[test]
fn test_ping_pong_between_fibers() {
    let switcher: ContextSwitcher = ContextSwitcher::new(4);
    switcher
        .register_initial_state(1, &MachineContext::new(0x1000, 64))
        .unwrap();
    switcher
        .register_initial_state(2, &MachineContext::new(0x2000, 64))
        .unwrap();

    let (log_tx, log_rx) = flume::unbounded();
    let log1 = log_tx.clone();
    switcher
        .launch(1, move |fiber| {
            log1.send((1, fiber.resumed_by())).unwrap();
            fiber.state_mut().regs[0] = 11;

            let by = fiber.switch_to(2).unwrap();
            log1.send((1, by)).unwrap();
            log1.send((1, fiber.state().regs[0] as u32)).unwrap();
            None
        })
        .unwrap();
    switcher
        .launch(2, move |fiber| {
            log_tx.send((2, fiber.resumed_by())).unwrap();
            Some(1)
        })
        .unwrap();

    assert_eq!(switcher.resume(1), Ok(Handoff::Finished { pid: 1 }));

    let log: Vec<_> = log_rx.try_iter().collect();
    assert_eq!(log, vec![(1, HOST_PID), (2, 1), (1, 2), (1, 11)]);
    assert!(switcher.is_finished(1));
    assert!(switcher.is_finished(2));
}

#[test]
fn test_yield_to_host_and_resume() {
    let switcher: ContextSwitcher<u64> = ContextSwitcher::new(2);
    switcher.register_initial_state(1, &0).unwrap();
    switcher
        .launch(1, |fiber| {
            for _ in 0..3 {
                *fiber.state_mut() += 1;
                if fiber.switch_to(HOST_PID) != Ok(HOST_PID) {
                    return None;
                }
            }
            None
        })
        .unwrap();

    for expected in 1..=3 {
        assert_eq!(switcher.resume(1), Ok(Handoff::Yielded { from: 1 }));
        assert_eq!(switcher.saved_state(1), Some(expected));
    }
    assert_eq!(switcher.resume(1), Ok(Handoff::Finished { pid: 1 }));
}

#[test]
fn test_switch_to_self_is_noop() {
    let switcher: ContextSwitcher<u8> = ContextSwitcher::new(1);
    switcher.register_initial_state(5, &0).unwrap();

    let (tx, rx) = flume::unbounded();
    switcher
        .launch(5, move |fiber| {
            tx.send(fiber.switch_to(5)).unwrap();
            None
        })
        .unwrap();

    assert_eq!(switcher.resume(5), Ok(Handoff::Finished { pid: 5 }));
    assert_eq!(rx.recv().unwrap(), Ok(5));
}

#[test]
fn test_switch_to_unknown_process() {
    let switcher: ContextSwitcher<u8> = ContextSwitcher::new(2);
    switcher.register_initial_state(1, &0).unwrap();

    let (tx, rx) = flume::unbounded();
    switcher
        .launch(1, move |fiber| {
            tx.send(fiber.switch_to(9)).unwrap();
            None
        })
        .unwrap();

    assert_eq!(switcher.resume(1), Ok(Handoff::Finished { pid: 1 }));
    assert_eq!(rx.recv().unwrap(), Err(ContextError::UnknownProcess(9)));
    assert_eq!(switcher.resume(9), Err(ContextError::UnknownProcess(9)));
}

#[test]
fn test_each_process_keeps_its_own_context() {
    let switcher: ContextSwitcher = ContextSwitcher::new(3);
    for pid in 1..=3u32 {
        let mut snapshot = MachineContext::new(u64::from(pid) * 0x100, 32);
        snapshot.push(u64::from(pid));
        switcher.register_initial_state(pid, &snapshot).unwrap();
        switcher
            .launch(pid, move |fiber| {
                let word = fiber.state_mut().pop().unwrap_or(0);
                fiber.state_mut().regs[1] = word * 10;
                if pid < 3 {
                    Some(pid + 1)
                } else {
                    None
                }
            })
            .unwrap();
    }

    assert_eq!(switcher.resume(1), Ok(Handoff::Finished { pid: 3 }));
    for pid in 1..=3u32 {
        let ctx = switcher.saved_state(pid).unwrap();
        assert_eq!(ctx.regs[1], u64::from(pid) * 10);
        assert_eq!(ctx.pc, u64::from(pid) * 0x100);
        assert_eq!(ctx.sp, 32);
    }
    switcher.shutdown();
}

#[test]
fn test_shutdown_releases_suspended_fibers() {
    let switcher: ContextSwitcher<u8> = ContextSwitcher::new(2);
    switcher.register_initial_state(1, &0).unwrap();

    let (tx, rx) = flume::unbounded();
    switcher
        .launch(1, move |fiber| {
            let result = fiber.switch_to(HOST_PID);
            tx.send(result).unwrap();
            None
        })
        .unwrap();

    assert_eq!(switcher.resume(1), Ok(Handoff::Yielded { from: 1 }));
    switcher.shutdown();
    assert_eq!(rx.recv().unwrap(), Err(ContextError::Terminated));
}

#[test]
fn test_release_suspended_fiber_stays_silent() {
    let switcher: ContextSwitcher<u8> = ContextSwitcher::new(2);
    for pid in 1..=2u32 {
        switcher.register_initial_state(pid, &0).unwrap();
        switcher
            .launch(pid, |fiber| {
                while fiber.switch_to(HOST_PID).is_ok() {}
                None
            })
            .unwrap();
    }

    assert_eq!(switcher.resume(1), Ok(Handoff::Yielded { from: 1 }));
    switcher.release(1).unwrap();

    // Only the resumed fiber may answer
    assert_eq!(switcher.resume(2), Ok(Handoff::Yielded { from: 2 }));
    assert_eq!(switcher.resume(2), Ok(Handoff::Yielded { from: 2 }));
    assert_eq!(switcher.resume(1), Err(ContextError::UnknownProcess(1)));
    switcher.shutdown();
}

#[test]
fn test_switch_to_unlaunched_process() {
    let switcher: ContextSwitcher<u8> = ContextSwitcher::new(2);
    switcher.register_initial_state(1, &7).unwrap();
    switcher.register_initial_state(2, &0).unwrap();

    assert_eq!(switcher.resume(1), Err(ContextError::NotLaunched(1)));
    assert_eq!(switcher.saved_state(1), Some(7));

    let (tx, rx) = flume::unbounded();
    switcher
        .launch(2, move |fiber| {
            tx.send(fiber.switch_to(1)).unwrap();
            None
        })
        .unwrap();
    assert_eq!(switcher.resume(2), Ok(Handoff::Finished { pid: 2 }));
    assert_eq!(rx.recv().unwrap(), Err(ContextError::NotLaunched(1)));

    // Once launched it can be switched to
    switcher.launch(1, |_| None).unwrap();
    assert_eq!(switcher.resume(1), Ok(Handoff::Finished { pid: 1 }));
}
