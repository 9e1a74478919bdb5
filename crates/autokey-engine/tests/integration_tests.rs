//! End-to-end behaviour of tasks, the executor and the registry.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use autokey_engine::{
    AutomationRegistry, BoundedExecutor, ChainStep, ChainedTask, CompletionCallback,
    ExecutorObserver, PeriodicKind, Rejected, Task,
    presets::clicker,
    test_support::{CallLog, wait_until},
};
use input_inject::{ButtonAction, InputInjector, MouseButton, RecordingInjector};

fn recorder() -> (RecordingInjector, Arc<dyn InputInjector>) {
    let rec = RecordingInjector::new();
    let io: Arc<dyn InputInjector> = Arc::new(rec.clone());
    (rec, io)
}

#[test]
fn clicker_cycles_and_releases_once_after_stop() {
    let (rec, io) = recorder();
    let task = clicker("clicker", io, MouseButton::Left, Duration::from_millis(50))
        .build()
        .unwrap();
    task.start().unwrap();
    thread::sleep(Duration::from_millis(220));
    task.stop();

    let presses = rec.count_clicks(MouseButton::Left, ButtonAction::Press);
    let releases = rec.count_clicks(MouseButton::Left, ButtonAction::Release);
    assert!((3..=5).contains(&presses), "presses = {presses}");
    assert_eq!(releases, presses + 1);

    // Nothing happens after stop returns.
    let settled = rec.len();
    thread::sleep(Duration::from_millis(80));
    assert_eq!(rec.len(), settled);
    assert!(!task.is_running());
}

#[test]
fn stop_returns_promptly_with_long_interval() {
    let (_, io) = recorder();
    let task = clicker("slow", io, MouseButton::Right, Duration::from_secs(10))
        .build()
        .unwrap();
    task.start().unwrap();
    thread::sleep(Duration::from_millis(30));
    let t0 = Instant::now();
    task.stop();
    assert!(t0.elapsed() < Duration::from_millis(500));
}

#[test]
fn chain_runs_in_order_with_delays_and_completes_once() {
    let log = CallLog::new();
    let done = Arc::new(AtomicUsize::new(0));
    let d2 = done.clone();
    let cb: CompletionCallback = Arc::new(move |_: &str| {
        d2.fetch_add(1, Ordering::SeqCst);
    });
    let steps = vec![
        ChainStep::new(log.recorder("A"), Duration::ZERO),
        ChainStep::new(log.recorder("B"), Duration::from_millis(100)),
        ChainStep::new(log.recorder("C"), Duration::ZERO),
    ];
    let task = ChainedTask::new("abc", steps, false, Some(cb)).unwrap();
    task.start().unwrap();
    assert!(wait_until(Duration::from_secs(2), || !task.is_running()));
    task.stop();

    assert_eq!(log.labels(), vec!["A", "B", "C"]);
    let timed = log.timed();
    let ab = timed[1].0 - timed[0].0;
    let bc = timed[2].0 - timed[1].0;
    assert!(ab >= Duration::from_millis(95), "A->B gap {ab:?}");
    assert!(bc < Duration::from_millis(60), "B->C gap {bc:?}");
    assert_eq!(done.load(Ordering::SeqCst), 1);
}

#[test]
fn executor_rejects_submission_past_capacity() {
    let exec = BoundedExecutor::new(1, 3).unwrap();
    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
    let mut handles = Vec::new();
    for _ in 0..3 {
        let rx = gate_rx.clone();
        handles.push(
            exec.submit(
                move || {
                    let _ignored = rx.recv_timeout(Duration::from_secs(5));
                },
                Duration::from_secs(10),
            )
            .unwrap(),
        );
    }
    assert_eq!(
        exec.submit(|| {}, Duration::from_secs(1)).err(),
        Some(Rejected::QueueFull)
    );
    let stats = exec.stats();
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.outstanding, 3);

    drop(gate_tx);
    for h in &handles {
        assert!(h.wait(Duration::from_secs(2)));
    }
    assert!(exec.submit(|| {}, Duration::from_secs(1)).is_ok());
    assert!(exec.shutdown(Duration::from_secs(2)));
}

#[derive(Default)]
struct TimeoutCounter {
    hits: AtomicUsize,
}

impl ExecutorObserver for TimeoutCounter {
    fn on_timeout(&self, _job: u64, _budget: Duration) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn overrunning_job_is_flagged_but_completes() {
    let exec = BoundedExecutor::new(2, 4).unwrap();
    let observer = Arc::new(TimeoutCounter::default());
    exec.set_observer(observer.clone());

    let finished = Arc::new(AtomicUsize::new(0));
    let f2 = finished.clone();
    let handle = exec
        .submit(
            move || {
                thread::sleep(Duration::from_millis(150));
                f2.fetch_add(1, Ordering::SeqCst);
            },
            Duration::from_millis(30),
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(1), || handle.timed_out()));
    assert!(!handle.is_done());
    assert!(handle.wait(Duration::from_secs(2)));
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(observer.hits.load(Ordering::SeqCst), 1);
    assert_eq!(exec.stats().timed_out, 1);
}

#[test]
fn fast_job_is_never_flagged() {
    let exec = BoundedExecutor::new(1, 2).unwrap();
    let handle = exec.submit(|| {}, Duration::from_millis(50)).unwrap();
    assert!(handle.wait(Duration::from_secs(1)));
    thread::sleep(Duration::from_millis(100));
    assert!(!handle.timed_out());
    assert_eq!(exec.stats().timed_out, 0);
}

#[test]
fn registry_remove_and_stop_all() {
    let (rec, io) = recorder();
    let reg = AutomationRegistry::new(io);

    let a = reg
        .create_periodic_task(
            &PeriodicKind::KeyPresser { key: "a".into() },
            Some(Duration::from_millis(15)),
        )
        .unwrap();
    let b = reg
        .create_periodic_task(
            &PeriodicKind::Runner { key: "w".into() },
            Some(Duration::from_millis(15)),
        )
        .unwrap();
    a.start().unwrap();
    b.start().unwrap();
    thread::sleep(Duration::from_millis(40));

    assert!(reg.remove_task(a.name()));
    assert!(!reg.has_task(a.name()));
    assert!(!a.is_running());
    assert!(reg.has_task(b.name()));

    reg.stop_all();
    assert!(reg.is_empty());
    assert!(!b.is_running());
    assert!(!rec.is_empty());
}

#[test]
fn looping_chain_unregisters_when_stopped() {
    let (_, io) = recorder();
    let reg = AutomationRegistry::new(io);
    let log = CallLog::new();
    let steps = vec![
        ChainStep::new(log.recorder("tick"), Duration::from_millis(5)),
        ChainStep::new(log.recorder("tock"), Duration::from_millis(5)),
    ];
    let h = reg.create_chained_task("loop", steps, true).unwrap();
    assert!(h.is_running());
    assert!(wait_until(Duration::from_secs(2), || log.count("tick") >= 3));

    h.stop();
    assert!(!reg.has_task(h.name()));
    let settled = log.len();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(log.len(), settled);
}

#[test]
fn dropping_registry_stops_tasks() {
    let (_, io) = recorder();
    let reg = AutomationRegistry::new(io);
    let h = reg
        .create_periodic_task(
            &PeriodicKind::Clicker {
                button: MouseButton::Middle,
                fast: true,
            },
            Some(Duration::from_millis(10)),
        )
        .unwrap();
    h.start().unwrap();
    drop(reg);
    assert!(!h.is_running());
}
