//! Scheduler control: pause, resume, stop, pacing and determinism.

mod common;

use blocksim_core::EventKind;
use blocksim_network::{NetworkConfig, PropagationModel, Rate, WirelessConfig};
use blocksim_simulation::{
    Scheduler, SchedulerConfig, SchedulerError, SchedulerMode, SchedulerState, SchedulerStats,
    World,
};
use blocksim_types::{BlockId, Position, VirtualTime};
use common::{run_to_idle, Scripted, Seen, Step};
use std::time::{Duration, Instant};

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for the scheduler");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn ticking_block() -> Scripted {
    Scripted::new()
        .on_start(Step::Timer { delay: 10, id: 10 })
        .on_start(Step::Timer { delay: 20, id: 20 })
        .on_start(Step::Timer { delay: 30, id: 30 })
}

fn single_block_world(code: Scripted) -> World {
    let mut world = World::new(NetworkConfig::default());
    world
        .add_block(BlockId(0), Position::default(), Box::new(code))
        .unwrap();
    world
}

#[test]
fn test_pause_resume_and_stop() {
    let code = ticking_block();
    let log = code.log();
    let mut scheduler = Scheduler::new(single_block_world(code), SchedulerConfig::default());
    scheduler.pause(VirtualTime::from_micros(15)).unwrap();
    scheduler.start(SchedulerMode::Fast).unwrap();
    scheduler.unpause().unwrap();

    wait_until(|| scheduler.is_paused());
    assert_eq!(scheduler.now(), VirtualTime::from_micros(15));
    assert_eq!(
        *log.lock(),
        vec![(0, Seen::Started), (10, Seen::Timer { id: 10 })]
    );

    // Injected while paused: nothing runs until unpause.
    scheduler
        .tap_block(VirtualTime::from_micros(15), BlockId(0), Some(2))
        .unwrap();
    scheduler.stop(VirtualTime::from_micros(100)).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(log.lock().len(), 2);
    assert!(scheduler.is_paused());

    scheduler.unpause().unwrap();
    let (_, stats) = scheduler.wait_for_end().unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            (0, Seen::Started),
            (10, Seen::Timer { id: 10 }),
            (15, Seen::Tap { face: Some(2) }),
            (20, Seen::Timer { id: 20 }),
            (30, Seen::Timer { id: 30 }),
        ]
    );
    assert_eq!(stats.final_time, VirtualTime::from_micros(100));
    assert_eq!(stats.events_by_kind.get("Pause"), Some(&1));
    assert_eq!(stats.events_by_kind.get("Stop"), Some(&1));
}

#[test]
fn test_pause_in_the_past_pauses_now() {
    let code = ticking_block();
    let config = SchedulerConfig::default();
    let mut scheduler = Scheduler::new(single_block_world(code), config);
    scheduler.pause(VirtualTime::from_micros(20)).unwrap();
    scheduler.start(SchedulerMode::Fast).unwrap();
    scheduler.unpause().unwrap();
    wait_until(|| scheduler.is_paused());
    assert_eq!(scheduler.now(), VirtualTime::from_micros(20));

    // Already past: takes effect at the current date.
    scheduler.pause(VirtualTime::ZERO).unwrap();
    scheduler.unpause().unwrap();
    wait_until(|| scheduler.is_paused());
    assert_eq!(scheduler.now(), VirtualTime::from_micros(20));

    scheduler.stop(VirtualTime::ZERO).unwrap();
    scheduler.unpause().unwrap();
    let (_, stats) = scheduler.wait_for_end().unwrap();
    // The first pause was injected before the timers existed and so ran
    // ahead of the one at 20. The late stop came after it.
    assert_eq!(stats.final_time, VirtualTime::from_micros(20));
    assert_eq!(stats.events_by_kind.get("Timer"), Some(&2));
    assert_eq!(stats.events_by_kind.get("Pause"), Some(&2));
}

#[test]
fn test_injection_after_stop_is_rejected() {
    let config = SchedulerConfig::default().with_terminate_when_idle(true);
    let mut scheduler = Scheduler::new(World::new(NetworkConfig::default()), config);
    scheduler.start(SchedulerMode::Fast).unwrap();
    scheduler.unpause().unwrap();
    wait_until(|| scheduler.state() == SchedulerState::Stopped);

    assert!(matches!(
        scheduler.schedule_lock(VirtualTime::ZERO, EventKind::Stop),
        Err(SchedulerError::Stopped)
    ));
    assert!(matches!(scheduler.unpause(), Err(SchedulerError::Stopped)));
}

#[test]
fn test_past_injection_aborts() {
    let code = ticking_block();
    let mut scheduler = Scheduler::new(single_block_world(code), SchedulerConfig::default());
    scheduler.pause(VirtualTime::from_micros(25)).unwrap();
    scheduler.start(SchedulerMode::Fast).unwrap();
    scheduler.unpause().unwrap();
    wait_until(|| scheduler.is_paused());

    scheduler
        .tap_block(VirtualTime::from_micros(5), BlockId(0), None)
        .unwrap();
    scheduler.unpause().unwrap();
    assert!(matches!(
        scheduler.wait_for_end(),
        Err(SchedulerError::Aborted)
    ));
}

#[test]
fn test_max_date() {
    let code = ticking_block();
    let log = code.log();
    let config = SchedulerConfig::default().with_max_date(VirtualTime::from_micros(25));
    let (_, stats) = run_to_idle(single_block_world(code), config);

    assert_eq!(log.lock().len(), 3);
    assert_eq!(stats.final_time, VirtualTime::from_micros(25));
}

#[test]
fn test_real_time_follows_wall_clock() {
    let code = Scripted::new().on_start(Step::Timer {
        delay: 20_000,
        id: 1,
    });
    let log = code.log();
    let config = SchedulerConfig::default().with_terminate_when_idle(true);
    let mut scheduler = Scheduler::new(single_block_world(code), config);

    let started = Instant::now();
    scheduler
        .start(SchedulerMode::RealTime { speed: 1.0 })
        .unwrap();
    scheduler.unpause().unwrap();
    let (_, stats) = scheduler.wait_for_end().unwrap();

    assert!(started.elapsed() >= Duration::from_millis(20));
    assert_eq!(log.lock().last(), Some(&(20_000, Seen::Timer { id: 1 })));
    assert_eq!(stats.final_time, VirtualTime::from_micros(20_000));
}

/// A small mixed world with every random draw turned on.
fn noisy_world(seed: u64) -> World {
    let shadowing =
        WirelessConfig::default().with_propagation(PropagationModel::LogNormalShadowing {
            exponent: 2.0,
            deviation_db: 6.0,
            reference_loss_db: 20.0,
        });
    let mut world =
        World::new(NetworkConfig::default().with_seed(seed)).with_wireless_config(shadowing);

    let mut ports = Vec::new();
    for i in 0..4u32 {
        let code = Scripted::new()
            .on_start(Step::Send {
                port: 0,
                tag: i,
                size: 16,
            })
            .on_start(Step::Broadcast { tag: 100 + i, size: 8 })
            .on_start(Step::Timer { delay: 50, id: 0 })
            .on_timer(0, Step::Broadcast { tag: 200 + i, size: 8 });
        world
            .add_block(BlockId(i), Position::new(i as f64 * 3.0, 0.0, 0.0), Box::new(code))
            .unwrap();
        let port = world.add_p2p_interface(BlockId(i)).unwrap();
        world
            .set_data_rate(port, Rate::uniform(100_000.0, 2_000_000.0, seed + i as u64).unwrap())
            .unwrap();
        world.add_wireless_interface(BlockId(i), None).unwrap();
        ports.push(port);
    }
    world.connect(ports[0], Some(ports[1])).unwrap();
    world.connect(ports[2], Some(ports[3])).unwrap();
    world
}

fn run_noisy(seed: u64) -> (World, SchedulerStats) {
    run_to_idle(noisy_world(seed), SchedulerConfig::default().with_trace(true))
}

#[test]
fn test_same_seed_same_run() {
    let (world_a, stats_a) = run_noisy(7);
    let (world_b, stats_b) = run_noisy(7);

    assert_eq!(stats_a.trace, stats_b.trace);
    assert_eq!(stats_a.events_by_kind, stats_b.events_by_kind);
    assert_eq!(stats_a.final_time, stats_b.final_time);
    assert_eq!(world_a.network_stats(), world_b.network_stats());
    for i in 0..4 {
        let seen_a = world_a.block_code::<Scripted>(BlockId(i)).unwrap().seen();
        let seen_b = world_b.block_code::<Scripted>(BlockId(i)).unwrap().seen();
        assert_eq!(seen_a, seen_b);
    }
}
