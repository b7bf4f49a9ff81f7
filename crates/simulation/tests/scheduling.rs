//! End-to-end scheduling scenarios on the simulated clock.

use procsim_core::{Lifecycle, TimerId};
use procsim_node::NodeConfig;
use procsim_simulation::{Notification, SimulationRunner};
use procsim_types::{Algorithm, CoreId, GenerationParadigm, ProcessId, TimeUnit};
use procsim_workload::ArrivalConfig;
use std::time::Duration;
use tracing_test::traced_test;

fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

fn runner_with(config: NodeConfig) -> SimulationRunner {
    SimulationRunner::new(config)
}

fn finished_at(notifications: &[Notification], process: ProcessId) -> Option<Duration> {
    notifications.iter().find_map(|n| match n.event {
        Lifecycle::Finished { process: p, .. } if p == process => Some(n.time),
        _ => None,
    })
}

fn linear_arrivals(count: f64) -> ArrivalConfig {
    ArrivalConfig::default()
        .with_rate(count, TimeUnit::Second)
        .with_paradigm(GenerationParadigm::Linear)
}

#[traced_test]
#[test]
fn fcfs_runs_to_completion_at_core_speed() {
    let mut runner = runner_with(NodeConfig::default());
    let core = CoreId(0);

    runner.control(|node| {
        node.submit_process(core, 3).unwrap();
        node.submit_process(core, 2).unwrap();
        node.start_core(core).unwrap();
    });

    // Speed 10: one step every 100 ms.
    runner.run_until(ms(600));
    let notifications = runner.take_notifications();

    assert_eq!(finished_at(&notifications, ProcessId(1)), Some(ms(300)));
    assert_eq!(finished_at(&notifications, ProcessId(2)), Some(ms(500)));
    assert!(notifications.contains(&Notification {
        time: ms(600),
        event: Lifecycle::CoreIdle { core },
    }));
    assert!(runner.node().scheduler().core(core).unwrap().is_idle());
}

#[test]
fn round_robin_alternates_by_quantum() {
    let mut runner = runner_with(NodeConfig::default());
    let core = CoreId(0);

    runner.control(|node| {
        node.set_algorithm(core, Algorithm::RoundRobin).unwrap();
        node.set_time_quantum(core, 2).unwrap();
        node.submit_process(core, 4).unwrap();
        node.submit_process(core, 4).unwrap();
        node.start_core(core).unwrap();
    });
    let _ = runner.take_notifications();

    runner.run_until(ms(800));
    let promotions: Vec<_> = runner
        .take_notifications()
        .into_iter()
        .filter_map(|n| match n.event {
            Lifecycle::Running { process, .. } => Some((n.time, process)),
            _ => None,
        })
        .collect();

    assert_eq!(
        promotions,
        vec![
            (ms(200), ProcessId(2)),
            (ms(400), ProcessId(1)),
            (ms(600), ProcessId(2)),
        ]
    );
    assert_eq!(
        runner.node().scheduler().running_process_id(core),
        Ok(None)
    );
}

#[test]
fn linear_generation_is_exact() {
    let config = NodeConfig::default().with_arrival(linear_arrivals(10.0));
    let mut runner = runner_with(config);

    runner.control(|node| node.start_generation());
    runner.run_until(ms(10_000));

    // Fires at 100 ms, 200 ms, ... 10 000 ms.
    assert_eq!(runner.node().next_process_id(), ProcessId(101));
    assert_eq!(runner.stats().events_by_type.get("ArrivalTimer"), Some(&100));
}

#[test]
fn at_most_one_arrival_timer() {
    let mut runner = runner_with(NodeConfig::default());

    runner.control(|node| {
        node.start_generation();
        node.start_generation();
        node.set_paradigm(GenerationParadigm::Linear);
        node.set_mean_arrival_count(50.0).unwrap();
        node.set_time_unit(TimeUnit::Minute).unwrap();
    });

    assert!(runner.is_armed(TimerId::Arrival));
    // Utilization plus one arrival timer.
    assert_eq!(runner.pending_events(), 2);
    // 50 per minute.
    assert_eq!(runner.deadline(TimerId::Arrival), Some(ms(1_200)));

    runner.control(|node| node.toggle_generation());
    assert!(!runner.is_armed(TimerId::Arrival));
    runner.run_until(ms(5_000));
    assert_eq!(runner.stats().events_by_type.get("ArrivalTimer"), None);
}

#[test]
fn weighted_routing_through_the_node() {
    let config = NodeConfig::default()
        .with_arrival(linear_arrivals(100.0))
        .with_seed(2024);
    let mut runner = runner_with(config);

    runner.control(|node| {
        node.add_core();
        node.apply_bulk_probabilities(&["25", "75"]).unwrap();
        node.start_generation();
    });
    runner.run_until(ms(100_000));

    let arrivals: Vec<_> = runner
        .take_notifications()
        .into_iter()
        .filter(|n| {
            matches!(
                n.event,
                Lifecycle::Waiting { .. } | Lifecycle::Running { .. }
            )
        })
        .collect();
    let total = arrivals.len();
    let to_first = arrivals
        .iter()
        .filter(|n| n.event.core() == CoreId(0))
        .count();

    // Nothing is stepping, so every process is announced exactly once.
    assert_eq!(total, 10_000);
    let share = to_first as f64 / total as f64;
    assert!((share - 0.25).abs() < 0.03, "core 0 got {share}");
}

#[test]
fn utilization_tracks_busy_and_stopped_cores() {
    let mut runner = runner_with(NodeConfig::default());

    runner.control(|node| {
        node.add_core();
        node.submit_process(CoreId(0), 1_000).unwrap();
        node.start_core(CoreId(0)).unwrap();
        node.start_core(CoreId(1)).unwrap();
    });
    runner.run_until(ms(5_000));

    let analytics = runner.node().analytics();
    assert_eq!(analytics.core_utilization(CoreId(0)), Ok(1.0));
    assert_eq!(analytics.core_utilization(CoreId(1)), Ok(0.0));
    assert_eq!(analytics.overall_core_utilization(), 0.5);

    // Recomputing without new events changes nothing.
    let before = analytics.core_utilizations();
    runner.control(|node| node.recompute_utilization());
    assert_eq!(runner.node().analytics().core_utilizations(), before);
}

#[traced_test]
#[test]
fn removing_a_core_keeps_the_others_stepping() {
    let mut runner = runner_with(NodeConfig::default());

    runner.control(|node| {
        node.add_core();
        node.add_core();
        for i in 0..3 {
            node.submit_process(CoreId(i), 5).unwrap();
            node.start_core(CoreId(i)).unwrap();
        }
    });
    runner.run_until(ms(200));

    runner.control(|node| node.remove_core(CoreId(0))).unwrap();
    assert!(!runner.is_armed(TimerId::CoreStep(CoreId(2))));
    assert!(runner.is_armed(TimerId::CoreStep(CoreId(0))));
    assert!(runner.is_armed(TimerId::CoreStep(CoreId(1))));

    runner.run_until(ms(2_000));
    let notifications = runner.take_notifications();
    assert!(finished_at(&notifications, ProcessId(2)).is_some());
    assert!(finished_at(&notifications, ProcessId(3)).is_some());
    assert!(finished_at(&notifications, ProcessId(1)).is_none());
    assert!(!logs_contain("Step failed"));
    assert!(!logs_contain("untracked core"));
}

#[test]
fn same_seed_same_run() {
    let run = || {
        let config = NodeConfig::default().with_seed(99);
        let mut runner = SimulationRunner::new(config);
        runner.control(|node| {
            node.add_core();
            node.set_algorithm(CoreId(1), Algorithm::ShortestJobFirst).unwrap();
            node.set_mean_arrival_count(20.0).unwrap();
            node.start_generation();
            node.start_core(CoreId(0)).unwrap();
            node.start_core(CoreId(1)).unwrap();
        });
        runner.run_until(ms(30_000));
        (
            runner.take_notifications(),
            runner.node().analytics().overall_turnaround_time(),
        )
    };

    let (first, turnaround) = run();
    let (second, turnaround_again) = run();
    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(turnaround, turnaround_again);
}
