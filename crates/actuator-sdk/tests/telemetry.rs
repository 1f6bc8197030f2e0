//! 遥测与调参跨线程测试

use actuator_sdk::mechanism::TuningKey;
use actuator_sdk::prelude::*;
use std::sync::Arc;
use std::thread;

fn scheduler_with_flywheel() -> Scheduler {
    let mut allocators = Allocators::new();
    let backend = ActuationBackend::simulated(
        allocators.ports.allocate(),
        DcMotor::neo(1),
        SupplyRail::default(),
    );
    let mut flywheel = VelocityMechanism::new("flywheel", backend);
    let config = VelocityConfig {
        moment_of_inertia: 0.004,
        gains: Gains::new(0.01, 0.0, 0.0),
        ..VelocityConfig::default()
    };
    flywheel
        .configure(&config, &mut allocators, &Canvas::default())
        .unwrap();

    let mut scheduler = Scheduler::new(LoopConfig::default()).unwrap();
    scheduler.add(Box::new(flywheel)).unwrap();
    scheduler
}

#[test]
fn test_latest_frames_readable_from_other_thread() {
    let mut scheduler = scheduler_with_flywheel();
    let latest = Arc::new(LatestFrames::new());
    scheduler.add_sink(latest.clone());

    scheduler.command("flywheel", 2000.0).unwrap();
    scheduler.run_for(10);

    let (tx, rx) = crossbeam_channel::bounded(1);
    let reader = Arc::clone(&latest);
    thread::spawn(move || {
        let frame = reader.get("flywheel");
        tx.send(frame.map(|f| (f.lifecycle, f.value("reference"))))
            .unwrap();
    });

    let seen = rx.recv().unwrap();
    assert_eq!(seen, Some((Lifecycle::Active, Some(2000.0))));
    assert_eq!(latest.names(), vec!["flywheel".to_string()]);
}

#[test]
fn test_tuning_from_other_thread_applies_at_tick_start() {
    let mut scheduler = scheduler_with_flywheel();
    scheduler.command("flywheel", 100.0).unwrap();
    let sender = scheduler.tuning_sender();

    thread::spawn(move || {
        assert!(sender.send("flywheel", TuningKey::Kp, 0.05));
        assert!(sender.send("flywheel", TuningKey::Kg, 1.0));
        assert!(sender.send("ghost", TuningKey::Kp, 1.0));
    })
    .join()
    .unwrap();

    let report = scheduler.tick(SIM_STEP);
    assert_eq!(report.tuning_applied, 1);
    // 速度机构不接受 kG，未知机构直接丢弃
    assert_eq!(report.tuning_rejected, 2);
    assert!(report.errors.is_empty());

    // 同一周期内已使用新的 kP：0.05 * 100 = 5 V
    let effort = scheduler
        .mechanism("flywheel")
        .and_then(|m| m.draw().value("effort"));
    assert!((effort.unwrap() - 5.0).abs() < 1e-9);
}

#[test]
fn test_frame_serializes_as_json_line() {
    let mut scheduler = scheduler_with_flywheel();
    let recorder = Arc::new(RecordingSink::new());
    scheduler.add_sink(recorder.clone());

    scheduler.command("flywheel", 1500.0).unwrap();
    scheduler.tick(SIM_STEP);

    let frame = recorder.last_for("flywheel").unwrap();
    let line = serde_json::to_string(&frame).unwrap();
    assert!(!line.contains('\n'));

    let json: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(json["mechanism"], "flywheel");
    assert_eq!(json["faulted"], false);
    assert_eq!(json["ligaments"].as_array().map(|l| l.len()), Some(2));
    assert!(json["values"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v["name"] == "reference" && v["value"] == 1500.0));
}
