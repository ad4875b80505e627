//! 链路故障恢复测试
//!
//! 验证：
//! 1. 稳态中任何一步失败 → 协商标志全部清零、严重告警在下一次 resync 前拉起
//! 2. 失败步骤之后的步骤不再执行
//! 3. 重新同步后完整重新协商
//! 4. 错误计数跨会话单调递增

mod common;

use ahrs_comms::{LinkEvent, LinkState, LinkStep};
use ahrs_store::{AhrsStatus, AlarmId, AlarmSeverity, CommErrorKind};
use common::{Harness, fast_filtered};
use opahrs_protocol::MessageKind;

#[test]
fn test_failure_in_steady_resets_session() {
    let mut h = Harness::new(fast_filtered());
    h.reach_steady();
    h.periods(3);
    assert!(h.manager.session().fully_negotiated());
    assert_eq!(h.store.alarm(AlarmId::AhrsComms), AlarmSeverity::Ok);

    h.device.fail_next(MessageKind::FusedUpdateRequest, 1);
    h.device.fail_resync(1);
    assert_eq!(h.manager.step(), LinkState::Unsynced);

    // 下一次 resync 之前的可见状态
    let status = h.store.get::<AhrsStatus>();
    assert!(!status.home_set);
    assert!(!status.calibration_set);
    assert!(!status.algorithm_set);
    assert_eq!(h.store.alarm(AlarmId::AhrsComms), AlarmSeverity::Critical);
    assert_eq!(status.comm_error(CommErrorKind::Update), 1);

    // resync 失败：保持 Unsynced，告警仍在
    assert_eq!(h.manager.step(), LinkState::Unsynced);
    assert_eq!(h.store.alarm(AlarmId::AhrsComms), AlarmSeverity::Critical);
}

#[test]
fn test_failed_step_aborts_rest_of_period() {
    let mut h = Harness::new(fast_filtered());
    h.reach_steady();
    h.device.clear_requests();

    h.device.fail_next(MessageKind::CalibrationRequest, 1);
    assert_eq!(h.manager.step(), LinkState::Unsynced);

    assert_eq!(
        h.device.request_kinds(),
        vec![MessageKind::HomeReferenceRequest, MessageKind::CalibrationRequest]
    );
}

#[test]
fn test_renegotiates_everything_after_resync() {
    let mut h = Harness::new(fast_filtered());
    h.reach_steady();
    h.periods(2);

    h.device.fail_next(MessageKind::FusedUpdateRequest, 1);
    assert_eq!(h.manager.step(), LinkState::Unsynced);
    h.device.clear_requests();

    h.reach_steady();
    h.periods(1);

    assert_eq!(
        h.device.request_kinds(),
        vec![
            MessageKind::IdentityRequest,
            MessageKind::HomeReferenceRequest,
            MessageKind::CalibrationRequest,
            MessageKind::AlgorithmRequest,
            MessageKind::FusedUpdateRequest,
        ]
    );
    assert!(h.manager.session().fully_negotiated());
    assert_eq!(h.store.alarm(AlarmId::AhrsComms), AlarmSeverity::Ok);
    assert_eq!(h.manager.metrics().sessions_established, 2);
}

#[test]
fn test_error_counters_are_monotonic_across_sessions() {
    let mut h = Harness::new(fast_filtered());
    let mut last = [0u32; CommErrorKind::COUNT];

    for kind in [
        MessageKind::HomeReferenceRequest,
        MessageKind::AlgorithmRequest,
        MessageKind::FusedUpdateRequest,
        MessageKind::HomeReferenceRequest,
        MessageKind::CalibrationRequest,
    ] {
        h.reach_steady();
        h.device.fail_next(kind, 1);
        assert_eq!(h.manager.step(), LinkState::Unsynced);

        let counters = h.store.get::<AhrsStatus>().comm_errors;
        for (now, before) in counters.iter().zip(last.iter()) {
            assert!(now >= before);
        }
        assert_eq!(counters.iter().sum::<u32>(), last.iter().sum::<u32>() + 1);
        last = counters;
    }

    let status = h.store.get::<AhrsStatus>();
    assert_eq!(status.comm_error(CommErrorKind::HomeLocation), 2);
    assert_eq!(status.comm_error(CommErrorKind::Algorithm), 1);
    assert_eq!(status.comm_error(CommErrorKind::Update), 1);
    assert_eq!(status.comm_error(CommErrorKind::Calibration), 1);
    assert_eq!(status.comm_error(CommErrorKind::Attitude), 0);
    assert_eq!(h.manager.metrics().step_failures, 5);
}

#[test]
fn test_unsynced_never_gives_up() {
    let mut h = Harness::new(fast_filtered());
    h.device.fail_resync(50);
    for _ in 0..50 {
        assert_eq!(h.manager.step(), LinkState::Unsynced);
    }
    assert_eq!(h.manager.step(), LinkState::Identifying);
    assert_eq!(h.manager.metrics().resync_attempts, 51);
}

#[test]
fn test_failure_event_names_step() {
    let mut h = Harness::new(fast_filtered());
    let events = h.manager.subscribe();
    h.reach_steady();
    h.device.fail_next(MessageKind::FusedUpdateRequest, 1);
    h.manager.step();

    let failure = events
        .try_iter()
        .find_map(|e| match e {
            LinkEvent::StepFailed { step, error } => Some((step, error)),
            _ => None,
        })
        .expect("failure event");
    assert_eq!(failure.0, LinkStep::FusedUpdate);
    assert!(failure.1.contains("Response timeout"), "{}", failure.1);
}
