//! Mock 传输
//!
//! 用于测试的脚本化协处理器：记录每个请求、按消息类型注入故障、返回预设应答。
//!
//! `MockTransport` 会被移动进链路任务，测试通过 [`MockHandle`] 在外部脚本化和检查。

use crate::{AhrsTransport, LinkError};
use opahrs_protocol::{
    CalibrationRequest, CalibrationResponse, FusedUpdateRequest, FusedUpdateResponse,
    HomeReferenceRequest, Identity, MessageKind, RawAttitudeResponse, Request, Response,
    SERIAL_LEN,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// 故障注入计划
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailurePlan {
    /// 接下来 N 次失败
    Next(u32),
    /// 一直失败
    Always,
}

/// Mock 协处理器状态
#[derive(Debug)]
struct MockState {
    identity: Identity,
    /// `None` 时按请求原样回显方差
    calibration_response: Option<CalibrationResponse>,
    raw_attitude: RawAttitudeResponse,
    fused_update: FusedUpdateResponse,
    failures: HashMap<MessageKind, FailurePlan>,
    resync_failures: u32,
    resync_calls: u32,
    requests: Vec<Request>,
}

impl Default for MockState {
    fn default() -> Self {
        let mut serial = [0u8; SERIAL_LEN];
        for (i, byte) in serial.iter_mut().enumerate() {
            *byte = (i % 10) as u8;
        }
        Self {
            identity: Identity::new(serial),
            calibration_response: None,
            raw_attitude: RawAttitudeResponse::default(),
            fused_update: FusedUpdateResponse {
                quaternion: [1.0, 0.0, 0.0, 0.0],
                ..Default::default()
            },
            failures: HashMap::new(),
            resync_failures: 0,
            resync_calls: 0,
            requests: Vec::new(),
        }
    }
}

impl MockState {
    /// 消耗一次故障计划，返回本次是否应失败
    fn take_failure(&mut self, kind: MessageKind) -> bool {
        match self.failures.get_mut(&kind) {
            Some(FailurePlan::Always) => true,
            Some(FailurePlan::Next(remaining)) => {
                *remaining -= 1;
                if *remaining == 0 {
                    self.failures.remove(&kind);
                }
                true
            },
            None => false,
        }
    }

    fn respond(&self, request: &Request) -> Response {
        match request {
            Request::Identity => Response::Identity(self.identity),
            Request::HomeReference(_) | Request::Algorithm(_) => Response::Ack,
            Request::Calibration(req) => Response::Calibration(
                self.calibration_response.unwrap_or(CalibrationResponse {
                    mode: req.mode,
                    accel_var: req.accel_var,
                    gyro_var: req.gyro_var,
                    mag_var: req.mag_var,
                }),
            ),
            Request::RawAttitude => Response::RawAttitude(self.raw_attitude),
            Request::FusedUpdate(_) => Response::FusedUpdate(self.fused_update),
        }
    }
}

/// 脚本化传输（移动进链路任务）
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Mock 传输的外部控制句柄
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取控制句柄
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: self.state.clone(),
        }
    }
}

impl AhrsTransport for MockTransport {
    fn resync(&mut self) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        state.resync_calls += 1;
        if state.resync_failures > 0 {
            state.resync_failures -= 1;
            return Err(LinkError::NotSynced);
        }
        Ok(())
    }

    fn transact(&mut self, request: Request) -> Result<Response, LinkError> {
        let mut state = self.state.lock();
        state.requests.push(request);
        if state.take_failure(request.kind()) {
            return Err(LinkError::Timeout);
        }
        Ok(state.respond(&request))
    }
}

impl MockHandle {
    /// 指定类型的请求接下来 `count` 次失败
    pub fn fail_next(&self, kind: MessageKind, count: u32) {
        if count > 0 {
            self.state.lock().failures.insert(kind, FailurePlan::Next(count));
        }
    }

    /// 指定类型的请求一直失败
    pub fn fail_always(&self, kind: MessageKind) {
        self.state.lock().failures.insert(kind, FailurePlan::Always);
    }

    /// 清除所有故障注入
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// 接下来 `count` 次 resync 失败
    pub fn fail_resync(&self, count: u32) {
        self.state.lock().resync_failures = count;
    }

    pub fn set_identity(&self, identity: Identity) {
        self.state.lock().identity = identity;
    }

    /// 固定标定应答（默认按请求回显）
    pub fn set_calibration_response(&self, response: CalibrationResponse) {
        self.state.lock().calibration_response = Some(response);
    }

    pub fn set_raw_attitude(&self, raw: RawAttitudeResponse) {
        self.state.lock().raw_attitude = raw;
    }

    pub fn set_fused_update(&self, update: FusedUpdateResponse) {
        self.state.lock().fused_update = update;
    }

    /// 已收到的所有请求（按时间顺序，含失败的请求）
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    /// 已收到的请求类型序列
    pub fn request_kinds(&self) -> Vec<MessageKind> {
        self.state.lock().requests.iter().map(Request::kind).collect()
    }

    /// 指定类型请求的次数
    pub fn count(&self, kind: MessageKind) -> usize {
        self.state.lock().requests.iter().filter(|r| r.kind() == kind).count()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    pub fn resync_calls(&self) -> u32 {
        self.state.lock().resync_calls
    }

    pub fn last_home_reference(&self) -> Option<HomeReferenceRequest> {
        self.state.lock().requests.iter().rev().find_map(|r| match r {
            Request::HomeReference(req) => Some(*req),
            _ => None,
        })
    }

    pub fn last_calibration(&self) -> Option<CalibrationRequest> {
        self.state.lock().requests.iter().rev().find_map(|r| match r {
            Request::Calibration(req) => Some(*req),
            _ => None,
        })
    }

    pub fn last_fused_update(&self) -> Option<FusedUpdateRequest> {
        self.state.lock().requests.iter().rev().find_map(|r| match r {
            Request::FusedUpdate(req) => Some(*req),
            _ => None,
        })
    }
}
