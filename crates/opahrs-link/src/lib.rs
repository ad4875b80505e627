//! # OpenPilot AHRS Link Layer
//!
//! 协处理器链路的传输抽象层：一问一答、同步阻塞、同一时刻最多一个请求在途。
//!
//! 具体传输只需实现 [`AhrsTransport::resync`] 和 [`AhrsTransport::transact`]，
//! 各类型化调用（`get_identity()`、`set_get_calibration()` 等）由默认方法提供，
//! 应答类型不匹配时统一视为链路故障。
//!
//! ## 后端
//!
//! - `mock`: 脚本化传输，记录请求、注入故障（feature `mock`）
//! - `sim`: 行为级协处理器仿真（feature `sim`）

use opahrs_protocol::{
    AlgorithmId, CalibrationRequest, CalibrationResponse, FusedUpdateRequest, FusedUpdateResponse,
    HomeReferenceRequest, Identity, MessageKind, ProtocolError, RawAttitudeResponse, Request,
    Response,
};
use thiserror::Error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "sim")]
pub mod sim;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockHandle, MockTransport};

#[cfg(feature = "sim")]
pub use sim::{SimConfig, SimTransport};

/// 链路层统一错误类型
///
/// 协议本身不区分"设备拒绝配置"与"传输故障"，两者对上层都是链路故障。
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Response timeout")]
    Timeout,
    #[error("Link not synchronized")]
    NotSynced,
    #[error("Device rejected {0}")]
    Rejected(MessageKind),
    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        expected: MessageKind,
        actual: MessageKind,
    },
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Transport error: {0}")]
    Transport(String),
}

fn unexpected(request: &Request, response: &Response) -> LinkError {
    let kind = request.kind();
    LinkError::UnexpectedResponse {
        expected: kind.expected_response().unwrap_or(kind),
        actual: response.kind(),
    }
}

/// 协处理器传输能力
pub trait AhrsTransport {
    /// 重新建立干净的一问一答节拍
    fn resync(&mut self) -> Result<(), LinkError>;

    /// 发送一个请求并阻塞等待其应答
    fn transact(&mut self, request: Request) -> Result<Response, LinkError>;

    /// 发送请求，并校验应答类型与请求匹配
    fn exchange(&mut self, request: Request) -> Result<Response, LinkError> {
        let response = self.transact(request)?;
        if response.answers(&request) {
            Ok(response)
        } else {
            Err(unexpected(&request, &response))
        }
    }

    fn get_identity(&mut self) -> Result<Identity, LinkError> {
        let request = Request::Identity;
        match self.exchange(request)? {
            Response::Identity(identity) => Ok(identity),
            other => Err(unexpected(&request, &other)),
        }
    }

    fn set_home_reference(&mut self, req: HomeReferenceRequest) -> Result<(), LinkError> {
        self.exchange(Request::HomeReference(req)).map(|_| ())
    }

    fn set_get_calibration(
        &mut self,
        req: CalibrationRequest,
    ) -> Result<CalibrationResponse, LinkError> {
        let request = Request::Calibration(req);
        match self.exchange(request)? {
            Response::Calibration(rsp) => Ok(rsp),
            other => Err(unexpected(&request, &other)),
        }
    }

    fn set_algorithm(&mut self, id: AlgorithmId) -> Result<(), LinkError> {
        self.exchange(Request::Algorithm(id)).map(|_| ())
    }

    fn get_raw_attitude(&mut self) -> Result<RawAttitudeResponse, LinkError> {
        let request = Request::RawAttitude;
        match self.exchange(request)? {
            Response::RawAttitude(raw) => Ok(raw),
            other => Err(unexpected(&request, &other)),
        }
    }

    fn set_get_fused_update(
        &mut self,
        req: FusedUpdateRequest,
    ) -> Result<FusedUpdateResponse, LinkError> {
        let request = Request::FusedUpdate(req);
        match self.exchange(request)? {
            Response::FusedUpdate(rsp) => Ok(rsp),
            other => Err(unexpected(&request, &other)),
        }
    }
}

impl<T: AhrsTransport + ?Sized> AhrsTransport for Box<T> {
    fn resync(&mut self) -> Result<(), LinkError> {
        (**self).resync()
    }

    fn transact(&mut self, request: Request) -> Result<Response, LinkError> {
        (**self).transact(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 总是回 Ack 的传输
    struct AckOnly;

    impl AhrsTransport for AckOnly {
        fn resync(&mut self) -> Result<(), LinkError> {
            Ok(())
        }

        fn transact(&mut self, _request: Request) -> Result<Response, LinkError> {
            Ok(Response::Ack)
        }
    }

    #[test]
    fn test_ack_accepted_for_home_and_algorithm() {
        let mut link = AckOnly;
        assert!(
            link.set_home_reference(HomeReferenceRequest { be: [1.0, 0.0, 0.0] })
                .is_ok()
        );
        assert!(link.set_algorithm(AlgorithmId::Simple).is_ok());
    }

    #[test]
    fn test_mismatched_response_is_link_failure() {
        let mut link = AckOnly;
        match link.get_identity() {
            Err(LinkError::UnexpectedResponse { expected, actual }) => {
                assert_eq!(expected, MessageKind::IdentityResponse);
                assert_eq!(actual, MessageKind::Ack);
            },
            other => panic!("Expected UnexpectedResponse, got {:?}", other),
        }
        assert!(link.get_raw_attitude().is_err());
        assert!(link.set_get_fused_update(FusedUpdateRequest::default()).is_err());
    }

    #[test]
    fn test_boxed_transport() {
        let mut link: Box<dyn AhrsTransport> = Box::new(AckOnly);
        assert!(link.resync().is_ok());
        assert!(link.set_algorithm(AlgorithmId::InsGps).is_ok());
    }

    #[test]
    fn test_link_error_display() {
        let err = LinkError::UnexpectedResponse {
            expected: MessageKind::Ack,
            actual: MessageKind::IdentityResponse,
        };
        let msg = err.to_string();
        assert!(msg.contains("Ack(0x82)"), "{}", msg);
        assert!(msg.contains("IdentityResponse(0x81)"), "{}", msg);

        assert_eq!(LinkError::Timeout.to_string(), "Response timeout");
        assert_eq!(
            LinkError::Rejected(MessageKind::CalibrationRequest).to_string(),
            "Device rejected CalibrationRequest(0x03)"
        );
    }
}
