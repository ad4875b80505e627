//! 消息类型标识
//!
//! 请求与应答各占一段编号：请求 0x01-0x0F，应答 0x81-0x8F。

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MessageKind {
    /// 请求设备身份（序列号）
    IdentityRequest = 0x01,
    /// 下发磁北参考向量
    HomeReferenceRequest = 0x02,
    /// 下发并回读标定参数
    CalibrationRequest = 0x03,
    /// 选择姿态解算算法
    AlgorithmRequest = 0x04,
    /// 请求原始传感器采样
    RawAttitudeRequest = 0x05,
    /// 下发气压/GPS 并取回融合结果
    FusedUpdateRequest = 0x06,

    /// 设备身份应答
    IdentityResponse = 0x81,
    /// 通用确认应答（磁北/算法）
    Ack = 0x82,
    /// 标定回读应答
    CalibrationResponse = 0x83,
    /// 原始采样应答
    RawAttitudeResponse = 0x85,
    /// 融合结果应答
    FusedUpdateResponse = 0x86,
}

impl MessageKind {
    /// 是否为请求类型
    pub fn is_request(self) -> bool {
        u8::from(self) & 0x80 == 0
    }

    /// 请求类型对应的应答类型
    ///
    /// 应答类型调用时返回 `None`。
    pub fn expected_response(self) -> Option<MessageKind> {
        match self {
            Self::IdentityRequest => Some(Self::IdentityResponse),
            Self::HomeReferenceRequest | Self::AlgorithmRequest => Some(Self::Ack),
            Self::CalibrationRequest => Some(Self::CalibrationResponse),
            Self::RawAttitudeRequest => Some(Self::RawAttitudeResponse),
            Self::FusedUpdateRequest => Some(Self::FusedUpdateResponse),
            _ => None,
        }
    }

    /// 从原始字节解析
    pub fn from_raw(raw: u8) -> Result<Self, ProtocolError> {
        Self::try_from(raw).map_err(|_| ProtocolError::UnknownMessageKind(raw))
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02X})", self, u8::from(*self))
    }
}
