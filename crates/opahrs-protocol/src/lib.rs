//! # OpenPilot AHRS Protocol
//!
//! 飞控与 AHRS 协处理器之间请求/应答链路的消息定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 消息类型标识
//! - `constants`: 协议常量定义
//! - `messages`: 请求/应答负载（每种消息一个带标签的变体）
//! - `attitude`: 四元数与欧拉角换算
//! - `geo`: 大地坐标 → ECEF → NED 换算
//!
//! ## 设计
//!
//! 链路严格为一问一答，不支持流水线。每个请求变体都有唯一对应的应答变体，
//! 见 [`MessageKind::expected_response`]。

pub mod attitude;
pub mod constants;
pub mod geo;
pub mod ids;
pub mod messages;

// 重新导出常用类型
pub use attitude::*;
pub use constants::*;
pub use geo::*;
pub use ids::*;
pub use messages::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Unknown message kind: 0x{0:02X}")]
    UnknownMessageKind(u8),

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: i32 },
}
