//! 链路管理层错误类型定义

use ahrs_store::CommErrorKind;
use opahrs_link::LinkError;
use std::fmt;
use thiserror::Error;

/// 会使会话失效的链路步骤（resync 失败只在 `Unsynced` 内重试，不构成步骤失败）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkStep {
    Identity,
    HomeReference,
    Calibration,
    Algorithm,
    RawAttitude,
    FusedUpdate,
}

impl LinkStep {
    /// 该步骤失败时递增的错误计数（握手步骤不计数）
    pub fn error_kind(self) -> Option<CommErrorKind> {
        match self {
            LinkStep::Identity => None,
            LinkStep::HomeReference => Some(CommErrorKind::HomeLocation),
            LinkStep::Calibration => Some(CommErrorKind::Calibration),
            LinkStep::Algorithm => Some(CommErrorKind::Algorithm),
            LinkStep::RawAttitude => Some(CommErrorKind::Attitude),
            LinkStep::FusedUpdate => Some(CommErrorKind::Update),
        }
    }
}

impl fmt::Display for LinkStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkStep::Identity => "identity handshake",
            LinkStep::HomeReference => "home reference push",
            LinkStep::Calibration => "calibration push",
            LinkStep::Algorithm => "algorithm push",
            LinkStep::RawAttitude => "raw attitude exchange",
            LinkStep::FusedUpdate => "fused update exchange",
        };
        f.write_str(name)
    }
}

/// 链路管理层错误类型
#[derive(Error, Debug)]
pub enum CommsError {
    /// 某个步骤的链路故障（会话随即失效）
    #[error("{step} failed: {source}")]
    Step {
        step: LinkStep,
        #[source]
        source: LinkError,
    },

    /// 配置校验失败
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// 配置文件解析失败
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommsError {
    /// 失败的步骤（仅 `Step` 变体）
    pub fn failed_step(&self) -> Option<LinkStep> {
        match self {
            CommsError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}
