//! 链路管理配置
//!
//! 所有字段都有默认值，TOML 中只需写出要覆盖的项：
//!
//! ```toml
//! resync_retry_interval_ms = 50
//!
//! [gps]
//! min_satellites = 8
//! ```

use crate::error::CommsError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// GPS 质量门限
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsGateConfig {
    /// 可用定位所需的最少卫星数
    pub min_satellites: i8,
    /// PDOP 上限（严格小于）
    pub max_pdop: f32,
    /// 连续可用定位达到该次数后才下发位置
    pub hysteresis_limit: u32,
}

impl Default for GpsGateConfig {
    fn default() -> Self {
        Self {
            min_satellites: 7,
            max_pdop: 3.5,
            hysteresis_limit: 30,
        }
    }
}

/// 链路管理配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// resync 失败后的重试间隔（毫秒）
    pub resync_retry_interval_ms: u64,
    pub gps: GpsGateConfig,
    /// 每个事件订阅通道的容量
    pub event_capacity: usize,
    /// 链路线程使用实时优先级（需要 `realtime` feature）
    pub realtime_priority: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            resync_retry_interval_ms: 100,
            gps: GpsGateConfig::default(),
            event_capacity: 64,
            realtime_priority: false,
        }
    }
}

impl LinkConfig {
    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(text: &str) -> Result<Self, CommsError> {
        let config: LinkConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载并校验
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CommsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), CommsError> {
        if self.resync_retry_interval_ms == 0 {
            return Err(CommsError::InvalidConfig(
                "resync_retry_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.gps.hysteresis_limit == 0 {
            return Err(CommsError::InvalidConfig(
                "gps.hysteresis_limit must be greater than 0".to_string(),
            ));
        }
        if self.gps.max_pdop.is_nan() || self.gps.max_pdop <= 0.0 {
            return Err(CommsError::InvalidConfig(format!(
                "gps.max_pdop must be positive, got {}",
                self.gps.max_pdop
            )));
        }
        Ok(())
    }

    pub fn resync_retry_interval(&self) -> Duration {
        Duration::from_millis(self.resync_retry_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LinkConfig::default();
        assert_eq!(config.resync_retry_interval(), Duration::from_millis(100));
        assert_eq!(config.gps.min_satellites, 7);
        assert_eq!(config.gps.max_pdop, 3.5);
        assert_eq!(config.gps.hysteresis_limit, 30);
        assert_eq!(config.event_capacity, 64);
        assert!(!config.realtime_priority);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LinkConfig::from_toml_str(
            r#"
            resync_retry_interval_ms = 50

            [gps]
            min_satellites = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.resync_retry_interval_ms, 50);
        assert_eq!(config.gps.min_satellites, 8);
        assert_eq!(config.gps.max_pdop, 3.5);
        assert_eq!(config.gps.hysteresis_limit, 30);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(LinkConfig::from_toml_str("").unwrap(), LinkConfig::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        for text in [
            "resync_retry_interval_ms = 0",
            "[gps]\nhysteresis_limit = 0",
            "[gps]\nmax_pdop = 0.0",
            "[gps]\nmax_pdop = -1.0",
        ] {
            match LinkConfig::from_toml_str(text) {
                Err(CommsError::InvalidConfig(_)) => {},
                other => panic!("Expected InvalidConfig for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_unknown_type_is_parse_error() {
        assert!(matches!(
            LinkConfig::from_toml_str("event_capacity = \"many\""),
            Err(CommsError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            LinkConfig::from_file("/nonexistent/ahrs-link.toml"),
            Err(CommsError::Io(_))
        ));
    }
}
