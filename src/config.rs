//! 配置
//!
//! 可选 TOML 文件, 查找顺序: `OWO_CLICKER_CONFIG` 环境变量 → `./owo-clicker.toml`。
//! 文件不存在时使用默认值。

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::input::{InjectMode, TargetMatcher};
use crate::kde::DEFAULT_MAX_ATTEMPTS;
use crate::recorder::DEFAULT_ACCEPT_CEILING_MS;
use crate::timing::ms_to_duration;

const CONFIG_ENV: &str = "OWO_CLICKER_CONFIG";
const CONFIG_FILE: &str = "owo-clicker.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 高斯核带宽 (ms)
    pub bandwidth: f64,
    /// 拒绝采样上限
    pub max_attempts: u32,
    /// 按压时长区间 (ms)
    pub hold_min_ms: f64,
    pub hold_max_ms: f64,
    /// 录制时的间隔接受上限 (ms)
    pub accept_ceiling_ms: f64,
    /// 空闲轮询间隔 (ms)
    pub idle_poll_ms: f64,
    pub target: TargetMatcher,
    pub inject: InjectMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bandwidth: 20.0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            hold_min_ms: 0.5,
            hold_max_ms: 7.0,
            accept_ceiling_ms: DEFAULT_ACCEPT_CEILING_MS,
            idle_poll_ms: 1.0,
            target: TargetMatcher::default(),
            inject: InjectMode::default(),
        }
    }
}

impl Config {
    /// 按查找顺序载入
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        if !path.exists() {
            info!("⚙️ 未找到配置文件 {}, 使用默认配置", path.display());
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置失败: {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("配置无效: {}", path.display()))?;
        info!("⚙️ 已载入配置: {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.bandwidth.is_finite() && self.bandwidth > 0.0,
            "bandwidth 必须大于 0, 实际: {}",
            self.bandwidth
        );
        ensure!(
            self.hold_min_ms >= 0.0 && self.hold_min_ms <= self.hold_max_ms,
            "按压时长区间无效: {}..{}",
            self.hold_min_ms,
            self.hold_max_ms
        );
        ensure!(
            self.accept_ceiling_ms > 0.0,
            "accept_ceiling_ms 必须大于 0, 实际: {}",
            self.accept_ceiling_ms
        );
        ensure!(self.max_attempts > 0, "max_attempts 必须大于 0");
        Ok(())
    }

    pub fn idle_poll(&self) -> Duration {
        ms_to_duration(self.idle_poll_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = Config::from_toml("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.bandwidth, 20.0);
        assert_eq!(config.accept_ceiling_ms, 150.0);
        assert_eq!(config.idle_poll(), Duration::from_millis(1));
        assert_eq!(config.inject, InjectMode::SendEvent);
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml(
            r#"
            bandwidth = 8.5
            inject = "xtest"

            [target]
            class = "java"
            title = "Lunar"
            "#,
        )
        .expect("parse");
        assert_eq!(config.bandwidth, 8.5);
        assert_eq!(config.inject, InjectMode::Xtest);
        assert_eq!(config.target.class.as_deref(), Some("java"));
        assert_eq!(config.target.title.as_deref(), Some("Lunar"));
        assert_eq!(config.hold_max_ms, 7.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_toml("bandwidth = 0.0").is_err());
        assert!(Config::from_toml("bandwidth = -2.0").is_err());
        assert!(Config::from_toml("hold_min_ms = 9.0\nhold_max_ms = 2.0").is_err());
        assert!(Config::from_toml("accept_ceiling_ms = 0.0").is_err());
        assert!(Config::from_toml("max_attempts = 0").is_err());
        assert!(Config::from_toml("inject = \"carrier_pigeon\"").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "idle_poll_ms = 2.5\n").unwrap();
        let config = Config::from_file(&path).expect("load");
        assert_eq!(config.idle_poll(), Duration::from_micros(2500));
    }
}
