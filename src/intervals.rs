//! 点击间隔数据集
//!
//! 文件格式: 单行逗号分隔的毫秒数, 无表头, 无转义。
//! `IntervalSet` 保证非空, 顺序为载入顺序, 可原地打乱。

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ClickerError, ClickerResult};

// =====================================================================
// IntervalSet
// =====================================================================

/// 非空的间隔样本集 (ms)
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalSet {
    samples: Vec<f64>,
}

impl IntervalSet {
    /// 空集合视为错误, 而不是退化分布
    pub fn new(samples: Vec<f64>) -> ClickerResult<Self> {
        if samples.is_empty() {
            return Err(ClickerError::EmptySampleSet);
        }
        Ok(Self { samples })
    }

    /// 从文件载入
    pub fn load(path: &Path) -> ClickerResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ClickerError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let set = Self::new(parse(&text)?)?;
        info!("📂 载入 {} 个间隔: {}", set.len(), path.display());
        Ok(set)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// 平均间隔 (ms)
    pub fn mean(&self) -> f64 {
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// 平均每秒点击数
    pub fn cps(&self) -> f64 {
        1000.0 / self.mean()
    }

    /// 真实的最小/最大值
    pub fn range(&self) -> (f64, f64) {
        self.samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// 原地打乱 (每次从系统熵源重新播种)
    pub fn shuffle(&mut self) {
        let mut rng = StdRng::from_entropy();
        self.shuffle_with(&mut rng);
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.samples.shuffle(rng);
        debug!("🔀 已打乱 {} 个间隔", self.samples.len());
    }
}

// =====================================================================
// 读写
// =====================================================================

/// 解析逗号分隔文本; 任何非法 token 都是硬错误
pub fn parse(text: &str) -> ClickerResult<Vec<f64>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .enumerate()
        .map(|(index, raw)| {
            let token = raw.trim();
            match token.parse::<f64>() {
                Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
                _ => Err(ClickerError::Parse {
                    index,
                    token: token.to_string(),
                }),
            }
        })
        .collect()
}

/// 格式化为单行, 元素之间用逗号分隔
pub fn format(delays: &[f64]) -> String {
    delays
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// 整体写出, 不保证原子性
pub fn save(path: &Path, delays: &[f64]) -> ClickerResult<()> {
    fs::write(path, format(delays)).map_err(|source| ClickerError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    info!("💾 已保存 {} 个间隔: {}", delays.len(), path.display());
    Ok(())
}
