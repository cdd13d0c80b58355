//! 核密度估计 + 拒绝采样
//!
//! 对录制的间隔做高斯核密度估计, 再用拒绝采样生成新的间隔,
//! 使回放的时间分布与录制数据形状一致, 而不是简单重放。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::debug;

use crate::error::{ClickerError, ClickerResult};
use crate::intervals::IntervalSet;

/// 默认拒绝采样上限
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// 高斯核密度: (1 / (n·h·√2π)) · Σ exp(-½((x - sᵢ)/h)²)
///
/// 空样本返回 0, 调用方应先保证非空。
pub fn density(samples: &[f64], x: f64, bandwidth: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples
        .iter()
        .map(|s| {
            let u = (x - s) / bandwidth;
            (-0.5 * u * u).exp()
        })
        .sum();
    sum / (samples.len() as f64 * bandwidth * (2.0 * PI).sqrt())
}

/// 单次采样结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draw {
    pub value: f64,
    pub attempts: u32,
    /// false 表示达到上限, value 为密度最高的候选
    pub accepted: bool,
}

// =====================================================================
// KdeSampler
// =====================================================================

pub struct KdeSampler {
    samples: IntervalSet,
    bandwidth: f64,
    lo: f64,
    hi: f64,
    max_attempts: u32,
    rng: StdRng,
}

impl KdeSampler {
    pub fn new(samples: IntervalSet, bandwidth: f64, max_attempts: u32) -> ClickerResult<Self> {
        Self::with_rng(samples, bandwidth, max_attempts, StdRng::from_entropy())
    }

    pub fn with_rng(
        samples: IntervalSet,
        bandwidth: f64,
        max_attempts: u32,
        rng: StdRng,
    ) -> ClickerResult<Self> {
        if !(bandwidth.is_finite() && bandwidth > 0.0) {
            return Err(ClickerError::InvalidBandwidth(bandwidth));
        }
        // 建议区间取真实 min/max, 与样本顺序无关
        let (lo, hi) = samples.range();
        Ok(Self {
            samples,
            bandwidth,
            lo,
            hi,
            max_attempts: max_attempts.max(1),
            rng,
        })
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    /// 抽取一个间隔 (ms)
    pub fn sample(&mut self) -> f64 {
        self.draw().value
    }

    pub fn draw(&mut self) -> Draw {
        let mut best = (self.lo, f64::NEG_INFINITY);
        for attempt in 1..=self.max_attempts {
            let x = self.lo + self.rng.gen::<f64>() * (self.hi - self.lo);
            let y = self.rng.gen::<f64>();
            let d = density(self.samples.as_slice(), x, self.bandwidth);
            if y < d {
                return Draw { value: x, attempts: attempt, accepted: true };
            }
            if d > best.1 {
                best = (x, d);
            }
        }
        debug!(
            "拒绝采样达到上限 {} 次, 回退到最高密度候选 {:.3}ms",
            self.max_attempts, best.0
        );
        Draw {
            value: best.0,
            attempts: self.max_attempts,
            accepted: false,
        }
    }
}
