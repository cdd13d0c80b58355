//! 拟人化引擎
//!
//! 点击间隔来自录制数据的 KDE 采样,
//! 按压时长在固定短区间内均匀分布。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::kde::KdeSampler;

/// 拟人化参数引擎
pub struct Humanizer {
    /// 点击间隔采样器 (ms)
    sampler: KdeSampler,

    /// 点击按压时长区间 (均匀分布, ms)
    click_hold_min: f64,
    click_hold_max: f64,

    rng: StdRng,
}

impl Humanizer {
    pub fn new(sampler: KdeSampler, click_hold_min: f64, click_hold_max: f64) -> Self {
        Self {
            sampler,
            click_hold_min,
            click_hold_max,
            rng: StdRng::from_entropy(),
        }
    }

    /// 生成下一次按下前的等待间隔
    pub fn click_interval(&mut self) -> f64 {
        self.sampler.sample()
    }

    /// 生成点击按压时长 (默认 0.5-7ms)
    pub fn click_hold_duration(&mut self) -> f64 {
        if self.click_hold_max <= self.click_hold_min {
            return self.click_hold_min;
        }
        self.rng.gen_range(self.click_hold_min..self.click_hold_max)
    }
}
