//! 点击录制
//!
//! 状态机: WaitingFirstClick → WaitingNextClick → Save
//!
//! 每次检测到左键按下 (等待松开后才重新计数) 计算与上次按下的间隔,
//! 不超过上限的间隔写入日志, 超过的丢弃。按住 Shift 结束录制。

use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::input::InputBackend;
use crate::timing::spin_wait;

/// 默认接受上限 (ms)
pub const DEFAULT_ACCEPT_CEILING_MS: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    WaitingFirstClick,
    WaitingNextClick,
    Save,
}

/// 单次按下的处理结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PressOutcome {
    /// 第一次按下, 只记录时间
    Started,
    Accepted(f64),
    /// 间隔过长, 已丢弃
    Rejected(f64),
}

// =====================================================================
// Recorder
// =====================================================================

pub struct Recorder {
    state: RecorderState,
    ceiling_ms: f64,
    last_press: Option<Instant>,
    delays: Vec<f64>,
}

impl Recorder {
    pub fn new(ceiling_ms: f64) -> Self {
        Self {
            state: RecorderState::WaitingFirstClick,
            ceiling_ms,
            last_press: None,
            delays: Vec::new(),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn delays(&self) -> &[f64] {
        &self.delays
    }

    /// 处理一次按下沿
    pub fn on_press(&mut self, at: Instant) -> PressOutcome {
        let outcome = match self.last_press {
            None => {
                self.state = RecorderState::WaitingNextClick;
                info!("⏺️ 开始录制...");
                PressOutcome::Started
            }
            Some(prev) => {
                let delay = at.saturating_duration_since(prev).as_secs_f64() * 1000.0;
                if delay <= self.ceiling_ms {
                    self.delays.push(delay);
                    info!("✅ 记录间隔: {delay:.3}ms");
                    PressOutcome::Accepted(delay)
                } else {
                    warn!("间隔过长 ({delay:.3}ms), 忽略");
                    PressOutcome::Rejected(delay)
                }
            }
        };
        // 无论接受与否都更新上次按下时间
        self.last_press = Some(at);
        outcome
    }

    /// 结束录制, 交出日志
    pub fn finish(mut self) -> Vec<f64> {
        self.state = RecorderState::Save;
        info!("⏹️ 录制结束 ({:?}), 共 {} 个间隔", self.state(), self.delays().len());
        self.delays
    }

    /// 轮询输入直到按住修饰键
    pub fn record_session<B: InputBackend>(
        mut self,
        backend: &mut B,
        poll: Duration,
    ) -> Result<Vec<f64>> {
        while !backend.modifier_held()? {
            if backend.button_held()? {
                self.on_press(Instant::now());
                // 去抖: 等松开后再重新计数
                while backend.button_held()? {
                    spin_wait(poll);
                }
            }
            spin_wait(poll);
        }
        Ok(self.finish())
    }
}
