//! 点击回放
//!
//! 状态机: Idle → Armed (触发条件满足, 执行一次点击) → Idle,
//! 任意状态收到取消信号 → Stopped。
//!
//! 触发条件: 左键按住 && Shift 未按住 && 光标不可见 && 前台窗口匹配。
//! 取消标志只在两次点击之间检查, 等待过程中不会被打断。

use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info};

use crate::humanizer::Humanizer;
use crate::input::{InputBackend, Target, TargetMatcher};
use crate::timing::{spin_wait, spin_wait_ms, CancelToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Armed,
    Stopped,
}

/// 回放会话统计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackStats {
    pub clicks: u64,
    /// 采样间隔总和 (ms)
    pub interval_total_ms: f64,
}

impl PlaybackStats {
    pub fn mean_interval_ms(&self) -> Option<f64> {
        (self.clicks > 0).then(|| self.interval_total_ms / self.clicks as f64)
    }
}

pub struct Player<'a, B: InputBackend> {
    backend: &'a mut B,
    humanizer: Humanizer,
    matcher: TargetMatcher,
    cancel: CancelToken,
    idle_poll: Duration,
    state: PlayerState,
    stats: PlaybackStats,
}

impl<'a, B: InputBackend> Player<'a, B> {
    pub fn new(
        backend: &'a mut B,
        humanizer: Humanizer,
        matcher: TargetMatcher,
        cancel: CancelToken,
        idle_poll: Duration,
    ) -> Self {
        Self {
            backend,
            humanizer,
            matcher,
            cancel,
            idle_poll,
            state: PlayerState::Idle,
            stats: PlaybackStats::default(),
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// 运行直到取消
    pub fn run(&mut self) -> Result<PlaybackStats> {
        info!("▶️ 回放就绪, 目标: {}", self.matcher);
        while !self.cancel.is_cancelled() {
            while !self.cancel.is_cancelled() {
                let Some(target) = self.armed_target()? else {
                    break;
                };
                self.state = PlayerState::Armed;
                self.click_cycle(&target)?;
                self.state = PlayerState::Idle;
            }
            spin_wait(self.idle_poll);
        }
        self.state = PlayerState::Stopped;

        match self.stats.mean_interval_ms() {
            Some(mean) => info!(
                "⏹️ 回放结束 ({:?}): {} 次点击, 平均间隔 {:.2}ms",
                self.state(),
                self.stats.clicks,
                mean
            ),
            None => info!("⏹️ 回放结束 ({:?}): 没有执行点击", self.state()),
        }
        Ok(self.stats)
    }

    /// 触发条件满足时返回目标窗口
    fn armed_target(&mut self) -> Result<Option<Target>> {
        if !self.backend.button_held()?
            || self.backend.modifier_held()?
            || self.backend.pointer_visible()?
        {
            return Ok(None);
        }
        Ok(self
            .backend
            .foreground_target()?
            .filter(|t| self.matcher.matches(t)))
    }

    /// 等待采样间隔 → 按下 → 按压时长 → 释放
    fn click_cycle(&mut self, target: &Target) -> Result<()> {
        let interval = self.humanizer.click_interval();
        spin_wait_ms(interval);
        self.backend.inject_press(target)?;

        let hold = self.humanizer.click_hold_duration();
        spin_wait_ms(hold);
        self.backend.inject_release(target)?;

        self.stats.clicks += 1;
        self.stats.interval_total_ms += interval;
        debug!("🖱️ click interval={interval:.2}ms hold={hold:.2}ms");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervals::IntervalSet;
    use crate::kde::KdeSampler;

    /// 脚本化输入后端
    #[derive(Default)]
    struct ScriptedBackend {
        button: bool,
        modifier: bool,
        cursor_visible: bool,
        foreground: Option<Target>,
        presses: usize,
        releases: usize,
        /// 第 n 次释放后设置取消标志
        cancel_after_releases: Option<(usize, CancelToken)>,
        /// 按下时若有取消标志, 记录下来
        presses_after_cancel: usize,
        cancel_seen: Option<CancelToken>,
    }

    impl InputBackend for ScriptedBackend {
        fn button_held(&mut self) -> Result<bool> {
            Ok(self.button)
        }
        fn modifier_held(&mut self) -> Result<bool> {
            Ok(self.modifier)
        }
        fn pointer_visible(&mut self) -> Result<bool> {
            Ok(self.cursor_visible)
        }
        fn foreground_target(&mut self) -> Result<Option<Target>> {
            Ok(self.foreground.clone())
        }
        fn inject_press(&mut self, _target: &Target) -> Result<()> {
            if self.cancel_seen.as_ref().is_some_and(|c| c.is_cancelled()) {
                self.presses_after_cancel += 1;
            }
            self.presses += 1;
            Ok(())
        }
        fn inject_release(&mut self, _target: &Target) -> Result<()> {
            self.releases += 1;
            if let Some((n, token)) = &self.cancel_after_releases {
                if self.releases >= *n {
                    token.cancel();
                }
            }
            Ok(())
        }
    }

    fn game_window() -> Target {
        Target {
            window: 0x2c00007,
            class: vec!["Minecraft".into(), "Minecraft".into()],
            title: "Minecraft 1.8.9".into(),
        }
    }

    fn fast_humanizer() -> Humanizer {
        let set = IntervalSet::new(vec![0.2, 0.3, 0.4]).unwrap();
        let sampler = KdeSampler::new(set, 0.05, 1_000).unwrap();
        Humanizer::new(sampler, 0.01, 0.05)
    }

    fn armed_backend() -> ScriptedBackend {
        ScriptedBackend {
            button: true,
            foreground: Some(game_window()),
            ..Default::default()
        }
    }

    #[test]
    fn test_cancel_stops_after_current_cycle() {
        let cancel = CancelToken::new();
        let mut backend = armed_backend();
        backend.cancel_after_releases = Some((3, cancel.clone()));
        backend.cancel_seen = Some(cancel.clone());

        let mut player = Player::new(
            &mut backend,
            fast_humanizer(),
            TargetMatcher::default(),
            cancel.clone(),
            Duration::from_micros(100),
        );
        let stats = player.run().expect("run");
        assert_eq!(player.state(), PlayerState::Stopped);
        assert_eq!(stats.clicks, 3);

        assert_eq!(backend.presses, 3);
        assert_eq!(backend.releases, 3);
        assert_eq!(backend.presses_after_cancel, 0);
    }

    #[test]
    fn test_already_cancelled_never_clicks() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut backend = armed_backend();
        let mut player = Player::new(
            &mut backend,
            fast_humanizer(),
            TargetMatcher::default(),
            cancel,
            Duration::from_micros(100),
        );
        let stats = player.run().expect("run");
        assert_eq!(stats.clicks, 0);
        assert_eq!(stats.mean_interval_ms(), None);
        assert_eq!(backend.presses, 0);
    }

    /// 触发条件不满足时只空转, 由另一线程取消
    fn run_idle(mut backend: ScriptedBackend) -> ScriptedBackend {
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        let stats = Player::new(
            &mut backend,
            fast_humanizer(),
            TargetMatcher::default(),
            cancel,
            Duration::from_micros(200),
        )
        .run()
        .expect("run");
        stopper.join().unwrap();
        assert_eq!(stats.clicks, 0);
        backend
    }

    #[test]
    fn test_trigger_gates() {
        let released = ScriptedBackend { button: false, ..armed_backend() };
        assert_eq!(run_idle(released).presses, 0);

        let shift = ScriptedBackend { modifier: true, ..armed_backend() };
        assert_eq!(run_idle(shift).presses, 0);

        let cursor = ScriptedBackend { cursor_visible: true, ..armed_backend() };
        assert_eq!(run_idle(cursor).presses, 0);

        let other_window = ScriptedBackend {
            foreground: Some(Target {
                window: 1,
                class: vec!["firefox".into()],
                title: "Minecraft".into(),
            }),
            ..armed_backend()
        };
        assert_eq!(run_idle(other_window).presses, 0);

        let no_focus = ScriptedBackend { foreground: None, ..armed_backend() };
        assert_eq!(run_idle(no_focus).presses, 0);
    }

    #[test]
    fn test_stats_mean_interval_within_recorded_range() {
        let cancel = CancelToken::new();
        let mut backend = armed_backend();
        backend.cancel_after_releases = Some((20, cancel.clone()));
        let stats = Player::new(
            &mut backend,
            fast_humanizer(),
            TargetMatcher::default(),
            cancel,
            Duration::from_micros(100),
        )
        .run()
        .expect("run");
        assert_eq!(stats.clicks, 20);
        let mean = stats.mean_interval_ms().unwrap();
        assert!((0.2..=0.4).contains(&mean), "mean {mean}");
    }
}
