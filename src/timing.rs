//! 计时与取消
//!
//! `spin_wait` 是忙等: 每轮读取单调时钟, 不 sleep 也不 yield,
//! 等待期间会占满一个核心, 换取亚毫秒级的点击时间精度。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 忙等指定时长
pub fn spin_wait(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

/// 忙等指定毫秒数 (负数/NaN 视为 0)
pub fn spin_wait_ms(ms: f64) {
    spin_wait(ms_to_duration(ms));
}

pub fn ms_to_duration(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_nanos((ms * 1e6).round() as u64)
    } else {
        Duration::ZERO
    }
}

// =====================================================================
// CancelToken
// =====================================================================

/// 回放取消标志 (跨线程可见)
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

// =====================================================================
// SignalRouter
// =====================================================================

/// Ctrl+C 的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRoute {
    /// 回放中: 只设置取消标志
    Cancelled,
    /// 其他时候: 按默认行为退出进程
    Exit,
}

/// 进程内唯一的 Ctrl+C 监听者
///
/// 回放期间通过 `arm` 把信号转给取消标志, guard 释放后恢复为退出进程。
#[derive(Debug, Clone, Default)]
pub struct SignalRouter {
    armed: Arc<Mutex<Option<CancelToken>>>,
}

impl SignalRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.armed.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 绑定取消标志 (先复位), guard 释放时解绑并复位
    pub fn arm(&self, token: &CancelToken) -> CancelGuard {
        token.reset();
        *self.slot() = Some(token.clone());
        CancelGuard {
            router: self.clone(),
            token: token.clone(),
        }
    }

    /// 处理一次信号
    pub fn dispatch(&self) -> SignalRoute {
        match self.slot().as_ref() {
            Some(token) => {
                token.cancel();
                SignalRoute::Cancelled
            }
            None => SignalRoute::Exit,
        }
    }

    /// 启动常驻监听任务 (需要在 tokio 运行时内调用)
    pub fn listen_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let router = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Ctrl+C 监听失败: {e}");
                    return;
                }
                match router.dispatch() {
                    SignalRoute::Cancelled => debug!("收到 Ctrl+C, 请求停止回放"),
                    SignalRoute::Exit => {
                        info!("👋 收到 Ctrl+C, 退出");
                        std::process::exit(130);
                    }
                }
            }
        })
    }
}

/// 取消处理器的作用域
pub struct CancelGuard {
    router: SignalRouter,
    token: CancelToken,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        *self.router.slot() = None;
        self.token.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spin_wait_blocks_at_least_requested() {
        let start = Instant::now();
        spin_wait(Duration::from_millis(3));
        assert!(start.elapsed() >= Duration::from_millis(3));
    }

    #[test]
    fn test_ms_to_duration_clamps_invalid() {
        assert_eq!(ms_to_duration(-5.0), Duration::ZERO);
        assert_eq!(ms_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(ms_to_duration(1.5), Duration::from_micros(1500));
    }

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
        other.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_armed_router_cancels_token() {
        let router = SignalRouter::new();
        let token = CancelToken::new();
        token.cancel();

        let _guard = router.arm(&token);
        assert!(!token.is_cancelled(), "arm should reset a stale flag");
        assert_eq!(router.dispatch(), SignalRoute::Cancelled);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_signal_after_guard_drop_exits_instead_of_cancelling() {
        let router = SignalRouter::new();
        let token = CancelToken::new();
        {
            let _guard = router.arm(&token);
            token.cancel();
        }
        assert!(!token.is_cancelled());

        assert_eq!(router.dispatch(), SignalRoute::Exit);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_unarmed_router_exits() {
        assert_eq!(SignalRouter::new().dispatch(), SignalRoute::Exit);
    }

    #[test]
    fn test_rearm_after_drop() {
        let router = SignalRouter::new();
        let token = CancelToken::new();
        drop(router.arm(&token));
        let _guard = router.arm(&token);
        assert_eq!(router.dispatch(), SignalRoute::Cancelled);
    }
}
