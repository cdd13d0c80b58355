//! Owo Clicker: 拟人化点击回放 (Linux/X11)
//!
//! 架构:
//! - intervals: 间隔数据集 (载入/保存/打乱)
//! - kde: 高斯核密度估计 + 拒绝采样
//! - humanizer: 点击间隔与按压时长
//! - player: 回放状态机
//! - recorder: 录制状态机
//! - input: X11 状态查询 + 点击注入
//! - dialog: 文件选择
//! - timing: 忙等计时 + 取消标志

mod config;
mod dialog;
mod error;
mod humanizer;
mod input;
mod intervals;
mod kde;
mod player;
mod recorder;
mod timing;

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::ClickerError;
use crate::humanizer::Humanizer;
use crate::input::X11Engine;
use crate::intervals::IntervalSet;
use crate::kde::KdeSampler;
use crate::player::Player;
use crate::recorder::Recorder;
use crate::timing::{CancelToken, SignalRouter};

const BANNER: &str = r" _____
|     |_ _ _ ___
|  |  | | | | . |
|_____|_____|___|
";

#[tokio::main]
async fn main() -> Result<()> {
    // 日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "owo_clicker=info".into()),
        )
        .init();

    info!("🚀 Owo Clicker v{} 启动中...", env!("CARGO_PKG_VERSION"));

    // ① 配置
    let config = Config::load()?;

    // ② X11 输入引擎
    let mut engine = X11Engine::new(config.inject)?;

    // ③ Ctrl+C: 回放中停止回放, 其他时候退出进程
    let signals = SignalRouter::new();
    let _listener = signals.listen_ctrl_c();
    let cancel = CancelToken::new();

    // ④ 主菜单
    loop {
        println!("{BANNER}");
        println!("1. 点击回放");
        println!("2. 点击录制");
        println!("3. 退出");
        let Some(choice) = prompt("请选择: ")? else {
            break;
        };
        match choice.as_str() {
            "1" => engine = play(engine, &config, &signals, &cancel).await?,
            "2" => engine = record(engine, &config).await?,
            "3" => break,
            _ => println!("无效选项。"),
        }
    }

    info!("👋 已退出");
    Ok(())
}

/// 打印提示并读取一行, EOF 返回 None
fn prompt(text: &str) -> Result<Option<String>> {
    print!("{text}");
    io::stdout().flush()?;
    let mut line = String::new();
    let n = io::stdin().lock().read_line(&mut line)?;
    Ok((n > 0).then(|| line.trim().to_string()))
}

fn report(err: ClickerError) {
    if matches!(err, ClickerError::DialogCanceled) {
        warn!("{err}");
    } else {
        error!("❌ {err}");
    }
}

// =====================================================================
// 回放
// =====================================================================

async fn play(
    engine: X11Engine,
    config: &Config,
    signals: &SignalRouter,
    cancel: &CancelToken,
) -> Result<X11Engine> {
    let mut set = match dialog::select_file_for_read().and_then(|p| IntervalSet::load(&p)) {
        Ok(set) => set,
        Err(e) => {
            report(e);
            return Ok(engine);
        }
    };
    println!("间隔已载入: {} 个", set.len());
    println!("文件平均间隔 {:.2}ms, 平均 CPS {:.2}", set.mean(), set.cps());

    let confirmed = prompt("是否使用该文件? (Y/N): ")?
        .is_some_and(|a| a.eq_ignore_ascii_case("y"));
    if !confirmed {
        println!("未选择该文件。");
        return Ok(engine);
    }

    set.shuffle();
    let sampler = match KdeSampler::new(set, config.bandwidth, config.max_attempts) {
        Ok(s) => s,
        Err(e) => {
            report(e);
            return Ok(engine);
        }
    };
    let (lo, hi) = sampler.bounds();
    info!("📈 采样区间 {lo:.2}..{hi:.2}ms, 带宽 {}", config.bandwidth);
    let humanizer = Humanizer::new(sampler, config.hold_min_ms, config.hold_max_ms);
    let matcher = config.target.clone();
    let idle_poll = config.idle_poll();
    let token = cancel.clone();

    // guard 存活期间 Ctrl+C 只停止回放
    let _guard = signals.arm(cancel);
    println!("回放就绪。按 Ctrl+C 返回菜单。");

    let (engine, result) = tokio::task::spawn_blocking(move || {
        let mut engine = engine;
        let result = Player::new(&mut engine, humanizer, matcher, token, idle_poll).run();
        (engine, result)
    })
    .await
    .context("回放任务异常退出")?;

    if let Err(e) = result {
        error!("❌ 回放中断: {e:#}");
    }
    Ok(engine)
}

// =====================================================================
// 录制
// =====================================================================

async fn record(engine: X11Engine, config: &Config) -> Result<X11Engine> {
    println!("点击任意位置开始录制。按住 Shift 保存录制。");
    let ceiling = config.accept_ceiling_ms;
    let poll = config.idle_poll();

    let (engine, result) = tokio::task::spawn_blocking(move || {
        let mut engine = engine;
        let result = Recorder::new(ceiling).record_session(&mut engine, poll);
        (engine, result)
    })
    .await
    .context("录制任务异常退出")?;

    let delays = match result {
        Ok(delays) => delays,
        Err(e) => {
            error!("❌ 录制中断: {e:#}");
            return Ok(engine);
        }
    };
    if delays.is_empty() {
        warn!("没有录制到任何间隔, 不保存");
        return Ok(engine);
    }

    let saved = dialog::select_file_for_write()
        .and_then(|path| intervals::save(&path, &delays).map(|()| path));
    match saved {
        Ok(path) => println!("录制已保存到 {}。", path.display()),
        Err(e) => report(e),
    }
    Ok(engine)
}
