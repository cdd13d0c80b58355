//! 文件选择
//!
//! 优先调用 zenity 弹出文件对话框; 未安装时回退到终端输入路径。
//! 取消 (zenity 退出码 1 / 空行) 返回 `DialogCanceled`。

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

use crate::error::{ClickerError, ClickerResult};

const DEFAULT_EXT: &str = "txt";

/// 选择要读取的间隔文件
pub fn select_file_for_read() -> ClickerResult<PathBuf> {
    let picked = zenity(&[
        "--file-selection",
        "--title=选择间隔文件",
        "--file-filter=Text files | *.txt",
        "--file-filter=All files | *",
    ])?;
    match picked {
        Some(path) => Ok(path),
        None => prompt_path("间隔文件路径 (留空取消): "),
    }
}

/// 选择录制结果的保存位置, 无扩展名时补 .txt
pub fn select_file_for_write() -> ClickerResult<PathBuf> {
    let picked = zenity(&[
        "--file-selection",
        "--save",
        "--confirm-overwrite",
        "--title=保存录制",
        "--file-filter=Text files | *.txt",
    ])?;
    let path = match picked {
        Some(path) => path,
        None => prompt_path("保存路径 (留空取消): ")?,
    };
    Ok(with_default_extension(path))
}

pub fn with_default_extension(mut path: PathBuf) -> PathBuf {
    if path.extension().is_none() {
        path.set_extension(DEFAULT_EXT);
    }
    path
}

/// `Ok(None)` 表示 zenity 不可用
fn zenity(args: &[&str]) -> ClickerResult<Option<PathBuf>> {
    let output = match Command::new("zenity").args(args).output() {
        Ok(output) => output,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("zenity 未安装, 改用终端输入");
            return Ok(None);
        }
        Err(e) => return Err(ClickerError::Dialog(e.to_string())),
    };
    match output.status.code() {
        Some(0) => {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if path.is_empty() {
                Err(ClickerError::DialogCanceled)
            } else {
                Ok(Some(PathBuf::from(path)))
            }
        }
        Some(1) => Err(ClickerError::DialogCanceled),
        _ => Err(ClickerError::Dialog(format!(
            "zenity 退出异常 ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))),
    }
}

fn prompt_path(prompt: &str) -> ClickerResult<PathBuf> {
    print!("{prompt}");
    io::stdout()
        .flush()
        .map_err(|e| ClickerError::Dialog(e.to_string()))?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| ClickerError::Dialog(e.to_string()))?;
    parse_path_line(&line)
}

fn parse_path_line(line: &str) -> ClickerResult<PathBuf> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ClickerError::DialogCanceled);
    }
    Ok(PathBuf::from(trimmed))
}
