//! 错误类型
//!
//! 间隔文件读写、采样参数与文件选择相关的错误。
//! 所有错误都会回到主菜单, 不会终止进程。

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ClickerError {
    /// 源文件/目标文件无法打开 (读写两侧共用)
    #[error("无法打开文件 {}: {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 数值无法解析 (index 从 0 开始)
    #[error("第 {index} 个间隔无法解析: {token:?}")]
    Parse { index: usize, token: String },

    /// 没有任何间隔数据
    #[error("文件中没有间隔数据")]
    EmptySampleSet,

    /// 用户取消了文件选择
    #[error("文件选择已取消")]
    DialogCanceled,

    /// 文件选择器本身出错 (非取消)
    #[error("文件选择器出错: {0}")]
    Dialog(String),

    /// 带宽必须为正数
    #[error("带宽必须大于 0, 实际: {0}")]
    InvalidBandwidth(f64),
}

pub type ClickerResult<T> = std::result::Result<T, ClickerError>;
