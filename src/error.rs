use std::path::PathBuf;

use thiserror::Error;

/// 致命错误 (整个运行中止)
///
/// 单个归档文件的读取失败不属于这里，它们只会产生警告。
#[derive(Debug, Error)]
pub enum FindError {
    /// 命令行用法错误
    #[error("{0}")]
    Usage(String),

    #[error("directory {} does NOT exist!", .0.display())]
    DirNotFound(PathBuf),

    #[error("{} exists but is NOT a directory!", .0.display())]
    NotADirectory(PathBuf),

    #[error("directory {} exists but is NOT readable!", .0.display())]
    DirNotReadable(PathBuf),

    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// 所有根目录下都没有找到任何候选归档
    #[error("No {extensions} file found!")]
    NoArchiveFound { extensions: String },

    #[error("NOT found command to list zip entries: {tried}!")]
    NoListingTool { tried: String },

    /// JAVA_HOME 下的 jar 存在但不可执行
    #[error("found {} but it is NOT executable! Please check the JAVA_HOME setting.", .0.display())]
    JarNotExecutable(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FindError {
    /// 进程退出码
    pub fn exit_code(&self) -> i32 {
        // 未知选项 (退出码 2) 由 clap 直接处理，这里的错误一律为 1
        1
    }
}
