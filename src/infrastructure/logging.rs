use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;

/// 错误类型分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// 归档完整性检查失败
    IntegrityCheck,
    /// 列出条目失败
    Listing,
    /// 目录遍历错误
    Walk,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::IntegrityCheck => "integrity-check",
            ErrorType::Listing => "listing",
            ErrorType::Walk => "walk",
        }
    }
}

/// 日志记录器trait
pub trait LoggerTrait: Send + Sync {
    fn is_enabled(&self) -> bool;
    fn log_message(&self, message: &str) -> Result<()>;
    fn log_archive(&self, path: &Path, status: &str) -> Result<()>;
    fn log_error(&self, error_type: ErrorType, path: Option<&Path>, message: &str) -> Result<()>;
    fn finalize(&self, summary: &RunSummary, duration: Duration) -> Result<()>;
}

/// 一次运行的统计，只写入日志文件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total_archives: u64,
    pub matched_archives: u64,
    pub total_matches: u64,
    pub skipped_archives: u64,
}

/// 诊断日志记录器
pub struct Logger {
    log_file: Arc<Mutex<Option<File>>>,
    enabled: bool,
    error_counts: Mutex<HashMap<ErrorType, usize>>,
}

impl Logger {
    /// 不写任何文件的记录器
    pub fn disabled() -> Self {
        Self {
            log_file: Arc::new(Mutex::new(None)),
            enabled: false,
            error_counts: Mutex::new(HashMap::new()),
        }
    }

    /// 创建新的日志记录器，日志文件写到 `log_dir` 下
    pub fn new(enabled: bool, log_dir: &Path) -> Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }

        // 获取当前时间作为文件名的一部分
        let now = Local::now();
        let timestamp = now.format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("find-in-archives_{}.log", timestamp));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("cannot create log file {}", log_path.display()))?;

        writeln!(file, "# find-in-archives log")?;
        writeln!(file, "# started: {}", now.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(file, "# --------------------------------------------")?;

        Ok(Self {
            log_file: Arc::new(Mutex::new(Some(file))),
            enabled: true,
            error_counts: Mutex::new(HashMap::new()),
        })
    }

    /// 各类错误的次数
    pub fn error_summary(&self) -> HashMap<ErrorType, usize> {
        self.error_counts
            .lock()
            .map(|counts| counts.clone())
            .unwrap_or_default()
    }

    fn write_line(&self, line: &str) -> Result<()> {
        if let Ok(mut file_guard) = self.log_file.lock() {
            if let Some(ref mut file) = *file_guard {
                let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                writeln!(file, "[{}] {}", timestamp, line)?;
                file.flush()?;
            }
        }
        Ok(())
    }
}

impl LoggerTrait for Logger {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn log_message(&self, message: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.write_line(message)
    }

    fn log_archive(&self, path: &Path, status: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.write_line(&format!("archive: {} | status: {}", path.display(), status))
    }

    fn log_error(&self, error_type: ErrorType, path: Option<&Path>, message: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if let Ok(mut counts) = self.error_counts.lock() {
            *counts.entry(error_type).or_insert(0) += 1;
        }

        match path {
            Some(path) => self.write_line(&format!(
                "error({}): {} | {}",
                error_type.as_str(),
                path.display(),
                message
            )),
            None => self.write_line(&format!("error({}): {}", error_type.as_str(), message)),
        }
    }

    fn finalize(&self, summary: &RunSummary, duration: Duration) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let errors = self.error_summary();

        if let Ok(mut file_guard) = self.log_file.lock() {
            if let Some(ref mut file) = *file_guard {
                writeln!(file, "# --------------------------------------------")?;
                writeln!(file, "# finished: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
                writeln!(file, "# elapsed: {:.3}s", duration.as_secs_f64())?;
                writeln!(file, "# archives scanned: {}", summary.total_archives)?;
                writeln!(file, "# archives matched: {}", summary.matched_archives)?;
                writeln!(file, "# matching entries: {}", summary.total_matches)?;
                writeln!(file, "# archives skipped: {}", summary.skipped_archives)?;
                for (error_type, count) in &errors {
                    writeln!(file, "#   {} errors: {}", error_type.as_str(), count)?;
                }
                file.flush()?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    /// 目录下唯一的日志文件
    fn only_log_file(dir: &Path) -> PathBuf {
        let files: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        files.into_iter().next().unwrap()
    }

    #[test]
    fn test_logger_creation() {
        let logger = Logger::new(false, Path::new(".")).unwrap();
        assert!(!logger.is_enabled());

        let temp = tempdir().unwrap();
        let logger = Logger::new(true, temp.path()).unwrap();
        assert!(logger.is_enabled());
        let name = only_log_file(temp.path());
        let name = name.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("find-in-archives_"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_disabled_logger_writes_nothing() {
        let logger = Logger::disabled();
        logger.log_error(ErrorType::Listing, None, "ignored").unwrap();
        assert!(logger.error_summary().is_empty());
    }

    #[test]
    fn test_error_logging_and_finalize() {
        let temp = tempdir().unwrap();
        let logger = Logger::new(true, temp.path()).unwrap();
        let logger_trait: &dyn LoggerTrait = &logger;

        logger_trait
            .log_error(ErrorType::Listing, Some(Path::new("bad.jar")), "corrupt")
            .unwrap();
        logger_trait.log_archive(Path::new("good.jar"), "matched").unwrap();
        logger_trait
            .finalize(
                &RunSummary {
                    total_archives: 2,
                    matched_archives: 1,
                    total_matches: 3,
                    skipped_archives: 1,
                },
                Duration::from_millis(20),
            )
            .unwrap();

        assert_eq!(logger.error_summary().get(&ErrorType::Listing), Some(&1));

        let content = std::fs::read_to_string(only_log_file(temp.path())).unwrap();
        assert!(content.contains("error(listing): bad.jar | corrupt"));
        assert!(content.contains("archive: good.jar | status: matched"));
        assert!(content.contains("# archives scanned: 2"));
    }

    #[test]
    fn test_error_types() {
        assert_eq!(ErrorType::IntegrityCheck.as_str(), "integrity-check");
        assert_eq!(ErrorType::Walk.as_str(), "walk");
    }
}
