use std::fs;
use std::path::{Path, PathBuf};

use crate::application::config::normalize_extension;
use crate::domain::MatchMode;
use crate::error::FindError;

/// 输出模式 (三者互斥)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// 每个匹配条目输出一行 `<归档><分隔符><条目>`
    #[default]
    Detail,
    /// 只输出包含匹配条目的归档
    FilesWithMatches,
    /// 只输出不包含匹配条目的归档
    FilesWithoutMatch,
}

/// 构建 [`SearchConfiguration`] 的原始输入
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub dirs: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub pattern: String,
    pub match_mode: MatchMode,
    pub ignore_case: bool,
    pub separator: String,
    pub absolute_path: bool,
    pub output_mode: OutputMode,
    pub show_progress: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            dirs: vec![PathBuf::from(".")],
            extensions: vec!["jar".to_string()],
            pattern: String::new(),
            match_mode: MatchMode::default(),
            ignore_case: false,
            separator: "!".to_string(),
            absolute_path: false,
            output_mode: OutputMode::default(),
            show_progress: true,
        }
    }
}

/// 一次查找的完整配置，构建时校验，之后只读
#[derive(Debug, Clone)]
pub struct SearchConfiguration {
    dirs: Vec<PathBuf>,
    extensions: Vec<String>,
    pattern: String,
    match_mode: MatchMode,
    ignore_case: bool,
    separator: String,
    absolute_path: bool,
    output_mode: OutputMode,
    show_progress: bool,
}

impl SearchConfiguration {
    /// 校验输入并构建配置
    ///
    /// 每个目录必须存在、是目录并且可读，否则立即失败。
    pub fn new(options: SearchOptions) -> Result<Self, FindError> {
        let mut dirs: Vec<PathBuf> = Vec::with_capacity(options.dirs.len());
        for dir in options.dirs {
            check_dir(&dir)?;
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        if dirs.is_empty() {
            dirs.push(PathBuf::from("."));
            check_dir(&dirs[0])?;
        }

        let mut extensions: Vec<String> = Vec::new();
        for ext in &options.extensions {
            let ext = normalize_extension(ext);
            if ext.is_empty() {
                return Err(FindError::Usage("extension must not be empty".into()));
            }
            if !extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
                extensions.push(ext);
            }
        }
        if extensions.is_empty() {
            extensions.push("jar".to_string());
        }

        if options.separator.is_empty() {
            return Err(FindError::Usage("separator must not be empty".into()));
        }

        Ok(Self {
            dirs,
            extensions,
            pattern: options.pattern,
            match_mode: options.match_mode,
            ignore_case: options.ignore_case,
            separator: options.separator,
            absolute_path: options.absolute_path,
            output_mode: options.output_mode,
            show_progress: options.show_progress,
        })
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn absolute_path(&self) -> bool {
        self.absolute_path
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn show_progress(&self) -> bool {
        self.show_progress
    }
}

fn check_dir(dir: &Path) -> Result<(), FindError> {
    if !dir.exists() {
        return Err(FindError::DirNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(FindError::NotADirectory(dir.to_path_buf()));
    }
    if fs::read_dir(dir).is_err() {
        return Err(FindError::DirNotReadable(dir.to_path_buf()));
    }
    Ok(())
}
