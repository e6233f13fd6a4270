use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::Term;
use ignore::{DirEntry, WalkBuilder};

use crate::error::FindError;
use crate::infrastructure::{ErrorType, LoggerTrait};
use crate::presentation::format_warning;

/// 归档扩展名过滤条件
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    /// 小写的 `.ext` 后缀
    suffixes: Vec<String>,
}

impl ExtensionFilter {
    /// 创建新的扩展名过滤器
    pub fn new(extensions: &[String]) -> Self {
        Self {
            suffixes: extensions
                .iter()
                .map(|ext| format!(".{}", ext.to_lowercase()))
                .collect(),
        }
    }

    /// 文件名是否以任一扩展名结尾 (不区分大小写)
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy().to_lowercase();
        self.suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }

    /// 检查遍历到的条目是否是候选归档
    pub fn should_process(&self, entry: &DirEntry) -> bool {
        entry.file_type().map_or(false, |ft| ft.is_file()) && self.matches(entry.path())
    }
}

/// 查找所有根目录下的候选归档
///
/// 结果按遍历顺序完整收集，调用方在开始处理前就能知道总数。
pub fn discover(
    dirs: &[PathBuf],
    extensions: &[String],
    logger: &Arc<dyn LoggerTrait>,
) -> Result<Vec<PathBuf>, FindError> {
    let filter = ExtensionFilter::new(extensions);
    let colored = Term::stderr().is_term();
    let mut archives = Vec::new();

    for dir in dirs {
        // 不使用任何忽略规则，不跟随符号链接，按目录名排序保证每次运行顺序一致
        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    // 遍历错误不影响其余文件
                    eprintln!("{}", format_warning(&walk_warning(&err), colored));
                    let _ = logger.log_error(ErrorType::Walk, None, &err.to_string());
                    continue;
                }
            };

            if filter.should_process(&entry) {
                archives.push(entry.into_path());
            }
        }
    }

    if archives.is_empty() {
        return Err(FindError::NoArchiveFound {
            extensions: extensions.join("/"),
        });
    }

    let _ = logger.log_message(&format!(
        "found {} archive(s) under {} dir(s)",
        archives.len(),
        dirs.len()
    ));

    Ok(archives)
}

/// 无法遍历的目录或文件的警告文本
fn walk_warning(err: &ignore::Error) -> String {
    format!("fail to walk, ignored: {}", err)
}
