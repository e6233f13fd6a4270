use std::io::{self, Write};
use std::path::Path;

use console::{style, Term};

use crate::application::SearchConfiguration;
use crate::domain::EntryMatch;

/// 匹配结果输出
///
/// 详细模式每个匹配条目一行 `<归档><分隔符><条目>`；
/// 仅输出归档名的模式每个归档一行。只有 stdout 是终端时才着色。
#[derive(Debug, Clone)]
pub struct ResultRenderer {
    separator: String,
    absolute_path: bool,
    colored: bool,
}

impl ResultRenderer {
    pub fn new(separator: &str, absolute_path: bool, colored: bool) -> Self {
        Self {
            separator: separator.to_string(),
            absolute_path,
            colored,
        }
    }

    /// 按配置创建，是否着色取决于 stdout 是否是终端
    pub fn from_config(config: &SearchConfiguration) -> Self {
        Self::new(
            config.separator(),
            config.absolute_path(),
            Term::stdout().is_term(),
        )
    }

    /// 输出用的归档路径
    ///
    /// 绝对路径只做词法上的补全，不解析符号链接。
    pub fn display_path(&self, archive: &Path) -> String {
        if self.absolute_path {
            if let Ok(absolute) = std::path::absolute(archive) {
                return absolute.display().to_string();
            }
        }
        archive.display().to_string()
    }

    /// 输出一个匹配条目
    pub fn write_match<W: Write>(
        &self,
        out: &mut W,
        archive: &str,
        found: &EntryMatch<'_>,
    ) -> io::Result<()> {
        if !self.colored {
            return writeln!(out, "{}{}{}", archive, self.separator, found.entry);
        }

        write!(
            out,
            "{}{}",
            style(archive).magenta().force_styling(true),
            style(&self.separator).cyan().force_styling(true)
        )?;

        // 高亮匹配部分
        let entry = found.entry;
        match (
            entry.get(..found.span.start),
            entry.get(found.span.clone()),
            entry.get(found.span.end..),
        ) {
            (Some(before), Some(matched), Some(after)) if !matched.is_empty() => writeln!(
                out,
                "{}{}{}",
                before,
                style(matched).red().bold().force_styling(true),
                after
            ),
            _ => writeln!(out, "{}", entry),
        }
    }

    /// 输出一个归档路径
    pub fn write_archive<W: Write>(&self, out: &mut W, archive: &str) -> io::Result<()> {
        if self.colored {
            writeln!(out, "{}", style(archive).magenta().force_styling(true))
        } else {
            writeln!(out, "{}", archive)
        }
    }
}

/// 致命错误消息
pub fn format_error(message: &str, colored: bool) -> String {
    if colored {
        format!("{} {}", style("Error:").red().bold().force_styling(true), message)
    } else {
        format!("Error: {}", message)
    }
}

/// 可跳过的问题 (单个归档、无法遍历的目录) 的警告消息
pub fn format_warning(message: &str, colored: bool) -> String {
    if colored {
        format!("{} {}", style("Warning:").yellow().force_styling(true), message)
    } else {
        format!("Warning: {}", message)
    }
}

/// 把致命错误写到 stderr
pub fn print_error(message: &str) {
    eprintln!("{}", format_error(message, Term::stderr().is_term()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(entry: &str, span: std::ops::Range<usize>) -> EntryMatch<'_> {
        EntryMatch { entry, span }
    }

    #[test]
    fn test_plain_match_line() {
        let renderer = ResultRenderer::new("!", false, false);
        let mut out = Vec::new();
        renderer
            .write_match(&mut out, "lib/a.jar", &found("log4j.properties", 0..5))
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "lib/a.jar!log4j.properties\n");
    }

    #[test]
    fn test_custom_separator() {
        let renderer = ResultRenderer::new(" :: ", false, false);
        let mut out = Vec::new();
        renderer
            .write_match(&mut out, "a.jar", &found("x.class", 0..1))
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a.jar :: x.class\n");
    }

    #[test]
    fn test_colored_match_line() {
        let renderer = ResultRenderer::new("!", false, true);
        let mut out = Vec::new();
        renderer
            .write_match(&mut out, "a.jar", &found("com/Foo.class", 4..7))
            .unwrap();
        let line = String::from_utf8(out).unwrap();

        assert!(line.contains("\x1b["));
        assert_eq!(console::strip_ansi_codes(&line), "a.jar!com/Foo.class\n");
    }

    #[test]
    fn test_archive_line() {
        let mut out = Vec::new();
        ResultRenderer::new("!", false, false)
            .write_archive(&mut out, "lib/b.jar")
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "lib/b.jar\n");
    }

    #[test]
    fn test_absolute_path_relativizes_back() {
        let renderer = ResultRenderer::new("!", true, false);
        let shown = renderer.display_path(Path::new("lib/a.jar"));
        let cwd = std::env::current_dir().unwrap();

        assert!(Path::new(&shown).is_absolute());
        assert_eq!(Path::new(&shown).strip_prefix(&cwd).unwrap(), Path::new("lib/a.jar"));
    }

    #[test]
    fn test_diagnostic_prefixes() {
        assert_eq!(format_error("boom", false), "Error: boom");
        assert_eq!(format_warning("skip", false), "Warning: skip");
        assert_eq!(console::strip_ansi_codes(&format_error("boom", true)), "Error: boom");
    }
}
