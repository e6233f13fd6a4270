use std::borrow::Cow;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Output};

use crate::error::FindError;

/// 完整性检查输出这条消息时表示归档为空，而不是损坏
pub const EMPTY_ZIP_MESSAGE: &str = "Empty zipfile.";

/// 列出一个归档的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingOutcome {
    /// 条目名，保持工具输出的顺序 (空归档为空列表)
    Entries(Vec<String>),
    /// 完整性检查未通过
    CheckFailed(String),
    /// 列出条目的命令失败
    ListFailed(String),
}

/// 给定归档路径，列出其中的条目名
pub trait EntryLister {
    fn list_entries(&self, archive: &Path) -> ListingOutcome;
}

/// 可用的外部列表工具 (按优先级排列)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    ZipInfo,
    Unzip,
    JavaHomeJar,
    PathJar,
}

impl ToolKind {
    /// 列出条目的参数
    fn list_args(self) -> &'static [&'static str] {
        match self {
            ToolKind::ZipInfo => &["-1"],
            ToolKind::Unzip => &["-Z1"],
            ToolKind::JavaHomeJar | ToolKind::PathJar => &["tf"],
        }
    }

    /// zipinfo/unzip 的列表模式无法区分空归档和损坏归档，需要先单独检查
    pub fn needs_integrity_check(self) -> bool {
        matches!(self, ToolKind::ZipInfo | ToolKind::Unzip)
    }
}

/// 启动时选定的外部列表工具，之后不再重新探测
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTool {
    kind: ToolKind,
    program: PathBuf,
}

type Probe = fn(&dyn Fn(&str) -> Option<PathBuf>, Option<&Path>) -> Result<Option<ListingTool>, FindError>;

/// 探测顺序: zipinfo、unzip 比 jar 快得多，所以优先
const PROBES: &[(&str, Probe)] = &[
    ("zipinfo", probe_zipinfo),
    ("unzip", probe_unzip),
    ("$JAVA_HOME/bin/jar", probe_java_home_jar),
    ("jar", probe_path_jar),
];

impl ListingTool {
    /// 从 PATH 和 JAVA_HOME 探测可用的工具
    pub fn detect() -> Result<Self, FindError> {
        let java_home = std::env::var_os("JAVA_HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from);
        Self::detect_with(&|name: &str| which::which(name).ok(), java_home.as_deref())
    }

    /// 按固定优先级依次探测，第一个可用的胜出
    pub fn detect_with(
        lookup: &dyn Fn(&str) -> Option<PathBuf>,
        java_home: Option<&Path>,
    ) -> Result<Self, FindError> {
        for (_, probe) in PROBES {
            if let Some(tool) = probe(lookup, java_home)? {
                return Ok(tool);
            }
        }

        let tried = PROBES
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");
        Err(FindError::NoListingTool { tried })
    }

    pub fn new(kind: ToolKind, program: PathBuf) -> Self {
        Self { kind, program }
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    /// 完整性检查，返回 `Ok(true)` 表示空归档
    fn check(&self, archive: &Path) -> Result<bool, String> {
        let output = Command::new(&self.program)
            .args(self.kind.list_args())
            .arg("-t")
            .arg(&*command_path(archive))
            .output()
            .map_err(|err| format!("fail to run {}: {}", self.program.display(), err))?;

        if output.status.success() {
            return Ok(false);
        }

        let message = command_message(&output);
        if message == EMPTY_ZIP_MESSAGE {
            Ok(true)
        } else {
            Err(message)
        }
    }

    fn list(&self, archive: &Path) -> Result<Vec<String>, String> {
        let output = Command::new(&self.program)
            .args(self.kind.list_args())
            .arg(&*command_path(archive))
            .output()
            .map_err(|err| format!("fail to run {}: {}", self.program.display(), err))?;

        if !output.status.success() {
            return Err(command_message(&output));
        }

        Ok(parse_listing(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl EntryLister for ListingTool {
    fn list_entries(&self, archive: &Path) -> ListingOutcome {
        if self.kind.needs_integrity_check() {
            match self.check(archive) {
                Ok(true) => return ListingOutcome::Entries(Vec::new()),
                Ok(false) => {}
                Err(message) => return ListingOutcome::CheckFailed(message),
            }
        }

        match self.list(archive) {
            Ok(entries) => ListingOutcome::Entries(entries),
            Err(message) => ListingOutcome::ListFailed(message),
        }
    }
}

impl fmt::Display for ListingTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program.display(), self.kind.list_args().join(" "))
    }
}

/// 失败时工具的输出 (zipinfo 把错误写到 stdout，jar 写到 stderr)
fn command_message(output: &Output) -> String {
    let mut message = String::from_utf8_lossy(&output.stdout).into_owned();
    message.push_str(&String::from_utf8_lossy(&output.stderr));
    let message = message.trim();
    if message.is_empty() {
        format!("exit status {}", output.status)
    } else {
        message.to_string()
    }
}

/// 传给外部工具的归档路径
///
/// 相对路径补上 `./`，以 `-` 开头的文件名不会被工具当成选项。
fn command_path(archive: &Path) -> Cow<'_, Path> {
    match archive.components().next() {
        Some(Component::Normal(_)) => Cow::Owned(Path::new(".").join(archive)),
        _ => Cow::Borrowed(archive),
    }
}

/// 每行一个条目名，丢弃空行
fn parse_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn probe_zipinfo(
    lookup: &dyn Fn(&str) -> Option<PathBuf>,
    _: Option<&Path>,
) -> Result<Option<ListingTool>, FindError> {
    Ok(lookup("zipinfo").map(|program| ListingTool::new(ToolKind::ZipInfo, program)))
}

fn probe_unzip(
    lookup: &dyn Fn(&str) -> Option<PathBuf>,
    _: Option<&Path>,
) -> Result<Option<ListingTool>, FindError> {
    Ok(lookup("unzip").map(|program| ListingTool::new(ToolKind::Unzip, program)))
}

/// 依次检查 `$JAVA_HOME/bin/jar` 和 `$JAVA_HOME/../bin/jar`
///
/// 文件存在但不可执行时直接报错，不会悄悄退回到 PATH 上的 jar。
fn probe_java_home_jar(
    _: &dyn Fn(&str) -> Option<PathBuf>,
    java_home: Option<&Path>,
) -> Result<Option<ListingTool>, FindError> {
    let Some(home) = java_home else {
        return Ok(None);
    };

    let jar_name = if cfg!(windows) { "jar.exe" } else { "jar" };
    let candidates = [
        home.join("bin").join(jar_name),
        home.join("..").join("bin").join(jar_name),
    ];

    for candidate in candidates {
        if !candidate.is_file() {
            continue;
        }
        if !is_executable(&candidate) {
            return Err(FindError::JarNotExecutable(candidate));
        }
        return Ok(Some(ListingTool::new(ToolKind::JavaHomeJar, candidate)));
    }

    Ok(None)
}

fn probe_path_jar(
    lookup: &dyn Fn(&str) -> Option<PathBuf>,
    _: Option<&Path>,
) -> Result<Option<ListingTool>, FindError> {
    Ok(lookup("jar").map(|program| ListingTool::new(ToolKind::PathJar, program)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn lookup_only(names: &'static [&'static str]) -> impl Fn(&str) -> Option<PathBuf> {
        move |name: &str| {
            names
                .iter()
                .any(|n| *n == name)
                .then(|| PathBuf::from(format!("/usr/bin/{}", name)))
        }
    }

    #[cfg(unix)]
    fn make_jar(dir: &Path, mode: u32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let bin = dir.join("bin");
        fs::create_dir_all(&bin).unwrap();
        let jar = bin.join("jar");
        fs::write(&jar, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&jar, fs::Permissions::from_mode(mode)).unwrap();
        jar
    }

    #[test]
    fn test_zipinfo_wins() {
        let tool = ListingTool::detect_with(&lookup_only(&["jar", "unzip", "zipinfo"]), None).unwrap();
        assert_eq!(tool.kind(), ToolKind::ZipInfo);
        assert_eq!(tool, ListingTool::new(ToolKind::ZipInfo, PathBuf::from("/usr/bin/zipinfo")));
        assert!(tool.kind().needs_integrity_check());
    }

    #[test]
    fn test_unzip_before_jar() {
        let tool = ListingTool::detect_with(&lookup_only(&["jar", "unzip"]), None).unwrap();
        assert_eq!(tool.kind(), ToolKind::Unzip);
        assert_eq!(tool.to_string(), "/usr/bin/unzip -Z1");
    }

    #[test]
    fn test_path_jar_last() {
        let tool = ListingTool::detect_with(&lookup_only(&["jar"]), None).unwrap();
        assert_eq!(tool.kind(), ToolKind::PathJar);
        assert!(!tool.kind().needs_integrity_check());
    }

    #[test]
    fn test_nothing_available_names_all_tools() {
        let err = ListingTool::detect_with(&lookup_only(&[]), None).unwrap_err();
        let message = err.to_string();
        for tool in ["zipinfo", "unzip", "JAVA_HOME", "jar"] {
            assert!(message.contains(tool), "{} missing from {}", tool, message);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_java_home_jar_preferred_over_path_jar() {
        let home = tempdir().unwrap();
        let jar = make_jar(home.path(), 0o755);

        let tool = ListingTool::detect_with(&lookup_only(&["jar"]), Some(home.path())).unwrap();
        assert_eq!(tool.kind(), ToolKind::JavaHomeJar);
        assert_eq!(tool, ListingTool::new(ToolKind::JavaHomeJar, jar));
    }

    #[cfg(unix)]
    #[test]
    fn test_java_home_parent_bin() {
        let root = tempdir().unwrap();
        make_jar(root.path(), 0o755);
        let jre = root.path().join("jre");
        fs::create_dir_all(&jre).unwrap();

        let tool = ListingTool::detect_with(&lookup_only(&[]), Some(&jre)).unwrap();
        assert_eq!(tool.kind(), ToolKind::JavaHomeJar);
        let expected = jre.join("..").join("bin").join("jar");
        assert_eq!(tool, ListingTool::new(ToolKind::JavaHomeJar, expected));
    }

    #[cfg(unix)]
    #[test]
    fn test_java_home_jar_not_executable_is_fatal() {
        let home = tempdir().unwrap();
        make_jar(home.path(), 0o644);

        let err = ListingTool::detect_with(&lookup_only(&["jar"]), Some(home.path())).unwrap_err();
        assert!(matches!(err, FindError::JarNotExecutable(_)));
    }

    #[test]
    fn test_java_home_without_jar_falls_through() {
        let home = tempdir().unwrap();
        let tool = ListingTool::detect_with(&lookup_only(&["jar"]), Some(home.path())).unwrap();
        assert_eq!(tool.kind(), ToolKind::PathJar);
    }

    #[test]
    fn test_command_path_never_looks_like_an_option() {
        assert_eq!(command_path(Path::new("-x/a.jar")), Path::new("./-x/a.jar"));
        assert_eq!(command_path(Path::new("-a.jar")), Path::new("./-a.jar"));
        assert_eq!(command_path(Path::new("lib/a.jar")), Path::new("./lib/a.jar"));
        assert_eq!(command_path(Path::new("./a.jar")), Path::new("./a.jar"));
        assert_eq!(command_path(Path::new("../a.jar")), Path::new("../a.jar"));
        assert_eq!(command_path(Path::new("/opt/a.jar")), Path::new("/opt/a.jar"));
    }

    #[test]
    fn test_parse_listing_drops_blank_lines() {
        let entries = parse_listing("META-INF/\r\nMETA-INF/MANIFEST.MF\n\nlog4j.properties\n");
        assert_eq!(
            entries,
            vec!["META-INF/", "META-INF/MANIFEST.MF", "log4j.properties"]
        );
    }
}
