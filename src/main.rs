use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;

use find_in_archives::presentation::print_error;
use find_in_archives::{
    Config, FindError, ListingTool, Logger, LoggerTrait, MatchMode, OutputMode, ResultRenderer,
    ScanEngine, SearchConfiguration, SearchOptions,
};

/// 在 jar/zip 等归档文件中查找名称匹配的条目
#[derive(Parser, Debug)]
#[command(name = "find-in-archives", version, about, long_about = None, args_override_self = true)]
struct Args {
    /// 条目名的匹配模式 (默认按扩展正则解释)
    #[arg(value_name = "PATTERN")]
    patterns: Vec<String>,

    /// 要查找的目录，可重复指定 (默认当前目录)
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    dirs: Vec<PathBuf>,

    /// 视为归档的扩展名，可重复指定 (默认 jar)
    #[arg(short = 'e', long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// 按扩展正则解释 PATTERN (默认)
    #[arg(short = 'E', long, overrides_with_all = ["fixed_strings", "basic_regexp", "perl_regexp"])]
    extended_regexp: bool,

    /// 按固定字符串解释 PATTERN
    #[arg(short = 'F', long, overrides_with_all = ["extended_regexp", "basic_regexp", "perl_regexp"])]
    fixed_strings: bool,

    /// 按基本正则解释 PATTERN
    #[arg(short = 'G', long, overrides_with_all = ["extended_regexp", "fixed_strings", "perl_regexp"])]
    basic_regexp: bool,

    /// 按 Perl 正则解释 PATTERN
    #[arg(short = 'P', long, overrides_with_all = ["extended_regexp", "fixed_strings", "basic_regexp"])]
    perl_regexp: bool,

    /// 忽略大小写
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// 输出归档的绝对路径
    #[arg(short = 'a', long)]
    absolute_path: bool,

    /// 归档路径与条目名之间的分隔符 (默认 `!`)
    #[arg(short = 's', long, alias = "seperator", value_name = "SEP")]
    separator: Option<String>,

    /// 只输出包含匹配条目的归档
    #[arg(short = 'l', long, overrides_with = "files_not_contained_found")]
    files_contained_found: bool,

    /// 只输出不包含匹配条目的归档
    #[arg(short = 'L', long, overrides_with = "files_contained_found")]
    files_not_contained_found: bool,

    /// 不显示查找进度
    #[arg(short = 'R', long)]
    no_find_progress: bool,

    /// 配置文件路径 (默认程序同级目录下的 config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 写入诊断日志文件
    #[arg(long)]
    log: bool,
}

impl Args {
    fn match_mode(&self) -> MatchMode {
        if self.fixed_strings {
            MatchMode::Fixed
        } else if self.basic_regexp {
            MatchMode::Basic
        } else if self.perl_regexp {
            MatchMode::Perl
        } else {
            MatchMode::Extended
        }
    }

    fn output_mode(&self) -> OutputMode {
        if self.files_contained_found {
            OutputMode::FilesWithMatches
        } else if self.files_not_contained_found {
            OutputMode::FilesWithoutMatch
        } else {
            OutputMode::Detail
        }
    }

    /// 命令行参数覆盖配置文件中的默认值
    fn into_options(self, defaults: &Config) -> Result<SearchOptions, FindError> {
        let match_mode = self.match_mode();
        let output_mode = self.output_mode();

        let mut patterns = self.patterns;
        let pattern = match patterns.len() {
            0 => return Err(FindError::Usage("requires find pattern!".into())),
            1 => patterns.remove(0),
            _ => {
                return Err(FindError::Usage(format!(
                    "more than 1 pattern: {}",
                    patterns.join(" ")
                )))
            }
        };

        let dirs = if self.dirs.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.dirs
        };

        let extensions = if self.extensions.is_empty() {
            defaults.search.extensions.clone()
        } else {
            self.extensions
        };

        Ok(SearchOptions {
            dirs,
            extensions,
            pattern,
            match_mode,
            ignore_case: self.ignore_case,
            separator: self
                .separator
                .unwrap_or_else(|| defaults.search.separator.clone()),
            absolute_path: self.absolute_path || defaults.search.absolute_path,
            output_mode,
            show_progress: !self.no_find_progress && defaults.search.show_progress,
        })
    }
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                ErrorKind::UnknownArgument => 2,
                _ => 1,
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    if let Err(err) = run(args) {
        // 下游管道提前关闭 (例如 `| head`) 不算错误
        if err
            .downcast_ref::<io::Error>()
            .map_or(false, |e| e.kind() == io::ErrorKind::BrokenPipe)
        {
            process::exit(0);
        }

        print_error(&format!("{:#}", err));
        let code = err.downcast_ref::<FindError>().map_or(1, FindError::exit_code);
        process::exit(code);
    }
}

fn run(args: Args) -> Result<()> {
    let file_config = Config::load(args.config.as_deref())?;
    let log_enabled = args.log || file_config.logging.enabled;

    let config = SearchConfiguration::new(args.into_options(&file_config)?)?;

    // 初始化日志记录器
    let logger: Arc<dyn LoggerTrait> =
        Arc::new(Logger::new(log_enabled, &file_config.logging.log_dir)?);

    if logger.is_enabled() {
        logger.log_message(&format!("pattern: {}", config.pattern()))?;
        logger.log_message(&format!("match mode: {:?}", config.match_mode()))?;
        logger.log_message(&format!("ignore case: {}", config.ignore_case()))?;
        logger.log_message(&format!("dirs: {:?}", config.dirs()))?;
        logger.log_message(&format!("extensions: {}", config.extensions().join(", ")))?;
        logger.log_message(&format!("output mode: {:?}", config.output_mode()))?;
    }

    let tool = ListingTool::detect()?;
    logger.log_message(&format!("listing tool: {}", tool))?;

    let engine = ScanEngine::new(
        &config,
        &tool,
        ResultRenderer::from_config(&config),
        Arc::clone(&logger),
    )?;

    let start_time = Instant::now();
    let mut stdout = io::stdout().lock();
    let summary = engine.run(&mut stdout)?;

    logger.finalize(&summary, start_time.elapsed())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("find-in-archives").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let options = parse(&["log4j"]).unwrap().into_options(&Config::default()).unwrap();

        assert_eq!(options.pattern, "log4j");
        assert_eq!(options.dirs, vec![PathBuf::from(".")]);
        assert_eq!(options.extensions, vec!["jar".to_string()]);
        assert_eq!(options.match_mode, MatchMode::Extended);
        assert_eq!(options.output_mode, OutputMode::Detail);
        assert_eq!(options.separator, "!");
        assert!(options.show_progress);
    }

    #[test]
    fn test_last_match_mode_wins() {
        let args = parse(&["-F", "-G", "-P", "x"]).unwrap();
        assert_eq!(args.match_mode(), MatchMode::Perl);

        let args = parse(&["-P", "-E", "x"]).unwrap();
        assert_eq!(args.match_mode(), MatchMode::Extended);

        let args = parse(&["-G", "-F", "-F", "x"]).unwrap();
        assert_eq!(args.match_mode(), MatchMode::Fixed);
    }

    #[test]
    fn test_repeatable_dirs_and_extensions() {
        let options = parse(&["-d", "a", "--dir", "b", "-e", "jar", "-e", "war", "x"])
            .unwrap()
            .into_options(&Config::default())
            .unwrap();

        assert_eq!(options.dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(options.extensions, vec!["jar".to_string(), "war".to_string()]);
    }

    #[test]
    fn test_separator_and_legacy_alias() {
        let args = parse(&["-s", "::", "x"]).unwrap();
        assert_eq!(args.separator.as_deref(), Some("::"));

        let args = parse(&["--seperator", "#", "x"]).unwrap();
        assert_eq!(args.separator.as_deref(), Some("#"));
    }

    #[test]
    fn test_names_only_modes() {
        assert_eq!(parse(&["-l", "x"]).unwrap().output_mode(), OutputMode::FilesWithMatches);
        assert_eq!(parse(&["-L", "x"]).unwrap().output_mode(), OutputMode::FilesWithoutMatch);
        assert_eq!(parse(&["-l", "-L", "x"]).unwrap().output_mode(), OutputMode::FilesWithoutMatch);
    }

    #[test]
    fn test_pattern_count_is_checked() {
        let missing = parse(&[]).unwrap().into_options(&Config::default());
        assert!(matches!(missing, Err(FindError::Usage(_))));

        let extra = parse(&["a", "b"]).unwrap().into_options(&Config::default());
        assert!(matches!(extra, Err(FindError::Usage(_))));
    }

    #[test]
    fn test_double_dash_ends_options() {
        let options = parse(&["--", "-foo"]).unwrap().into_options(&Config::default()).unwrap();
        assert_eq!(options.pattern, "-foo");
    }

    #[test]
    fn test_unknown_option_kind() {
        let err = parse(&["--bogus", "x"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_progress_flag_and_config_defaults() {
        let mut defaults = Config::default();
        defaults.search.separator = "=>".into();
        defaults.search.extensions = vec!["zip".into()];

        let options = parse(&["-R", "x"]).unwrap().into_options(&defaults).unwrap();
        assert!(!options.show_progress);
        assert_eq!(options.separator, "=>");
        assert_eq!(options.extensions, vec!["zip".to_string()]);
    }
}
