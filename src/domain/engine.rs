use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use console::Term;

use crate::application::{OutputMode, SearchConfiguration};
use crate::domain::discovery::discover;
use crate::domain::listing::{EntryLister, ListingOutcome};
use crate::domain::pattern::PatternMatcher;
use crate::error::FindError;
use crate::infrastructure::{ErrorType, LoggerTrait, ProgressReporter, RunSummary};
use crate::presentation::{format_warning, ResultRenderer};

/// 查找引擎
///
/// 逐个处理归档: 列出条目、匹配、立即输出，然后才处理下一个。
/// 单个归档失败只输出警告并跳过，不会中止整个查找。
pub struct ScanEngine<'a> {
    config: &'a SearchConfiguration,
    lister: &'a dyn EntryLister,
    matcher: PatternMatcher,
    renderer: ResultRenderer,
    logger: Arc<dyn LoggerTrait>,
    warn_colored: bool,
}

impl<'a> ScanEngine<'a> {
    pub fn new(
        config: &'a SearchConfiguration,
        lister: &'a dyn EntryLister,
        renderer: ResultRenderer,
        logger: Arc<dyn LoggerTrait>,
    ) -> Result<Self, FindError> {
        let matcher =
            PatternMatcher::new(config.pattern(), config.match_mode(), config.ignore_case())?;

        Ok(Self {
            config,
            lister,
            matcher,
            renderer,
            logger,
            warn_colored: Term::stderr().is_term(),
        })
    }

    /// 执行查找，结果写到 `out`
    pub fn run<W: Write>(&self, out: &mut W) -> Result<RunSummary> {
        let archives = discover(self.config.dirs(), self.config.extensions(), &self.logger)?;
        let total = archives.len();
        let progress = ProgressReporter::new(total as u64, self.config.show_progress());

        let mut summary = RunSummary {
            total_archives: total as u64,
            ..RunSummary::default()
        };

        for (i, archive) in archives.iter().enumerate() {
            progress.report(i + 1, total, archive);

            match self.lister.list_entries(archive) {
                ListingOutcome::Entries(entries) => {
                    let matches = self.render_archive(archive, &entries, &progress, out)?;
                    if matches > 0 {
                        summary.matched_archives += 1;
                        summary.total_matches += matches;
                    }
                    let status = if matches > 0 { "matched" } else { "scanned" };
                    let _ = self.logger.log_archive(archive, status);
                }
                ListingOutcome::CheckFailed(message) => {
                    summary.skipped_archives += 1;
                    self.skip(archive, ErrorType::IntegrityCheck, &message, &progress);
                    // 跳过的归档按没有条目处理，`-L` 仍会输出它
                    self.render_archive(archive, &[], &progress, out)?;
                }
                ListingOutcome::ListFailed(message) => {
                    summary.skipped_archives += 1;
                    self.skip(archive, ErrorType::Listing, &message, &progress);
                    self.render_archive(archive, &[], &progress, out)?;
                }
            }
        }

        progress.clear();
        out.flush()?;

        Ok(summary)
    }

    /// 按输出模式处理一个归档的条目，返回匹配条目数
    ///
    /// 仅输出归档名时遇到第一个匹配就停止，返回值最多为 1。
    fn render_archive<W: Write>(
        &self,
        archive: &Path,
        entries: &[String],
        progress: &ProgressReporter,
        out: &mut W,
    ) -> io::Result<u64> {
        let shown = self.renderer.display_path(archive);

        match self.config.output_mode() {
            OutputMode::Detail => {
                let mut count = 0;
                for found in self.matcher.filter_and_annotate(entries) {
                    progress.suspend(|| self.renderer.write_match(out, &shown, &found))?;
                    count += 1;
                }
                Ok(count)
            }
            OutputMode::FilesWithMatches => {
                let hit = self.matcher.any_match(entries);
                if hit {
                    progress.suspend(|| self.renderer.write_archive(out, &shown))?;
                }
                Ok(hit as u64)
            }
            OutputMode::FilesWithoutMatch => {
                let hit = self.matcher.any_match(entries);
                if !hit {
                    progress.suspend(|| self.renderer.write_archive(out, &shown))?;
                }
                Ok(hit as u64)
            }
        }
    }

    fn skip(
        &self,
        archive: &Path,
        error_type: ErrorType,
        message: &str,
        progress: &ProgressReporter,
    ) {
        let warning = format!(
            "fail to list zip entries of {}, ignored: {}",
            archive.display(),
            message
        );
        progress.suspend(|| eprintln!("{}", format_warning(&warning, self.warn_colored)));
        let _ = self.logger.log_error(error_type, Some(archive), message);
    }
}
