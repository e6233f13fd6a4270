use std::path::Path;

use console::Term;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// stderr 上的查找进度
///
/// 终端宽度只在创建时取一次。进度行会被原地覆盖，
/// 在输出匹配行或警告之前必须先通过 [`ProgressReporter::suspend`] 清掉。
pub struct ProgressReporter {
    bar: ProgressBar,
    width: usize,
    visible: bool,
}

impl ProgressReporter {
    /// 仅在启用且 stderr 是终端时显示
    pub fn new(total: u64, enabled: bool) -> Self {
        let term = Term::stderr();
        if !enabled || !term.is_term() {
            return Self::hidden();
        }

        let (_, cols) = term.size();
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::with_template("{msg}") {
            bar.set_style(style);
        }

        Self {
            bar,
            width: cols as usize,
            visible: true,
        }
    }

    /// 不显示任何内容
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            width: 0,
            visible: false,
        }
    }

    /// 显示 "finding in archive (i/total): path"
    pub fn report(&self, index: usize, total: usize, path: &Path) {
        if !self.visible {
            return;
        }
        self.bar.set_position(index as u64);
        self.bar
            .set_message(fit_line(index, total, &path.to_string_lossy(), self.width));
    }

    /// 清掉进度行后执行 `f`，之后进度行会重新绘制
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    /// 清掉残留的进度行
    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

/// 生成进度行，过长时省略路径中间部分
fn fit_line(index: usize, total: usize, path: &str, width: usize) -> String {
    let prefix = format!("finding in archive ({}/{}): ", index, total);
    // 留一列给光标，避免终端自动换行
    let budget = width.saturating_sub(1);
    let prefix_len = prefix.chars().count();
    let path_len = path.chars().count();

    if width == 0 || prefix_len + path_len <= budget {
        return format!("{}{}", prefix, path);
    }

    let room = budget.saturating_sub(prefix_len);
    if room <= 3 {
        return prefix.chars().take(budget).collect();
    }

    let keep = room - 3;
    let head = keep / 2;
    let tail = keep - head;
    let start: String = path.chars().take(head).collect();
    let end: String = path.chars().skip(path_len - tail).collect();
    format!("{}{}...{}", prefix, start, end)
}
