use std::ops::Range;

use grep_matcher::{Match, Matcher};
use grep_pcre2::RegexMatcherBuilder as PcreMatcherBuilder;
use grep_regex::RegexMatcherBuilder;

use crate::error::FindError;

/// 模式语法 (互斥，默认扩展正则)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// 扩展正则 (`-E`)
    #[default]
    Extended,
    /// 基本正则 (`-G`)
    Basic,
    /// 固定字符串 (`-F`)
    Fixed,
    /// Perl 兼容正则 (`-P`)
    Perl,
}

/// 匹配到的条目及其匹配区间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMatch<'a> {
    pub entry: &'a str,
    pub span: Range<usize>,
}

/// 底层正则引擎
///
/// Perl 模式需要环视和反向引用，只有 PCRE2 支持；其余语法走 Rust regex。
#[derive(Debug)]
enum Engine {
    Regex(grep_regex::RegexMatcher),
    Pcre2(grep_pcre2::RegexMatcher),
}

/// 条目名匹配器
#[derive(Debug)]
pub struct PatternMatcher {
    engine: Engine,
}

impl PatternMatcher {
    /// 按模式语法和大小写设置编译匹配器
    pub fn new(pattern: &str, mode: MatchMode, ignore_case: bool) -> Result<Self, FindError> {
        let invalid = |reason: String| FindError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let source = match mode {
            // 转义正则表达式特殊字符
            MatchMode::Fixed => regex::escape(pattern),
            MatchMode::Basic => basic_to_extended(pattern),
            MatchMode::Extended => pattern.to_string(),
            MatchMode::Perl => {
                let matcher = PcreMatcherBuilder::new()
                    .caseless(ignore_case)
                    .utf(true)
                    .build(pattern)
                    .map_err(|err| invalid(err.to_string()))?;
                return Ok(Self {
                    engine: Engine::Pcre2(matcher),
                });
            }
        };

        let matcher = RegexMatcherBuilder::new()
            .case_insensitive(ignore_case)
            .build(&source)
            .map_err(|err| invalid(err.to_string()))?;

        Ok(Self {
            engine: Engine::Regex(matcher),
        })
    }

    /// 条目名是否匹配
    pub fn matches(&self, entry: &str) -> bool {
        self.find(entry).is_some()
    }

    /// 第一处匹配的字节区间
    pub fn find(&self, entry: &str) -> Option<Range<usize>> {
        let found: Option<Match> = match &self.engine {
            Engine::Regex(matcher) => matcher.find(entry.as_bytes()).ok().flatten(),
            Engine::Pcre2(matcher) => matcher.find(entry.as_bytes()).ok().flatten(),
        };
        found.map(|m| m.start()..m.end())
    }

    /// 过滤出匹配的条目，保持原有顺序并附带匹配区间
    pub fn filter_and_annotate<'a>(
        &'a self,
        entries: &'a [String],
    ) -> impl Iterator<Item = EntryMatch<'a>> + 'a {
        entries.iter().filter_map(move |entry| {
            self.find(entry).map(|span| EntryMatch {
                entry: entry.as_str(),
                span,
            })
        })
    }

    /// 是否至少有一个条目匹配，遇到第一个匹配即返回
    pub fn any_match(&self, entries: &[String]) -> bool {
        entries.iter().any(|entry| self.matches(entry))
    }
}

/// 把 POSIX 基本正则改写为扩展正则
///
/// BRE 中 `\(`、`\)`、`\{`、`\}`、`\|`、`\+`、`\?` 是运算符，
/// 而不带反斜杠的同名字符是普通字符，两者正好与 ERE 相反。
fn basic_to_extended(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;
    // 表达式开头的 `*` 是普通字符
    let mut expr_start = true;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => match chars.get(i + 1) {
                Some(&next @ ('(' | ')' | '{' | '}' | '|' | '+' | '?')) => {
                    out.push(next);
                    i += 2;
                    expr_start = matches!(next, '(' | '|');
                    continue;
                }
                Some(&next) => {
                    out.push('\\');
                    out.push(next);
                    i += 2;
                }
                None => {
                    out.push_str("\\\\");
                    i += 1;
                }
            },
            '(' | ')' | '{' | '}' | '|' | '+' | '?' => {
                out.push('\\');
                out.push(c);
                i += 1;
            }
            '*' if expr_start => {
                out.push_str("\\*");
                i += 1;
            }
            '^' if expr_start => {
                out.push('^');
                i += 1;
                continue;
            }
            '[' => i = copy_bracket(&chars, i, &mut out),
            _ => {
                out.push(c);
                i += 1;
            }
        }
        expr_start = false;
    }

    out
}

/// 复制一个方括号表达式，返回其后的位置
fn copy_bracket(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('[');
    let mut i = start + 1;
    if chars.get(i) == Some(&'^') {
        out.push('^');
        i += 1;
    }
    // 紧跟在 `[` 或 `[^` 后的 `]` 是普通字符
    if chars.get(i) == Some(&']') {
        out.push_str("\\]");
        i += 1;
    }

    while i < chars.len() {
        let c = chars[i];
        if c == ']' {
            out.push(']');
            return i + 1;
        }
        // 字符类，例如 [:alpha:]
        if c == '[' && chars.get(i + 1) == Some(&':') {
            if let Some(end) = (i + 2..chars.len().saturating_sub(1))
                .find(|&j| chars[j] == ':' && chars[j + 1] == ']')
            {
                out.extend(&chars[i..=end + 1]);
                i = end + 2;
                continue;
            }
        }
        if matches!(c, '[' | '\\' | '&' | '~') {
            out.push('\\');
        }
        out.push(c);
        i += 1;
    }

    // 未闭合的方括号交给正则引擎报错
    i
}
