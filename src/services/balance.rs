//! 分隔符扫描 - 业务能力层
//!
//! 只负责“数括号、数标签、找代码块边界”的能力：
//! - 标记区域：统计成对标签（`<div>` / `</div>` 等），跳过注释和 script/style 内容
//! - 脚本区域：统计 `{}` `[]` `()`，跳过字符串、模板字符串和注释
//! - 样式区域：统计 `{}`，跳过注释

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::ops::Range;

/// 标签匹配（从 `<` 处开始）
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<(/?)([A-Za-z][A-Za-z0-9-]*)\b[^>]*?(/?)>").unwrap());

/// 参与平衡检查的标签
const TRACKED_TAGS: &[&str] = &[
    "html", "head", "body", "div", "section", "article", "ul", "script", "style",
];

/// 代码块语法，决定如何确定块的边界
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSyntax {
    /// 脚本声明：从起始标记后第一个 `{` 或 `[` 到与之配对的闭合符（含可选的 `;`）
    Script,
    /// 标记元素：从 `<tag` 到同名标签嵌套归零的 `</tag>`
    Markup { tag: &'static str },
}

/// 原始文本区域类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawKind {
    Script,
    Style,
}

#[derive(Debug, Clone)]
struct TagToken {
    start: usize,
    end: usize,
    name: String,
    closing: bool,
}

#[derive(Debug, Default)]
struct MarkupScan {
    tags: Vec<TagToken>,
    raw_regions: Vec<(RawKind, Range<usize>)>,
}

/// 扫描标记层：收集标签，并记录 script/style 的内容区域
fn scan_markup(text: &str) -> MarkupScan {
    let lower = text.to_ascii_lowercase();
    let mut scan = MarkupScan::default();
    let mut i = 0;

    while let Some(offset) = text[i..].find('<') {
        let pos = i + offset;

        if text[pos..].starts_with("<!--") {
            match text[pos + 4..].find("-->") {
                Some(end) => {
                    i = pos + 4 + end + 3;
                    continue;
                }
                None => break,
            }
        }

        let Some(caps) = TAG_RE.captures(&text[pos..]) else {
            i = pos + 1;
            continue;
        };

        let end = pos + caps[0].len();
        let name = caps[2].to_ascii_lowercase();
        let closing = !caps[1].is_empty();
        let self_closing = !caps[3].is_empty();
        scan.tags.push(TagToken {
            start: pos,
            end,
            name: name.clone(),
            closing,
        });

        let raw_kind = match name.as_str() {
            "script" => Some(RawKind::Script),
            "style" => Some(RawKind::Style),
            _ => None,
        };
        match raw_kind {
            Some(kind) if !closing && !self_closing => {
                let close = format!("</{}", name);
                match lower[end..].find(&close) {
                    Some(off) => {
                        scan.raw_regions.push((kind, end..end + off));
                        i = end + off;
                    }
                    None => {
                        scan.raw_regions.push((kind, end..text.len()));
                        i = text.len();
                    }
                }
            }
            _ => i = end,
        }
    }

    scan
}

/// 脚本中位于字符串、正则字面量和注释之外的分隔符位置
fn script_delimiters(text: &str, range: Range<usize>) -> Vec<(usize, u8)> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = range.start;

    while i < range.end {
        let b = bytes[i];
        match b {
            b'"' | b'\'' | b'`' => i = skip_string(bytes, i, range.end, b),
            b'/' if i + 1 < range.end && bytes[i + 1] == b'/' => {
                while i < range.end && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < range.end && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < range.end && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b'/' if regex_allowed(bytes, range.start, i) => i = skip_regex(bytes, i, range.end),
            b'{' | b'}' | b'[' | b']' | b'(' | b')' => out.push((i, b)),
            _ => {}
        }
        i += 1;
    }

    out
}

/// 跳过字符串字面量，返回结束引号的位置
///
/// 单双引号字符串在未转义的换行处结束；模板字符串可以跨行
fn skip_string(bytes: &[u8], start: usize, end: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < end {
        match bytes[i] {
            b'\\' => i += 1,
            b'\n' if quote != b'`' => return i,
            b if b == quote => return i,
            _ => {}
        }
        i += 1;
    }
    i
}

/// 跳过正则字面量，返回结束 `/` 的位置（未闭合时停在行尾）
fn skip_regex(bytes: &[u8], start: usize, end: usize) -> usize {
    let mut i = start + 1;
    let mut in_class = false;
    while i < end {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' => in_class = true,
            b']' => in_class = false,
            b'/' if !in_class => return i,
            b'\n' => return i,
            _ => {}
        }
        i += 1;
    }
    i
}

/// `/` 出现在运算符、开括号、分隔符或 `return` 之类关键字之后时是正则字面量
fn regex_allowed(bytes: &[u8], floor: usize, pos: usize) -> bool {
    let mut i = pos;
    while i > floor && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    if i == floor {
        return true;
    }

    let prev = bytes[i - 1];
    if is_ident_byte(prev) {
        let word_end = i;
        while i > floor && is_ident_byte(bytes[i - 1]) {
            i -= 1;
        }
        let word = &bytes[i..word_end];
        return REGEX_KEYWORDS.iter().any(|k| *k == word);
    }
    matches!(
        prev,
        b'(' | b',' | b'=' | b':' | b'[' | b'!' | b'&' | b'|' | b'?' | b'{' | b'}' | b';'
            | b'+' | b'-' | b'*' | b'%' | b'<' | b'>' | b'~' | b'^'
    )
}

const REGEX_KEYWORDS: &[&[u8]] = &[
    b"return", b"typeof", b"case", b"do", b"else", b"in", b"of", b"delete", b"void",
    b"throw", b"new",
];

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// 样式中位于注释之外的花括号位置
fn style_delimiters(text: &str, range: Range<usize>) -> Vec<(usize, u8)> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = range.start;

    while i < range.end {
        match bytes[i] {
            b'/' if i + 1 < range.end && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < range.end && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b @ (b'{' | b'}') => out.push((i, b)),
            _ => {}
        }
        i += 1;
    }

    out
}

fn closer_for(open: u8) -> u8 {
    match open {
        b'{' => b'}',
        b'[' => b']',
        _ => b')',
    }
}

/// 计算从 `start` 开始的代码块范围
///
/// # 返回
/// 块的字节范围；找不到配对的闭合符时返回 `None`（块不完整）
pub fn block_extent(text: &str, start: usize, syntax: BlockSyntax) -> Option<Range<usize>> {
    match syntax {
        BlockSyntax::Script => script_block_extent(text, start),
        BlockSyntax::Markup { tag } => markup_block_extent(text, start, tag),
    }
}

fn script_block_extent(text: &str, start: usize) -> Option<Range<usize>> {
    let lower = text.to_ascii_lowercase();
    let limit = lower[start..]
        .find("</script")
        .map_or(text.len(), |off| start + off);

    let mut stack: Vec<u8> = Vec::new();
    for (pos, b) in script_delimiters(text, start..limit) {
        match b {
            b'{' | b'[' => stack.push(b),
            b'(' if !stack.is_empty() => stack.push(b),
            b'}' | b']' | b')' if !stack.is_empty() => {
                let open = stack.pop()?;
                if closer_for(open) != b {
                    return None;
                }
                if stack.is_empty() {
                    return Some(start..include_semicolon(text, pos + 1));
                }
            }
            _ => {}
        }
    }

    None
}

/// 块后紧跟的 `;`（允许中间有空格）计入块内
fn include_semicolon(text: &str, end: usize) -> usize {
    let rest = &text[end..];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    if trimmed.starts_with(';') {
        end + (rest.len() - trimmed.len()) + 1
    } else {
        end
    }
}

fn markup_block_extent(text: &str, start: usize, tag: &str) -> Option<Range<usize>> {
    let scan = scan_markup(text);
    let first = scan
        .tags
        .iter()
        .position(|t| t.start == start && !t.closing && t.name == tag)?;

    let mut depth = 0usize;
    for token in scan.tags[first..].iter().filter(|t| t.name == tag) {
        if token.closing {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(start..token.end);
            }
        } else {
            depth += 1;
        }
    }

    None
}

/// 一种分隔符的计数差异
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Imbalance {
    /// 分隔符描述，例如 `{}` 或 `<div>`
    pub delimiter: String,
    pub opened: usize,
    pub closed: usize,
}

impl fmt::Display for Imbalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} 打开 {} 次, 关闭 {} 次",
            self.delimiter, self.opened, self.closed
        )
    }
}

/// 平衡检查结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceReport {
    pub imbalances: Vec<Imbalance>,
}

impl BalanceReport {
    pub fn is_balanced(&self) -> bool {
        self.imbalances.is_empty()
    }

    /// 单行描述，用于错误信息
    pub fn summary(&self) -> String {
        self.imbalances
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// 检查整个文档的成对分隔符是否平衡
pub fn check_balance(text: &str) -> BalanceReport {
    let scan = scan_markup(text);
    let mut report = BalanceReport::default();

    for tag in TRACKED_TAGS {
        let opened = scan
            .tags
            .iter()
            .filter(|t| !t.closing && t.name == *tag)
            .count();
        let closed = scan
            .tags
            .iter()
            .filter(|t| t.closing && t.name == *tag)
            .count();
        if opened != closed {
            report.imbalances.push(Imbalance {
                delimiter: format!("<{}>", tag),
                opened,
                closed,
            });
        }
    }

    let mut counts = [0usize; 6];
    for (kind, range) in &scan.raw_regions {
        let delimiters = match kind {
            RawKind::Script => script_delimiters(text, range.clone()),
            RawKind::Style => style_delimiters(text, range.clone()),
        };
        for (_, b) in delimiters {
            let slot = match b {
                b'{' => 0,
                b'}' => 1,
                b'[' => 2,
                b']' => 3,
                b'(' => 4,
                _ => 5,
            };
            counts[slot] += 1;
        }
    }

    for (pair, opened, closed) in [
        ("{}", counts[0], counts[1]),
        ("[]", counts[2], counts[3]),
        ("()", counts[4], counts[5]),
    ] {
        if opened != closed {
            report.imbalances.push(Imbalance {
                delimiter: pair.to_string(),
                opened,
                closed,
            });
        }
    }

    report
}
