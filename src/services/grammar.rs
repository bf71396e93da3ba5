//! 提取规则 - 业务能力层
//!
//! 每条规则都是纯函数 `&str -> Option<Parsed<T>>`，按优先级排列成有序列表。
//! 第一条产生非空结果的规则胜出，后面的规则不再尝试。

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ObjectiveList, Question};
use crate::services::balance::{block_extent, BlockSyntax};

/// 带引号的字符串字面量（双引号或单引号，支持转义）
const STRING_LITERAL: &str = r#"(?:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')"#;

static STRING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(STRING_LITERAL).unwrap());

static BANK_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"const\s+bank\s*=\s*\[").unwrap());

static BANK_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"\{{\s*["']?q["']?\s*:\s*({s})\s*,\s*["']?c["']?\s*:\s*\[((?:\s*{s}\s*,?)*)\s*\]\s*,\s*["']?a["']?\s*:\s*(\d+)\s*,?\s*\}}"#,
        s = STRING_LITERAL
    ))
    .unwrap()
});

static LEGACY_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"const\s+questions\s*=\s*\[").unwrap());

static LEGACY_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"\{{\s*["']?question["']?\s*:\s*({s})\s*,\s*["']?answers["']?\s*:\s*\[((?:\s*{s}\s*,?)*)\s*\]\s*,\s*["']?correct["']?\s*:\s*(\d+)\s*,?\s*\}}"#,
        s = STRING_LITERAL
    ))
    .unwrap()
});

static ARTICLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<article\b([^>]*)>(.*?)</article>").unwrap());

static PROMPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<strong[^>]*>\s*\d+\s*[)\-.]\s*(.*?)</strong>").unwrap());

static CHOICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<div\s+class="choice"([^>]*)>(.*?)</div>"#).unwrap());

static DATA_CORRECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-correct\s*=\s*"(true|false)""#).unwrap());

static STRICT_OBJECTIVES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<h1>\s*🎯 أهداف الدرس\s*</h1>\s*<p class="lead">(.*?)</p>\s*<ul[^>]*>(.*?)</ul>"#)
        .unwrap()
});

static LOOSE_OBJECTIVES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="[^"]*objectives[^"]*"[^>]*>(.*?)<ul[^>]*>(.*?)</ul>"#).unwrap()
});

static PARAGRAPH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<p[^>]*>(.*?)</p>").unwrap());

static LI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<li[^>]*>(.*?)</li>").unwrap());

static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

static H1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap());

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// 规则的解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    /// 被丢弃条目的原因（例如违反题目约束）
    pub rejected: Vec<String>,
}

impl<T> Parsed<T> {
    fn clean(value: T) -> Self {
        Self {
            value,
            rejected: Vec::new(),
        }
    }
}

/// 一条提取规则
pub struct GrammarRule<T> {
    pub name: &'static str,
    pub apply: fn(&str) -> Option<Parsed<T>>,
}

/// 题目规则（按优先级）
pub const QUESTION_RULES: &[GrammarRule<Vec<Question>>] = &[
    GrammarRule {
        name: "field_labelled_bank",
        apply: parse_bank,
    },
    GrammarRule {
        name: "legacy_question_array",
        apply: parse_legacy_questions,
    },
    GrammarRule {
        name: "positional_markup",
        apply: parse_markup_questions,
    },
];

/// 学习目标规则（按优先级）
pub const OBJECTIVE_RULES: &[GrammarRule<ObjectiveList>] = &[
    GrammarRule {
        name: "strict_objectives_card",
        apply: parse_strict_objectives,
    },
    GrammarRule {
        name: "loose_objectives_card",
        apply: parse_loose_objectives,
    },
];

/// 标题规则（按优先级）
pub const TITLE_RULES: &[GrammarRule<String>] = &[
    GrammarRule {
        name: "title_tag",
        apply: parse_title_tag,
    },
    GrammarRule {
        name: "first_heading",
        apply: parse_first_heading,
    },
];

/// 规则结果是否为空（空结果不算命中）
pub trait RuleValue {
    fn is_empty(&self) -> bool;
}

impl RuleValue for Vec<Question> {
    fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl RuleValue for ObjectiveList {
    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl RuleValue for String {
    fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

/// 规则链的结果
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch<T> {
    /// 第一个给出非空结果的规则名和结果
    pub hit: Option<(&'static str, T)>,
    /// 所有尝试过的规则丢弃的条目，包括命中之前只产生了丢弃条目的规则
    pub rejected: Vec<String>,
}

/// 依次尝试规则，直到某条规则给出非空结果
pub fn first_match<T: RuleValue>(rules: &[GrammarRule<T>], text: &str) -> RuleMatch<T> {
    let mut rejected = Vec::new();
    for rule in rules {
        let Some(parsed) = (rule.apply)(text) else {
            continue;
        };
        rejected.extend(parsed.rejected);
        if !RuleValue::is_empty(&parsed.value) {
            return RuleMatch {
                hit: Some((rule.name, parsed.value)),
                rejected,
            };
        }
    }
    RuleMatch {
        hit: None,
        rejected,
    }
}

// ========== 题目规则 ==========

fn parse_bank(text: &str) -> Option<Parsed<Vec<Question>>> {
    parse_script_questions(text, &BANK_START_RE, &BANK_ITEM_RE)
}

fn parse_legacy_questions(text: &str) -> Option<Parsed<Vec<Question>>> {
    parse_script_questions(text, &LEGACY_START_RE, &LEGACY_ITEM_RE)
}

/// 脚本数组形式的题库：先定位数组区域，再逐条匹配对象
///
/// 数组不完整时退化为从起点扫描到脚本结束，尽量多取题目
fn parse_script_questions(
    text: &str,
    start_re: &Regex,
    item_re: &Regex,
) -> Option<Parsed<Vec<Question>>> {
    let start = start_re.find(text)?.start();
    let region = match block_extent(text, start, BlockSyntax::Script) {
        Some(range) => &text[range],
        None => {
            let rest = &text[start..];
            let end = rest.find("</script>").unwrap_or(rest.len());
            &rest[..end]
        }
    };

    let mut parsed = Parsed::clean(Vec::new());
    for caps in item_re.captures_iter(region) {
        let prompt = unquote(&caps[1]);
        let choices: Vec<String> = STRING_RE
            .find_iter(&caps[2])
            .map(|m| unquote(m.as_str()))
            .collect();
        let correct = caps[3].parse::<usize>().unwrap_or(usize::MAX);

        match Question::new(prompt, choices, correct) {
            Ok(q) => parsed.value.push(q),
            Err(reason) => parsed.rejected.push(reason),
        }
    }

    non_empty(parsed)
}

fn parse_markup_questions(text: &str) -> Option<Parsed<Vec<Question>>> {
    let mut parsed = Parsed::clean(Vec::new());

    for caps in ARTICLE_RE.captures_iter(text) {
        let attrs = &caps[1];
        if !attrs.contains(r#"class="q""#) || !attrs.contains("data-qid") {
            continue;
        }
        let body = &caps[2];

        let Some(prompt) = PROMPT_RE.captures(body).map(|c| strip_tags(&c[1])) else {
            parsed.rejected.push("题目缺少 <strong> 题干".to_string());
            continue;
        };

        let mut choices = Vec::new();
        let mut correct = None;
        for choice in CHOICE_RE.captures_iter(body) {
            let is_correct = DATA_CORRECT_RE
                .captures(&choice[1])
                .is_some_and(|c| &c[1] == "true");
            if is_correct && correct.is_none() {
                correct = Some(choices.len());
            }
            choices.push(strip_tags(&choice[2]));
        }

        let Some(correct) = correct else {
            parsed
                .rejected
                .push(format!("题目 '{}' 没有标记正确答案", prompt));
            continue;
        };

        match Question::new(prompt, choices, correct) {
            Ok(q) => parsed.value.push(q),
            Err(reason) => parsed.rejected.push(reason),
        }
    }

    non_empty(parsed)
}

// ========== 学习目标规则 ==========

fn parse_strict_objectives(text: &str) -> Option<Parsed<ObjectiveList>> {
    let caps = STRICT_OBJECTIVES_RE.captures(text)?;
    let items: Vec<String> = LI_RE
        .captures_iter(&caps[2])
        .map(|c| c[1].trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    let list = ObjectiveList {
        description: caps[1].trim().to_string(),
        items,
    };
    (!list.is_empty()).then(|| Parsed::clean(list))
}

fn parse_loose_objectives(text: &str) -> Option<Parsed<ObjectiveList>> {
    let caps = LOOSE_OBJECTIVES_RE.captures(text)?;
    let description = PARAGRAPH_RE
        .captures(&caps[1])
        .map(|c| strip_tags(&c[1]))
        .unwrap_or_default();
    let items: Vec<String> = LI_RE
        .captures_iter(&caps[2])
        .map(|c| strip_tags(&c[1]))
        .filter(|item| !item.is_empty())
        .collect();

    let list = ObjectiveList { description, items };
    (!list.is_empty()).then(|| Parsed::clean(list))
}

// ========== 标题规则 ==========

fn parse_title_tag(text: &str) -> Option<Parsed<String>> {
    non_empty_text(&TITLE_RE, text)
}

fn parse_first_heading(text: &str) -> Option<Parsed<String>> {
    non_empty_text(&H1_RE, text)
}

fn non_empty_text(re: &Regex, text: &str) -> Option<Parsed<String>> {
    let title = strip_tags(&re.captures(text)?[1]);
    (!title.is_empty()).then(|| Parsed::clean(title))
}

// ========== 工具函数 ==========

/// 有结果或有被丢弃的条目时返回，是否命中由 `first_match` 判断
fn non_empty(parsed: Parsed<Vec<Question>>) -> Option<Parsed<Vec<Question>>> {
    (!parsed.value.is_empty() || !parsed.rejected.is_empty()).then_some(parsed)
}

/// 去掉标签并压缩空白
pub fn strip_tags(html: &str) -> String {
    let text = TAG_RE.replace_all(html, "");
    SPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// 去掉字符串字面量两侧的引号并还原转义
pub fn unquote(literal: &str) -> String {
    let inner = if literal.len() >= 2 {
        &literal[1..literal.len() - 1]
    } else {
        literal
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
