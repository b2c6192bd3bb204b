//! 回复字段定义：字段名 + 值解析器，以及解析结果容器

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// 字段值解析器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueParser {
    /// 原样保留（去首尾空白）
    Text,
    /// 取第一个数字作为百分比，见 [`fuzzy_percent`]
    FuzzyPercent,
}

/// 解析后的字段值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Percent(u32),
}

impl ValueParser {
    /// 解析失败返回 None（整个回复随之作废）
    pub fn parse(&self, raw: &str) -> Option<FieldValue> {
        match self {
            ValueParser::Text => Some(FieldValue::Text(raw.trim().to_string())),
            ValueParser::FuzzyPercent => fuzzy_percent(raw).map(FieldValue::Percent),
        }
    }
}

/// 要求 LLM 回填的一个字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseField {
    pub name: String,
    pub parser: ValueParser,
}

impl ResponseField {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parser: ValueParser::Text,
        }
    }

    pub fn percent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parser: ValueParser::FuzzyPercent,
        }
    }
}

/// 一次成功解析的全部字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    values: HashMap<String, FieldValue>,
}

impl ParsedFields {
    pub(crate) fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.values.insert(name.into(), value);
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn percent(&self, name: &str) -> Option<u32> {
        match self.values.get(name) {
            Some(FieldValue::Percent(p)) => Some(*p),
            _ => None,
        }
    }
}

fn percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([0-9]+(?:\.[0-9]+)?)%?\b").expect("static regex"))
}

/// 宽松百分比：取文本中第一个（整数或小数）数字，截断为整数
///
/// `"60% (up from 40%)"` -> 60，`"about 60 percent"` -> 60，`"foo"` -> None
pub fn fuzzy_percent(s: &str) -> Option<u32> {
    let caps = percent_regex().captures(s.trim())?;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(number as u32)
}

/// 将人名转换为字段名片段：大写、空格转下划线、去掉 `[A-Z_]` 以外的字符
pub fn field_key(name: &str) -> String {
    name.to_uppercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_uppercase() || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzzy_percent() {
        assert_eq!(fuzzy_percent("60"), Some(60));
        assert_eq!(fuzzy_percent("60%"), Some(60));
        assert_eq!(fuzzy_percent("60.5%"), Some(60));
        assert_eq!(fuzzy_percent("\n\n    60%\n\n    "), Some(60));
        assert_eq!(fuzzy_percent("60% (up from 40%)"), Some(60));
        assert_eq!(fuzzy_percent("about 60 percent"), Some(60));
        assert_eq!(fuzzy_percent("i would say about 60% accurate"), Some(60));
        assert_eq!(fuzzy_percent("60\n\n i am more than 50 percent confident"), Some(60));
        assert_eq!(fuzzy_percent(""), None);
        assert_eq!(fuzzy_percent("foo"), None);
    }

    #[test]
    fn test_fuzzy_percent_skips_non_ascii_digits() {
        assert_eq!(fuzzy_percent("٣ then 60%"), Some(60));
        assert_eq!(fuzzy_percent("٣٤"), None);
    }

    #[test]
    fn test_fuzzy_percent_is_idempotent() {
        for s in ["60% (up from 40%)", "roughly 12.9", "100", "0%", "x 7 y 8"] {
            let once = fuzzy_percent(s).unwrap();
            assert_eq!(fuzzy_percent(&once.to_string()), Some(once), "input {s:?}");
        }
    }

    #[test]
    fn test_field_key() {
        assert_eq!(field_key("Homer Simpson"), "HOMER_SIMPSON");
        assert_eq!(field_key("Dana Scully"), "DANA_SCULLY");
        assert_eq!(field_key("Liutentant Worf"), "LIUTENTANT_WORF");
        assert_eq!(field_key("The Log-Lady 2"), "THE_LOGLADY_");
    }

    #[test]
    fn test_value_parser() {
        assert_eq!(
            ValueParser::Text.parse("  grumpy \n"),
            Some(FieldValue::Text("grumpy".into()))
        );
        assert_eq!(ValueParser::FuzzyPercent.parse("no idea"), None);
        assert_eq!(
            ValueParser::FuzzyPercent.parse("75%"),
            Some(FieldValue::Percent(75))
        );
    }
}
