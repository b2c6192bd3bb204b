//! 字段模板生成与回复解析

use regex::Regex;

use crate::llm::{LlmError, TextGenerator};
use crate::protocol::{ParsedFields, ResponseField};

/// 生成回填模板：每个字段名加冒号，按顺序以空行分隔
pub fn format_prompt(fields: &[ResponseField]) -> String {
    fields
        .iter()
        .map(|f| format!("{}:", f.name))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 按字段模板解析回复
///
/// 每个字段取 `NAME:` 之后、到下一个已知 `FIELD:` 或文本结尾之间的内容，去空白后交给值解析器。
/// 任一字段缺失或值解析失败，整体返回 None（不接受部分结果）。
pub fn parse_response(text: &str, fields: &[ResponseField]) -> Option<ParsedFields> {
    let mut parsed = ParsedFields::default();
    if fields.is_empty() {
        return Some(parsed);
    }

    let alternatives = fields
        .iter()
        .map(|f| regex::escape(&f.name))
        .collect::<Vec<_>>()
        .join("|");
    let any_field = Regex::new(&format!(r"\b(?:{}):", alternatives)).ok()?;

    for field in fields {
        let own = Regex::new(&format!(r"\b{}:", regex::escape(&field.name))).ok()?;
        let start = own.find(text)?.end();
        let end = any_field
            .find_at(text, start)
            .map(|m| m.start())
            .unwrap_or(text.len());
        let value = field.parser.parse(text[start..end].trim())?;
        parsed.insert(field.name.clone(), value);
    }

    Some(parsed)
}

/// 生成并解析，解析失败时重新生成，最多 `max_attempts` 次
///
/// - `Ok(Some(_))`：某次生成解析成功
/// - `Ok(None)`：次数耗尽，调用方自行降级
/// - `Err(_)`：后端错误已耗尽 TextGenerator 的重试，属于致命错误
pub async fn generate_structured(
    generator: &TextGenerator,
    prompt: &str,
    fields: &[ResponseField],
    max_attempts: u32,
) -> Result<Option<ParsedFields>, LlmError> {
    for attempt in 1..=max_attempts {
        let output = generator.generate(prompt).await?;
        if let Some(parsed) = parse_response(&output, fields) {
            return Ok(Some(parsed));
        }
        tracing::debug!(attempt, "Reply did not match the field template, regenerating");
    }
    Ok(None)
}
