//! 回复协议：把自由文本回复变成带类型、经过校验的字段
//!
//! - `format_prompt`：告诉 LLM 按 `FIELD:` 模板回填
//! - `parse_response`：全有或全无地解析回复
//! - `generate_structured`：解析失败时有界重试

pub mod fields;
pub mod parser;

pub use fields::{field_key, fuzzy_percent, FieldValue, ParsedFields, ResponseField, ValueParser};
pub use parser::{format_prompt, generate_structured, parse_response};
