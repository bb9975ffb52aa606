//! 结构化响应解析层：Schema 定义与多策略提取
//!
//! LLM 的回复可能是合法 JSON、代码块包裹的 JSON、Python 字面量 dict、
//! 或只能逐字段正则抢救的散文。SchemaParser 按 schema 做分层提取，
//! 保证永不向调用方抛错（最坏情况返回默认值）。

pub mod extract;
pub mod schema;

pub use extract::{RawResponse, SchemaParser};
pub use schema::{FieldSchema, FieldType};
