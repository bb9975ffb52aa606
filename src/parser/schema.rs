//! 字段 Schema：描述期望输出的每个字段（名称、类型、是否必填、嵌套 schema）
//!
//! 纯数据，无行为。nested 仅在 Object 类型上合法，由构造函数保证。

/// 字段类型（决定逐字段正则提取时使用的值模式）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

/// 单个期望字段的定义
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
    /// 必填字段解析缺失时仍以 null 值出现在结果中（调用方依赖键存在）
    pub required: bool,
    /// 仅 Object 类型可携带嵌套 schema，用于递归提取
    pub nested: Option<Vec<FieldSchema>>,
}

impl FieldSchema {
    fn new(name: impl Into<String>, field_type: FieldType, required: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            required,
            nested: None,
        }
    }

    pub fn string(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, FieldType::String, required)
    }

    pub fn number(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, FieldType::Number, required)
    }

    pub fn boolean(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, FieldType::Boolean, required)
    }

    pub fn array(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, FieldType::Array, required)
    }

    /// Object 字段：唯一允许携带 nested schema 的构造路径
    pub fn object(name: impl Into<String>, required: bool, nested: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Object,
            required,
            nested: Some(nested),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_only_on_object() {
        let plain = FieldSchema::number("value", true);
        assert!(plain.nested.is_none());

        let obj = FieldSchema::object(
            "analysis",
            true,
            vec![FieldSchema::number("value", true)],
        );
        assert_eq!(obj.field_type, FieldType::Object);
        assert_eq!(obj.nested.as_ref().map(|n| n.len()), Some(1));
    }
}
