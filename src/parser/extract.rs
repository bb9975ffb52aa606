//! SchemaParser：分层策略级联
//!
//! 策略顺序（先成者胜）：
//! 1. 已结构化对象直接投影
//! 2. 整串直接 JSON 解析
//! 3. ``` 代码块提取（可带 json 标记），归一化引号与 Python 字面量后解析
//! 4. 首个 `{...}` 宽松提取，归一化后解析
//! 5. 逐字段正则提取（按字段类型定制模式，Object 递归嵌套 schema）
//! 6. 全部失败时返回调用方提供的默认值（克隆返回，不共享）
//!
//! 任何策略内部的失败都被捕获并记录，parse 永不向调用方抛错。

use std::collections::HashMap;

use regex::Regex;
use serde_json::{Map, Value};

use super::schema::{FieldSchema, FieldType};

/// 解析输入的封闭类型：原始文本或已结构化对象
#[derive(Debug, Clone)]
pub enum RawResponse {
    Text(String),
    Structured(Map<String, Value>),
}

impl From<&str> for RawResponse {
    fn from(s: &str) -> Self {
        RawResponse::Text(s.to_string())
    }
}

impl From<String> for RawResponse {
    fn from(s: String) -> Self {
        RawResponse::Text(s)
    }
}

impl From<Map<String, Value>> for RawResponse {
    fn from(m: Map<String, Value>) -> Self {
        RawResponse::Structured(m)
    }
}

impl From<Value> for RawResponse {
    fn from(v: Value) -> Self {
        match v {
            Value::Object(m) => RawResponse::Structured(m),
            Value::String(s) => RawResponse::Text(s),
            other => RawResponse::Text(other.to_string()),
        }
    }
}

/// Schema 驱动的 JSON 恢复解析器
pub struct SchemaParser {
    schema: Vec<FieldSchema>,
    default_value: Map<String, Value>,
    field_regexes: HashMap<String, Regex>,
    code_block_re: Regex,
    brace_re: Regex,
}

impl SchemaParser {
    pub fn new(schema: Vec<FieldSchema>) -> Self {
        Self::with_default(schema, Map::new())
    }

    pub fn with_default(schema: Vec<FieldSchema>, default_value: Map<String, Value>) -> Self {
        let field_regexes = schema
            .iter()
            .map(|f| (f.name.clone(), field_regex(&f.name, f.field_type)))
            .collect();
        Self {
            schema,
            default_value,
            field_regexes,
            code_block_re: Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```")
                .expect("static regex"),
            brace_re: Regex::new(r"(?s)\{.*?\}").expect("static regex"),
        }
    }

    /// 解析响应，永不失败；最坏情况返回默认值的克隆
    pub fn parse(&self, response: impl Into<RawResponse>) -> Map<String, Value> {
        match response.into() {
            RawResponse::Structured(obj) => {
                tracing::debug!("response already structured, projecting schema fields");
                self.project(&obj)
            }
            RawResponse::Text(text) => self
                .try_direct(&text)
                .or_else(|| self.try_code_block(&text))
                .or_else(|| self.try_brace_span(&text))
                .or_else(|| self.try_field_by_field(&text))
                .unwrap_or_else(|| {
                    tracing::warn!("all parsing strategies failed, returning default value");
                    self.default_value.clone()
                }),
        }
    }

    /// 策略 2：整串直接 JSON 解析
    fn try_direct(&self, text: &str) -> Option<Map<String, Value>> {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(obj)) => {
                tracing::debug!("parsed JSON directly");
                Some(self.project(&obj))
            }
            _ => {
                tracing::debug!("direct JSON parsing failed");
                None
            }
        }
    }

    /// 策略 3：代码块提取
    fn try_code_block(&self, text: &str) -> Option<Map<String, Value>> {
        let captured = self.code_block_re.captures(text)?.get(1)?.as_str();
        match serde_json::from_str::<Value>(&normalize_json(captured)) {
            Ok(Value::Object(obj)) => {
                tracing::debug!("parsed JSON from code block");
                Some(self.project(&obj))
            }
            _ => {
                tracing::debug!("failed to parse JSON from code block");
                None
            }
        }
    }

    /// 策略 4：首个 `{...}` 宽松提取
    fn try_brace_span(&self, text: &str) -> Option<Map<String, Value>> {
        let span = self.brace_re.find(text)?.as_str();
        match serde_json::from_str::<Value>(&normalize_json(span)) {
            Ok(Value::Object(obj)) => {
                tracing::debug!("parsed JSON from brace span");
                Some(self.project(&obj))
            }
            _ => {
                tracing::debug!("failed to parse JSON from brace span");
                None
            }
        }
    }

    /// 策略 5：逐字段正则提取
    ///
    /// 每个字段独立在全文中搜索；必填字段未命中仍以 null 键出现，
    /// 非必填未命中则整键省略。一个字段都没找到视为策略失败。
    fn try_field_by_field(&self, text: &str) -> Option<Map<String, Value>> {
        tracing::debug!("attempting field-by-field regex extraction");
        let mut found: HashMap<&str, Value> = HashMap::new();
        for field in &self.schema {
            let re = match self.field_regexes.get(&field.name) {
                Some(re) => re,
                None => continue,
            };
            if let Some(caps) = re.captures(text) {
                if let Some(raw) = caps.get(1) {
                    let value = convert_value(raw.as_str(), field.field_type, field.nested.as_deref());
                    if !value.is_null() {
                        found.insert(field.name.as_str(), value);
                    }
                }
            }
        }

        if found.is_empty() {
            tracing::debug!("field-by-field extraction found no fields");
            return None;
        }

        let mut result = Map::new();
        for field in &self.schema {
            match found.remove(field.name.as_str()) {
                Some(value) => {
                    result.insert(field.name.clone(), value);
                }
                None if field.required => {
                    result.insert(field.name.clone(), Value::Null);
                }
                None => {}
            }
        }
        Some(result)
    }

    /// 按 schema 投影已解析对象：未知键丢弃，缺失的必填键以 null 出现，
    /// Object 字段带嵌套 schema 时递归投影
    fn project(&self, obj: &Map<String, Value>) -> Map<String, Value> {
        let mut result = Map::new();
        for field in &self.schema {
            match obj.get(&field.name) {
                Some(value) => {
                    let projected = match (&field.nested, value) {
                        (Some(nested), Value::Object(inner))
                            if field.field_type == FieldType::Object =>
                        {
                            Value::Object(SchemaParser::new(nested.clone()).project(inner))
                        }
                        _ => value.clone(),
                    };
                    result.insert(field.name.clone(), projected);
                }
                None if field.required => {
                    result.insert(field.name.clone(), Value::Null);
                }
                None => {}
            }
        }
        result
    }
}

/// Python 字面量归一化：单引号转双引号，True/False/None 转 JSON 小写
fn normalize_json(s: &str) -> String {
    s.replace('\'', "\"")
        .replace("True", "true")
        .replace("False", "false")
        .replace("None", "null")
}

/// 按字段类型构造提取正则；名称引号可省略，分隔符容忍 `:`、`=` 与 "is"
///
/// 名称前置边界保护：前一个字符不得是标识符字符，防止短字段名
/// 命中更长标识符的后缀（如 `value` 命中 `actual_value`）。
fn field_regex(name: &str, field_type: FieldType) -> Regex {
    let name_pattern = format!(
        r#"(?:^|[^\w"'])["']?{}["']?(?:\s*[:=]\s*|\s+is\s+)"#,
        regex::escape(name)
    );
    let value_pattern = match field_type {
        // 跨行非贪婪捕获到下一个合法收尾引号，容忍内嵌标点与换行
        FieldType::String => r#""([\s\S]+?)""#,
        // 数字可能被误加引号（LLM 常见），引号可选
        FieldType::Number => r#"["']?(-?[0-9]+(?:\.[0-9]+)?)"#,
        FieldType::Boolean => r"(true|false|True|False)",
        FieldType::Object => r"(\{[\s\S]*?\})",
        FieldType::Array => r"(\[[\s\S]*?\])",
    };
    Regex::new(&format!("{}{}", name_pattern, value_pattern)).expect("field regex")
}

/// 将正则捕获的原始串转为目标类型的 JSON 值；转换失败返回 Null
fn convert_value(raw: &str, field_type: FieldType, nested: Option<&[FieldSchema]>) -> Value {
    match field_type {
        FieldType::Number => {
            if raw.contains('.') {
                raw.parse::<f64>().map(Value::from).unwrap_or(Value::Null)
            } else {
                raw.parse::<i64>().map(Value::from).unwrap_or(Value::Null)
            }
        }
        FieldType::Boolean => Value::Bool(raw.eq_ignore_ascii_case("true")),
        FieldType::Object => match serde_json::from_str::<Value>(&normalize_json(raw)) {
            Ok(Value::Object(obj)) => match nested {
                Some(schema) => {
                    Value::Object(SchemaParser::new(schema.to_vec()).project(&obj))
                }
                None => Value::Object(obj),
            },
            Ok(other) => other,
            Err(_) => Value::String(raw.to_string()),
        },
        FieldType::Array => serde_json::from_str::<Value>(&normalize_json(raw))
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        FieldType::String => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn player_schema() -> Vec<FieldSchema> {
        vec![
            FieldSchema::number("value", true),
            FieldSchema::number("range_low", true),
            FieldSchema::number("range_high", true),
            FieldSchema::number("confidence", true),
            FieldSchema::string("explanation", true),
        ]
    }

    fn player_default() -> Map<String, Value> {
        json!({
            "value": null,
            "range_low": null,
            "range_high": null,
            "confidence": 0,
            "explanation": "Failed to parse prediction"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_parse_never_fails() {
        let parser = SchemaParser::with_default(player_schema(), player_default());
        for input in ["", "   ", "garbage {{{", "null", "[1,2,3]"] {
            let result = parser.parse(input);
            assert_eq!(result, player_default(), "input: {input:?}");
        }
    }

    #[test]
    fn test_passthrough_structured_drops_unknown_keys() {
        let parser = SchemaParser::new(player_schema());
        let input = json!({
            "value": 24.5,
            "range_low": 21.0,
            "range_high": 28.0,
            "confidence": 0.75,
            "explanation": "ok",
            "unknown_key": "dropped"
        });
        let result = parser.parse(input.clone());
        assert!(result.get("unknown_key").is_none());
        assert_eq!(result.get("value"), Some(&json!(24.5)));
        assert_eq!(result.get("explanation"), Some(&json!("ok")));
    }

    #[test]
    fn test_direct_json_wins_over_code_block() {
        let parser = SchemaParser::new(player_schema());
        // 整体是合法 JSON，explanation 内还藏着一个不同的代码块对象
        let input = json!({
            "value": 10.0,
            "range_low": 8.0,
            "range_high": 12.0,
            "confidence": 0.5,
            "explanation": "```json {\"value\": 99.0}```"
        })
        .to_string();
        let result = parser.parse(input.as_str());
        assert_eq!(result.get("value"), Some(&json!(10.0)));
    }

    #[test]
    fn test_code_block_extraction() {
        let parser = SchemaParser::with_default(player_schema(), player_default());
        let input = "Here is my analysis.\n```json\n{\"value\": 24.5, \"range_low\": 21.0, \"range_high\": 28.0, \"confidence\": 0.75, \"explanation\": \"Strong recent form\"}\n```\n";
        let result = parser.parse(input);
        assert_eq!(result.get("value"), Some(&json!(24.5)));
        assert_eq!(result.get("range_low"), Some(&json!(21.0)));
        assert_eq!(result.get("range_high"), Some(&json!(28.0)));
        assert_eq!(result.get("confidence"), Some(&json!(0.75)));
        assert_eq!(result.get("explanation"), Some(&json!("Strong recent form")));
    }

    #[test]
    fn test_python_literal_normalization() {
        let parser = SchemaParser::new(vec![
            FieldSchema::string("explanation", true),
            FieldSchema::boolean("over", true),
            FieldSchema::number("value", false),
        ]);
        let input = "result: {'explanation': 'tight rotation', 'over': True, 'value': None}";
        let result = parser.parse(input);
        assert_eq!(result.get("explanation"), Some(&json!("tight rotation")));
        assert_eq!(result.get("over"), Some(&json!(true)));
        assert_eq!(result.get("value"), Some(&Value::Null));
    }

    #[test]
    fn test_fallback_returns_default_by_value() {
        let parser = SchemaParser::with_default(player_schema(), player_default());
        let result = parser.parse("I don't know, sorry.");
        assert_eq!(result, player_default());
        // 默认值是克隆返回：两次调用互不共享
        let again = parser.parse("still nothing");
        assert_eq!(again, player_default());
    }

    #[test]
    fn test_field_by_field_extraction() {
        let parser = SchemaParser::with_default(player_schema(), player_default());
        let input = r#"value is 30 and confidence: 0.9 but explanation: "good matchup""#;
        let result = parser.parse(input);
        assert_eq!(result.get("value"), Some(&json!(30)));
        assert_eq!(result.get("confidence"), Some(&json!(0.9)));
        assert_eq!(result.get("explanation"), Some(&json!("good matchup")));
        // 必填但未命中的字段以 null 键出现
        assert_eq!(result.get("range_low"), Some(&Value::Null));
        assert_eq!(result.get("range_high"), Some(&Value::Null));
    }

    #[test]
    fn test_optional_field_omitted_when_absent() {
        let schema = vec![
            FieldSchema::number("value", true),
            FieldSchema::string("prizepicks_line", false),
        ];
        let parser = SchemaParser::new(schema);
        let result = parser.parse("\"value\": 12");
        assert_eq!(result.get("value"), Some(&json!(12)));
        assert!(!result.contains_key("prizepicks_line"));
    }

    #[test]
    fn test_quoted_numeric_coerces_to_float() {
        let parser = SchemaParser::new(vec![FieldSchema::number("value", true)]);
        let result = parser.parse("the line sits at \"value\": \"24.5\" tonight");
        assert_eq!(result.get("value"), Some(&json!(24.5)));
    }

    #[test]
    fn test_multiline_string_capture() {
        let parser = SchemaParser::new(vec![
            FieldSchema::number("value", true),
            FieldSchema::string("explanation", true),
        ]);
        let input = "value: 21\n\"explanation\": \"He has scored 20+ in 5 straight,\nand the opponent ranks 28th in defense\"";
        let result = parser.parse(input);
        let explanation = result
            .get("explanation")
            .and_then(Value::as_str)
            .unwrap_or_default();
        assert!(explanation.contains('\n'));
        assert!(explanation.contains("28th in defense"));
    }

    #[test]
    fn test_nested_object_recursion_in_code_block() {
        let schema = vec![FieldSchema::object(
            "independent_analysis",
            true,
            vec![
                FieldSchema::number("value", true),
                FieldSchema::number("confidence", true),
            ],
        )];
        let parser = SchemaParser::new(schema);
        let input = "analysis below\n```json\n{\"independent_analysis\": {\"value\": 18.0, \"confidence\": 0.6, \"extra\": 1}}\n```";
        let result = parser.parse(input);
        let inner = result
            .get("independent_analysis")
            .and_then(Value::as_object)
            .expect("nested object");
        assert_eq!(inner.get("value"), Some(&json!(18.0)));
        assert_eq!(inner.get("confidence"), Some(&json!(0.6)));
        assert!(inner.get("extra").is_none());
    }

    #[test]
    fn test_field_name_does_not_match_longer_identifier_suffix() {
        let parser = SchemaParser::new(vec![FieldSchema::number("value", true)]);
        // `actual_value` 不是 `value`，不得被后缀命中
        let result = parser.parse("the log line said actual_value: 42 yesterday");
        assert!(result.is_empty());
        // 无引号、行首出现时仍可命中
        let positive = parser.parse("value is 30 tonight");
        assert_eq!(positive.get("value"), Some(&json!(30)));
    }

    #[test]
    fn test_partial_json_falls_through_to_field_extraction() {
        let parser = SchemaParser::with_default(player_schema(), player_default());
        // 大括号段不是合法 JSON（缺引号键），但字段正则可抢救
        let input = "{broken json, \"value\": 25.0, \"confidence\": 0.8}";
        let result = parser.parse(input);
        assert_eq!(result.get("value"), Some(&json!(25.0)));
        assert_eq!(result.get("confidence"), Some(&json!(0.8)));
        assert_eq!(result.get("explanation"), Some(&Value::Null));
    }
}
