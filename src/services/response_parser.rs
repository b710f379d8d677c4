//! AI 响应解析 - 业务能力层
//!
//! 模型返回的是自由文本，可能带 Markdown 代码块。这里负责：
//! 1. 去掉代码块标记
//! 2. 先整体解析 JSON，失败再截取第一个 `{...}` / `[...]`
//! 3. 逐字段校验，得到 `Question` 或描述性的错误

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::GenerationError;
use crate::models::question::{Question, OPTION_COUNT};

fn code_fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(?:json|JSON)?\n?|\n?```").expect("valid regex"))
}

fn object_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"))
}

fn array_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("valid regex"))
}

/// 去掉 Markdown 代码块标记
pub fn strip_code_fences(text: &str) -> String {
    code_fence_regex().replace_all(text, "").trim().to_string()
}

/// 解析单题响应
pub fn parse_question(raw: &str) -> Result<Question, GenerationError> {
    let value = extract_json(
        raw,
        object_regex(),
        JsonValue::is_object,
        GenerationError::InvalidFormat("响应不是 JSON 对象".to_string()),
    )?;
    validate_question(&value).map_err(GenerationError::InvalidFormat)
}

/// 解析批量响应，只保留结构有效的题目
pub fn parse_question_batch(raw: &str) -> Result<Vec<Question>, GenerationError> {
    let value = extract_json(raw, array_regex(), JsonValue::is_array, GenerationError::NotAnArray)?;
    let entries = value.as_array().ok_or(GenerationError::NotAnArray)?;

    if entries.is_empty() {
        return Err(GenerationError::EmptyList);
    }

    let questions: Vec<Question> = entries
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| match validate_question(entry) {
            Ok(question) => Some(question),
            Err(reason) => {
                debug!("丢弃第 {} 个无效题目: {}", idx + 1, reason);
                None
            }
        })
        .collect();

    if questions.is_empty() {
        return Err(GenerationError::NoValidQuestions);
    }

    debug!("批量响应有效题目: {}/{}", questions.len(), entries.len());
    Ok(questions)
}

/// 先整体解析，结构不对或解析失败时用正则截取
fn extract_json(
    raw: &str,
    fallback: &Regex,
    expected_shape: fn(&JsonValue) -> bool,
    wrong_shape: GenerationError,
) -> Result<JsonValue, GenerationError> {
    let clean = strip_code_fences(raw);
    if clean.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let parsed: Option<JsonValue> = serde_json::from_str(&clean).ok();
    let is_json = parsed.is_some();
    if let Some(value) = parsed.filter(|v| expected_shape(v)) {
        return Ok(value);
    }

    if let Some(matched) = fallback.find(&clean) {
        if let Ok(value) = serde_json::from_str::<JsonValue>(matched.as_str()) {
            if expected_shape(&value) {
                return Ok(value);
            }
        }
    }

    Err(if is_json { wrong_shape } else { GenerationError::Parse })
}

/// 逐字段校验一道题
fn validate_question(value: &JsonValue) -> Result<Question, String> {
    let question = non_empty_str(value, "question")?;

    let options = value
        .get("options")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| "缺少 options 数组".to_string())?;
    if options.len() != OPTION_COUNT {
        return Err(format!("选项数量为 {}，应为 {}", options.len(), OPTION_COUNT));
    }
    let options: Vec<String> = options
        .iter()
        .map(|opt| {
            opt.as_str()
                .map(str::to_string)
                .ok_or_else(|| "选项必须是字符串".to_string())
        })
        .collect::<Result<_, _>>()?;
    let options: [String; OPTION_COUNT] = options
        .try_into()
        .map_err(|_| "选项数量不正确".to_string())?;

    let correct_answer = correct_answer_index(value.get("correctAnswer"))?;
    let explanation = non_empty_str(value, "explanation")?;

    Ok(Question::new(question, options, correct_answer, explanation))
}

fn non_empty_str(value: &JsonValue, field: &str) -> Result<String, String> {
    match value.get(field).and_then(JsonValue::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(format!("字段 {} 缺失或为空", field)),
    }
}

/// 正确答案必须是 [0, 4) 内的整数（允许 `2.0` 这种写法）
fn correct_answer_index(value: Option<&JsonValue>) -> Result<usize, String> {
    let number = value
        .filter(|v| v.is_number())
        .ok_or_else(|| "字段 correctAnswer 缺失或不是数字".to_string())?;

    let index = if let Some(n) = number.as_u64() {
        Some(n)
    } else {
        number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0)
            .map(|f| f as u64)
    };

    match index {
        Some(n) if (n as usize) < OPTION_COUNT => Ok(n as usize),
        _ => Err(format!("correctAnswer {} 超出范围 [0, {})", number, OPTION_COUNT)),
    }
}
