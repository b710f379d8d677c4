//! 出题提示词
//!
//! 语言以英文名写进提示词，题目内容要求全部使用该语言。

pub const SYSTEM_MESSAGE: &str = "You are an expert certification exam creator. \
You always answer with raw JSON only, without commentary.";

/// 单题提示词；`question_number` 只是让模型换一个主题的提示
pub fn single_question_prompt(certificate_name: &str, language_name: &str, question_number: usize) -> String {
    format!(
        r#"Generate exactly 1 multiple-choice quiz question for the "{certificate}" certification.

IMPORTANT: Generate all content in {language}. The question, the options and the explanation must be written in {language}.

This is question number {number}. Make sure it covers a different topic/domain than previous questions to ensure variety.

The question should:
1. Be based on the latest documentation, best practices, and exam objectives
2. Have 4 multiple choice options
3. Have exactly one correct answer
4. Include a detailed explanation of why the correct answer is right and why other options are wrong
5. Be at the appropriate difficulty level for the certification
6. Cover a specific domain/topic of the certification
7. Use proper {language} language and terminology

Return ONLY a valid JSON object with this exact structure (no additional text):
{{
  "question": "Question text here?",
  "options": ["Option A", "Option B", "Option C", "Option D"],
  "correctAnswer": 0,
  "explanation": "Detailed explanation of the correct answer and why other options are incorrect."
}}

Generate the question now."#,
        certificate = certificate_name,
        language = language_name,
        number = question_number,
    )
}

/// 批量提示词
pub fn batch_prompt(certificate_name: &str, language_name: &str, batch_size: usize) -> String {
    format!(
        r#"Generate exactly {count} multiple-choice quiz questions for the "{certificate}" certification.

IMPORTANT: Generate all content in {language}. All questions, options, and explanations must be written in {language}.

Each question should:
1. Be based on the latest documentation, best practices, and exam objectives
2. Have 4 multiple choice options
3. Have exactly one correct answer
4. Include a detailed explanation of why the correct answer is right and why other options are wrong
5. Be at the appropriate difficulty level for the certification
6. Cover different domains/topics of the certification
7. Use proper {language} language and terminology

Return ONLY a valid JSON array with this exact structure (no additional text):
[
  {{
    "question": "Question text here?",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "correctAnswer": 0,
    "explanation": "Detailed explanation of the correct answer and why other options are incorrect."
  }}
]

Generate exactly {count} questions now."#,
        certificate = certificate_name,
        language = language_name,
        count = batch_size,
    )
}

/// 证书名称校验提示词
pub fn certification_check_prompt(certification_name: &str) -> String {
    format!(
        r#"Is "{name}" a real professional certification?

Respond with JSON only:

{{
  "isValid": boolean,
  "correctedName": "official name if valid",
  "description": "what it covers and target audience",
  "suggestions": ["alt1", "alt2", "alt3"],
  "confidence": "high"
}}

If valid: set isValid=true, provide correctedName and description, empty suggestions array
If invalid: set isValid=false, empty correctedName and description, provide 3 real alternatives"#,
        name = certification_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_prompt_carries_language_and_number() {
        let prompt = single_question_prompt("CompTIA Security+", "German", 7);
        assert!(prompt.contains("\"CompTIA Security+\""));
        assert!(prompt.contains("Generate all content in German"));
        assert!(prompt.contains("This is question number 7."));
    }

    #[test]
    fn batch_prompt_asks_for_array() {
        let prompt = batch_prompt("CKA", "English", 5);
        assert!(prompt.contains("Generate exactly 5 multiple-choice"));
        assert!(prompt.contains("JSON array"));
        assert!(!prompt.contains("This is question number"));
    }
}
