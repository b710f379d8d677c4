//! 支持的出题语言
//!
//! 代码 → (英文名, 本地名)。提示词里使用英文名。

use phf::phf_map;

static SUPPORTED_LANGUAGES: phf::Map<&'static str, (&'static str, &'static str)> = phf_map! {
    "en" => ("English", "English"),
    "es" => ("Spanish", "Español"),
    "fr" => ("French", "Français"),
    "de" => ("German", "Deutsch"),
    "it" => ("Italian", "Italiano"),
    "pt" => ("Portuguese", "Português"),
    "ja" => ("Japanese", "日本語"),
    "ko" => ("Korean", "한국어"),
    "zh" => ("Chinese", "中文"),
    "hi" => ("Hindi", "हिन्दी"),
    "ar" => ("Arabic", "العربية"),
    "ru" => ("Russian", "Русский"),
    "nl" => ("Dutch", "Nederlands"),
    "sv" => ("Swedish", "Svenska"),
    "no" => ("Norwegian", "Norsk"),
    "da" => ("Danish", "Dansk"),
    "fi" => ("Finnish", "Suomi"),
    "pl" => ("Polish", "Polski"),
    "tr" => ("Turkish", "Türkçe"),
    "th" => ("Thai", "ไทย"),
};

/// 语言代码对应的英文名，未知代码回退为 English
pub fn language_name(code: &str) -> &'static str {
    SUPPORTED_LANGUAGES
        .get(code)
        .map(|(name, _)| *name)
        .unwrap_or("English")
}

/// 语言代码对应的本地名
pub fn native_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES.get(code).map(|(_, native)| *native)
}

pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains_key(code)
}

/// 所有支持的语言代码（按代码排序）
pub fn supported_codes() -> Vec<&'static str> {
    let mut codes: Vec<&'static str> = SUPPORTED_LANGUAGES.keys().copied().collect();
    codes.sort_unstable();
    codes
}
