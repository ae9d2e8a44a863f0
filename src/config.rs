//! Конфигурация конвейера, обучения и сервера

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Множитель для слова-величины ("هزار" = 1000 и т.п.)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeWord {
    pub token: String,
    pub scale: f64,
}

/// Локальные правила разбора чисел и текста
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleRules {
    /// Алфавиты цифр: каждая строка - ровно десять символов для 0..9
    #[serde(default = "default_digit_alphabets")]
    pub digit_alphabets: Vec<String>,
    /// Дополнительные десятичные алфавиты, которые читаются как цифры только при
    /// разборе числа установок; в тексте остаются как есть
    #[serde(default = "default_numeric_alphabets")]
    pub numeric_alphabets: Vec<String>,
    /// Символ, заменяемый пробелом при нормализации имён
    #[serde(default = "default_identity_joiner")]
    pub identity_joiner: char,
    /// Проверяются по порядку, срабатывает первое совпадение
    #[serde(default = "default_magnitude_words")]
    pub magnitude_words: Vec<MagnitudeWord>,
}

impl LocaleRules {
    pub fn persian() -> Self {
        Self {
            digit_alphabets: default_digit_alphabets(),
            numeric_alphabets: default_numeric_alphabets(),
            identity_joiner: default_identity_joiner(),
            magnitude_words: default_magnitude_words(),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        for alphabet in self.digit_alphabets.iter().chain(&self.numeric_alphabets) {
            let n = alphabet.chars().count();
            if n != 10 {
                return Err(PipelineError::LocaleRules(format!(
                    "digit alphabet '{}' has {} characters, expected 10",
                    alphabet, n
                )));
            }
        }
        for word in &self.magnitude_words {
            if word.token.trim().is_empty() {
                return Err(PipelineError::LocaleRules(
                    "magnitude word token is empty".to_string(),
                ));
            }
            if !(word.scale.is_finite() && word.scale > 0.0) {
                return Err(PipelineError::LocaleRules(format!(
                    "magnitude word '{}' has non-positive scale {}",
                    word.token, word.scale
                )));
            }
        }
        Ok(())
    }
}

impl Default for LocaleRules {
    fn default() -> Self {
        Self::persian()
    }
}

fn default_digit_alphabets() -> Vec<String> {
    vec!["۰۱۲۳۴۵۶۷۸۹".to_string()]
}

fn default_numeric_alphabets() -> Vec<String> {
    // арабско-индийские цифры часто смешаны с персидскими
    vec!["٠١٢٣٤٥٦٧٨٩".to_string()]
}

fn default_identity_joiner() -> char {
    '\u{200c}'
}

fn default_magnitude_words() -> Vec<MagnitudeWord> {
    vec![
        MagnitudeWord { token: "هزار".to_string(), scale: 1e3 },
        MagnitudeWord { token: "میلیون".to_string(), scale: 1e6 },
        MagnitudeWord { token: "میلیارد".to_string(), scale: 1e9 },
    ]
}

/// Настройки очистки и кодирования
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub locale: LocaleRules,
    /// Заглушка "разработчик недоступен"
    #[serde(default = "default_invalid_developer")]
    pub invalid_developer: String,
    /// Точные замены вариантов написания категорий
    #[serde(default = "default_category_aliases")]
    pub category_aliases: HashMap<String, String>,
    #[serde(default = "default_category_prefix")]
    pub category_prefix: String,
    #[serde(default = "default_unknown_category")]
    pub unknown_category: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            locale: LocaleRules::default(),
            invalid_developer: default_invalid_developer(),
            category_aliases: default_category_aliases(),
            category_prefix: default_category_prefix(),
            unknown_category: default_unknown_category(),
        }
    }
}

fn default_invalid_developer() -> String {
    "#NAME?".to_string()
}

fn default_category_aliases() -> HashMap<String, String> {
    [
        ("شبکه های اجتماعی", "شبکه\u{200c}های اجتماعی"),
        ("شبیه سازی", "شبیه\u{200c}سازی"),
        ("شخصی سازی", "شخصی\u{200c}سازی"),
        ("کتاب ها و مطبوعات", "کتاب\u{200c}ها و مطبوعات"),
        ("کلمات و دانستنی ها", "کلمات و دانستنی\u{200c}ها"),
    ]
    .into_iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect()
}

fn default_category_prefix() -> String {
    "Cat".to_string()
}

fn default_unknown_category() -> String {
    "unknown".to_string()
}

/// Настройки обучения модели цены
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Учитывать только платные приложения (price > 0)
    #[serde(default = "default_paid_only")]
    pub paid_only: bool,
    #[serde(default = "default_bootstrap_samples")]
    pub bootstrap_samples: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_train_ratio")]
    pub train_ratio: f32,
    #[serde(default = "default_ridge_alpha")]
    pub ridge_alpha: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            paid_only: default_paid_only(),
            bootstrap_samples: default_bootstrap_samples(),
            seed: default_seed(),
            train_ratio: default_train_ratio(),
            ridge_alpha: default_ridge_alpha(),
        }
    }
}

fn default_paid_only() -> bool { true }
fn default_bootstrap_samples() -> usize { 200_000 }
fn default_seed() -> u64 { 42 }
fn default_train_ratio() -> f32 { 0.8 }
fn default_ridge_alpha() -> f64 { 1.0 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

/// Полная конфигурация приложения
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        let config: Self = serde_json::from_str(json)?;
        config.pipeline.locale.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_persian_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config.pipeline.locale, LocaleRules::persian());
        assert_eq!(config.pipeline.invalid_developer, "#NAME?");
        assert_eq!(config.pipeline.category_aliases.len(), 5);
        assert_eq!(config.training.bootstrap_samples, 200_000);
        assert_eq!(config.server.bind, "0.0.0.0:8000");
    }

    #[test]
    fn extra_locale_can_be_supplied() {
        let json = r#"{
            "pipeline": {
                "locale": {
                    "digit_alphabets": ["۰۱۲۳۴۵۶۷۸۹", "٠١٢٣٤٥٦٧٨٩"],
                    "magnitude_words": [{"token": "k", "scale": 1000.0}]
                }
            }
        }"#;
        let config = AppConfig::from_json_str(json).unwrap();
        assert_eq!(config.pipeline.locale.digit_alphabets.len(), 2);
        assert_eq!(config.pipeline.locale.identity_joiner, '\u{200c}');
    }

    #[test]
    fn short_digit_alphabet_is_rejected() {
        let json = r#"{"pipeline": {"locale": {"digit_alphabets": ["0123"]}}}"#;
        let err = AppConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, PipelineError::LocaleRules(_)));
    }
}
