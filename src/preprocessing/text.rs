//! Нормализация текста и локализованных чисел

use std::collections::HashMap;
use std::num::IntErrorKind;

use crate::config::{LocaleRules, MagnitudeWord};
use crate::error::PipelineError;
use crate::types::{Outcome, ParseIssue};

/// Примитивы нормализации, собранные из локальных правил
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    digits: HashMap<char, char>,
    /// `digits` плюс числовые алфавиты, только для числа установок
    numerals: HashMap<char, char>,
    joiner: char,
    magnitudes: Vec<MagnitudeWord>,
}

impl TextNormalizer {
    pub fn new(rules: &LocaleRules) -> Result<Self, PipelineError> {
        rules.validate()?;
        Ok(Self::from_rules(rules))
    }

    fn from_rules(rules: &LocaleRules) -> Self {
        let digits = digit_map(&rules.digit_alphabets);
        let mut numerals = digit_map(&rules.numeric_alphabets);
        numerals.extend(digits.iter().map(|(&glyph, &ascii)| (glyph, ascii)));

        // Сравнение идёт после lowercase, поэтому токены приводим так же
        let magnitudes = rules
            .magnitude_words
            .iter()
            .map(|w| MagnitudeWord {
                token: w.token.to_lowercase(),
                scale: w.scale,
            })
            .collect();

        Self {
            digits,
            numerals,
            joiner: rules.identity_joiner,
            magnitudes,
        }
    }

    /// Нормализация имени приложения или разработчика.
    /// Не текст (`None`) даёт пустую строку.
    pub fn normalize_identity_text(&self, value: Option<&str>) -> String {
        match value {
            Some(text) => text.replace(self.joiner, " ").trim().to_string(),
            None => String::new(),
        }
    }

    /// Посимвольная замена локальных цифр на ASCII
    pub fn convert_localized_digits(&self, text: &str) -> String {
        text.chars()
            .map(|c| self.digits.get(&c).copied().unwrap_or(c))
            .collect()
    }

    /// Число установок ("10,000+", "5 میلیون"). Нераспознанный ввод даёт 0.
    pub fn parse_install_count(&self, raw: &str) -> u64 {
        self.parse_install_count_tagged(raw).value().unwrap_or(0)
    }

    /// То же, что [`parse_install_count`](Self::parse_install_count), но с причиной подстановки 0
    pub fn parse_install_count_tagged(&self, raw: &str) -> Outcome<u64> {
        let value: String = raw
            .chars()
            .map(|c| self.numerals.get(&c).copied().unwrap_or(c))
            .filter(|c| !matches!(c, '+' | ',' | ' '))
            .collect::<String>()
            .to_lowercase();

        if value.is_empty() {
            return Outcome::Defaulted { value: 0, reason: ParseIssue::Missing };
        }

        if let Some(word) = self.magnitudes.iter().find(|w| value.contains(&w.token)) {
            let number = value.replace(&word.token, "");
            return match number.parse::<f64>() {
                Ok(n) if n.is_finite() && n >= 0.0 => Outcome::Value {
                    value: (n * word.scale).trunc() as u64,
                },
                Ok(n) if n < 0.0 => Outcome::Defaulted { value: 0, reason: ParseIssue::Negative },
                _ => Outcome::Defaulted { value: 0, reason: ParseIssue::Malformed },
            };
        }

        if value.chars().all(|c| c.is_ascii_digit()) {
            return match value.parse::<u64>() {
                Ok(n) => Outcome::Value { value: n },
                // как и `as u64` в ветке со словом-величиной
                Err(e) if *e.kind() == IntErrorKind::PosOverflow => Outcome::Value { value: u64::MAX },
                Err(_) => Outcome::Defaulted { value: 0, reason: ParseIssue::Malformed },
            };
        }

        Outcome::Defaulted { value: 0, reason: ParseIssue::Malformed }
    }
}

fn digit_map(alphabets: &[String]) -> HashMap<char, char> {
    let mut map = HashMap::new();
    for alphabet in alphabets {
        for (glyph, ascii) in alphabet.chars().zip('0'..='9') {
            map.insert(glyph, ascii);
        }
    }
    map
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::from_rules(&LocaleRules::persian())
    }
}

/// [`TextNormalizer::normalize_identity_text`] с правилами по умолчанию
pub fn normalize_identity_text(value: Option<&str>) -> String {
    TextNormalizer::default().normalize_identity_text(value)
}

/// [`TextNormalizer::convert_localized_digits`] с правилами по умолчанию
pub fn convert_localized_digits(text: &str) -> String {
    TextNormalizer::default().convert_localized_digits(text)
}

/// [`TextNormalizer::parse_install_count`] с правилами по умолчанию
pub fn parse_install_count(raw: &str) -> u64 {
    TextNormalizer::default().parse_install_count(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_text_replaces_joiner_and_trims() {
        assert_eq!(normalize_identity_text(None), "");
        assert_eq!(
            normalize_identity_text(Some("  شبکه\u{200c}های اجتماعی \t")),
            "شبکه های اجتماعی"
        );
        assert_eq!(normalize_identity_text(Some("\u{200c}App\u{200c}")), "App");
    }

    #[test]
    fn localized_digits_map_one_to_one() {
        let input = "نسخه ۱۲.۵ - ۰۹۸۷۶۵۴۳";
        let output = convert_localized_digits(input);
        assert_eq!(output, "نسخه 12.5 - 09876543");
        assert_eq!(input.chars().count(), output.chars().count());
        assert_eq!(convert_localized_digits("already 123"), "already 123");
    }

    #[test]
    fn install_counts() {
        assert_eq!(parse_install_count("10,000+"), 10_000);
        assert_eq!(parse_install_count("۵ میلیون"), 5_000_000);
        assert_eq!(parse_install_count("5میلیون"), 5_000_000);
        assert_eq!(parse_install_count("۱۰۰ هزار+"), 100_000);
        assert_eq!(parse_install_count("1.5 میلیارد"), 1_500_000_000);
        assert_eq!(parse_install_count(""), 0);
        assert_eq!(parse_install_count("abc"), 0);
        assert_eq!(parse_install_count("هزار"), 0);
    }

    #[test]
    fn install_defaults_are_tagged() {
        let normalizer = TextNormalizer::default();
        assert_eq!(
            normalizer.parse_install_count_tagged("abc"),
            Outcome::Defaulted { value: 0, reason: ParseIssue::Malformed }
        );
        assert_eq!(
            normalizer.parse_install_count_tagged(" + "),
            Outcome::Defaulted { value: 0, reason: ParseIssue::Missing }
        );
        assert_eq!(
            normalizer.parse_install_count_tagged("-2هزار"),
            Outcome::Defaulted { value: 0, reason: ParseIssue::Negative }
        );
        assert_eq!(
            normalizer.parse_install_count_tagged("1,000+"),
            Outcome::Value { value: 1000 }
        );
    }

    #[test]
    fn mixed_digit_alphabets_in_install_counts() {
        assert_eq!(parse_install_count("۴٥"), 45);
        assert_eq!(parse_install_count("٥ هزار+"), 5_000);
        assert_eq!(parse_install_count("١,٠٠٠+"), 1_000);
        // в обычном тексте арабско-индийские цифры не меняются
        assert_eq!(convert_localized_digits("۴٥"), "4٥");
    }

    #[test]
    fn huge_install_count_saturates() {
        let normalizer = TextNormalizer::default();
        assert_eq!(
            normalizer.parse_install_count_tagged("99999999999999999999999+"),
            Outcome::Value { value: u64::MAX }
        );
        assert_eq!(parse_install_count("99999999999999999999 میلیارد"), u64::MAX);
    }

    #[test]
    fn custom_rules_add_locale() {
        let rules = LocaleRules {
            digit_alphabets: vec!["٠١٢٣٤٥٦٧٨٩".to_string()],
            numeric_alphabets: Vec::new(),
            identity_joiner: '\u{200d}',
            magnitude_words: vec![MagnitudeWord { token: "K".to_string(), scale: 1e3 }],
        };
        let normalizer = TextNormalizer::new(&rules).unwrap();
        assert_eq!(normalizer.parse_install_count("٣k+"), 3000);
        assert_eq!(normalizer.parse_install_count("۳"), 0);
        assert_eq!(normalizer.normalize_identity_text(Some("a\u{200d}b")), "a b");
    }
}
