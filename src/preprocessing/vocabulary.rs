//! Версионированный словарь категорий для one-hot кодирования

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub const VOCABULARY_FORMAT_VERSION: u32 = 1;

/// Упорядоченный список известных категорий и отдельная корзина unknown.
///
/// Словарь строится один раз на обучающих данных и без изменений
/// переиспользуется при инференсе, поэтому набор колонок стабилен.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    pub version: u32,
    pub prefix: String,
    pub categories: Vec<String>,
    pub unknown_label: String,
    pub fitted_at: DateTime<Utc>,
}

impl CategoryVocabulary {
    /// Категории сортируются; метка unknown в список не попадает
    pub fn fit<I, S>(categories: I, prefix: &str, unknown_label: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let known: BTreeSet<String> = categories
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .filter(|c| c != unknown_label)
            .collect();

        tracing::debug!("Category vocabulary fitted with {} categories", known.len());

        Self {
            version: VOCABULARY_FORMAT_VERSION,
            prefix: prefix.to_string(),
            categories: known.into_iter().collect(),
            unknown_label: unknown_label.to_string(),
            fitted_at: Utc::now(),
        }
    }

    /// Число индикаторов, включая unknown
    pub fn width(&self) -> usize {
        self.categories.len() + 1
    }

    /// Индекс индикатора; неизвестная категория попадает в последний
    pub fn index_of(&self, category: &str) -> usize {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(category))
            .unwrap_or(self.categories.len())
    }

    pub fn column_name(&self, category: &str) -> String {
        format!("{}_{}", self.prefix, category)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .chain(std::iter::once(&self.unknown_label))
            .map(|c| self.column_name(c))
            .collect()
    }

    pub fn encode(&self, category: &str) -> Vec<bool> {
        let mut indicators = vec![false; self.width()];
        indicators[self.index_of(category)] = true;
        indicators
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let vocabulary: Self = serde_json::from_str(json)?;
        if vocabulary.version != VOCABULARY_FORMAT_VERSION {
            return Err(PipelineError::Vocabulary(format!(
                "unsupported vocabulary version {} (expected {})",
                vocabulary.version, VOCABULARY_FORMAT_VERSION
            )));
        }
        if vocabulary.categories.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PipelineError::Vocabulary(
                "categories must be sorted and unique".to_string(),
            ));
        }
        Ok(vocabulary)
    }
}
