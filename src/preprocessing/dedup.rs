//! Удаление дубликатов приложений

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::preprocessing::text::TextNormalizer;
use crate::types::{columns, RawTable};

/// Сколько строк отсеяно и почему
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupReport {
    pub input_rows: usize,
    pub invalid_developer_rows: usize,
    pub duplicate_rows: usize,
    pub output_rows: usize,
    /// Индексы выживших строк во входной таблице, по порядку
    pub kept_rows: Vec<usize>,
}

pub struct Deduplicator<'a> {
    normalizer: &'a TextNormalizer,
    invalid_developer: &'a str,
}

impl<'a> Deduplicator<'a> {
    pub fn new(normalizer: &'a TextNormalizer, invalid_developer: &'a str) -> Self {
        Self {
            normalizer,
            invalid_developer,
        }
    }

    /// Ключ идентичности строки: нормализованные (App, Developer)
    fn identity(&self, table: &RawTable, row: usize, app: usize, developer: usize) -> (String, String) {
        (
            self.normalizer.normalize_identity_text(table.cell(row, app).as_text()),
            self.normalizer.normalize_identity_text(table.cell(row, developer).as_text()),
        )
    }

    /// Оставляет первую строку для каждого ключа в порядке загрузки
    pub fn deduplicate(&self, table: &RawTable) -> Result<(RawTable, DedupReport), PipelineError> {
        let app = table.column_index(columns::APP)?;
        let developer = table.column_index(columns::DEVELOPER)?;

        let mut report = DedupReport {
            input_rows: table.len(),
            ..Default::default()
        };
        let mut seen = HashSet::new();

        for row in 0..table.len() {
            let key = self.identity(table, row, app, developer);
            if key.1 == self.invalid_developer {
                report.invalid_developer_rows += 1;
                continue;
            }
            if seen.insert(key) {
                report.kept_rows.push(row);
            } else {
                report.duplicate_rows += 1;
            }
        }

        report.output_rows = report.kept_rows.len();
        tracing::info!(
            "Deduplicated {} rows: {} kept, {} duplicates, {} with invalid developer",
            report.input_rows,
            report.output_rows,
            report.duplicate_rows,
            report.invalid_developer_rows
        );

        Ok((table.select_rows(&report.kept_rows), report))
    }
}
