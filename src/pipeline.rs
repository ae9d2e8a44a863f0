//! Конвейер: дедупликация -> очистка -> признаки

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::preprocessing::{
    CategoryVocabulary, CleanedTable, Cleaner, DedupReport, Deduplicator, FeatureBuilder,
    FeatureTable, TextNormalizer,
};
use crate::types::{columns, CleanedAppRecord, RawTable, RowIdentity};

/// Всё, что выдаёт один прогон конвейера
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub dedup: DedupReport,
    pub cleaned: CleanedTable,
    pub features: FeatureTable,
    /// log1p(price), посчитан до кодирования признаков
    pub target: Array1<f64>,
}

/// Сводка для логов и ответов API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub input_rows: usize,
    pub deduplicated_rows: usize,
    pub cleaned_rows: usize,
    pub feature_columns: usize,
}

impl PipelineOutput {
    /// Индекс сырой строки для каждой строки признаков
    pub fn source_rows(&self) -> Vec<usize> {
        self.cleaned.quality.iter().map(|q| q.source_row).collect()
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            input_rows: self.dedup.input_rows,
            deduplicated_rows: self.dedup.output_rows,
            cleaned_rows: self.cleaned.records.len(),
            feature_columns: self.features.columns.len(),
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    normalizer: TextNormalizer,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let normalizer = TextNormalizer::new(&config.locale)?;
        Ok(Self { config, normalizer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn deduplicate(&self, table: &RawTable) -> Result<(RawTable, DedupReport), PipelineError> {
        Deduplicator::new(&self.normalizer, &self.config.invalid_developer).deduplicate(table)
    }

    pub fn clean(&self, table: &RawTable) -> Result<CleanedTable, PipelineError> {
        Cleaner::new(&self.normalizer).clean(table)
    }

    pub fn build_features(
        &self,
        records: &[CleanedAppRecord],
        vocabulary: Option<&CategoryVocabulary>,
    ) -> FeatureTable {
        FeatureBuilder::new(&self.config).build(records, vocabulary)
    }

    /// Дедупликация и очистка, без признаков (для сохранения в хранилище).
    /// `source_row` в результате указывает на строку исходной `table`.
    pub fn dedup_and_clean(
        &self,
        table: &RawTable,
    ) -> Result<(DedupReport, CleanedTable), PipelineError> {
        let (unique, dedup) = self.deduplicate(table)?;
        let mut cleaned = self.clean(&unique)?;

        for q in &mut cleaned.quality {
            q.source_row = dedup.kept_rows[q.source_row];
        }
        for d in &mut cleaned.report.dropped {
            d.source_row = dedup.kept_rows[d.source_row];
        }

        Ok((dedup, cleaned))
    }

    /// Нормализованные (App, Developer) для строк `rows` сырой таблицы
    pub fn identities(&self, table: &RawTable, rows: &[usize]) -> Result<Vec<RowIdentity>, PipelineError> {
        let app = table.column_index(columns::APP)?;
        let developer = table.column_index(columns::DEVELOPER)?;
        Ok(rows
            .iter()
            .map(|&row| RowIdentity {
                source_row: row,
                app: self.normalizer.normalize_identity_text(table.cell(row, app).as_text()),
                developer: self
                    .normalizer
                    .normalize_identity_text(table.cell(row, developer).as_text()),
            })
            .collect())
    }

    /// Полный прогон. Если `paid_only`, до кодирования остаются только платные приложения.
    pub fn run(
        &self,
        table: &RawTable,
        vocabulary: Option<&CategoryVocabulary>,
        paid_only: bool,
    ) -> Result<PipelineOutput, PipelineError> {
        let (dedup, mut cleaned) = self.dedup_and_clean(table)?;
        if paid_only {
            cleaned = select_paid(cleaned);
        }

        let target = FeatureBuilder::price_target(&cleaned.records);
        let features = self.build_features(&cleaned.records, vocabulary);

        let output = PipelineOutput {
            dedup,
            cleaned,
            features,
            target,
        };
        let summary = output.summary();
        tracing::info!(
            "Pipeline finished: {} input rows, {} unique, {} cleaned, {} feature columns",
            summary.input_rows,
            summary.deduplicated_rows,
            summary.cleaned_rows,
            summary.feature_columns
        );
        Ok(output)
    }
}

/// Только платные приложения (price > 0); флаги качества остаются парными записям
pub fn select_paid(table: CleanedTable) -> CleanedTable {
    let before = table.records.len();
    let (records, quality) = table
        .records
        .into_iter()
        .zip(table.quality)
        .filter(|(r, _)| r.price > 0.0)
        .unzip::<_, _, Vec<_>, Vec<_>>();

    tracing::debug!("Paid apps: {} of {}", records.len(), before);

    let mut report = table.report;
    report.unpaid_rows += before - records.len();
    report.output_rows = records.len();

    CleanedTable {
        records,
        quality,
        report,
    }
}
