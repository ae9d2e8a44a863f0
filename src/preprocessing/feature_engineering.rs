//! Feature engineering для модели цены

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::preprocessing::vocabulary::CategoryVocabulary;
use crate::types::{CleanedAppRecord, FeatureRecord};

pub const RATING: &str = "Rating";
pub const REVIEWS_LOG: &str = "Reviews_Log";
pub const INSTALLS_LOG: &str = "Installs_Log";
pub const SIZE_LOG: &str = "Size_Log";

/// Таблица признаков: имена колонок в порядке матрицы
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRecord>,
    pub vocabulary: CategoryVocabulary,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Матрица признаков: Rating, Cat_*, Reviews_Log, Installs_Log, Size_Log
    pub fn to_matrix(&self) -> Array2<f64> {
        let mut features = Array2::zeros((self.rows.len(), self.columns.len()));

        for (i, row) in self.rows.iter().enumerate() {
            let mut feature_idx = 0;

            features[[i, feature_idx]] = row.rating;
            feature_idx += 1;

            for &flag in &row.categories {
                features[[i, feature_idx]] = if flag { 1.0 } else { 0.0 };
                feature_idx += 1;
            }

            features[[i, feature_idx]] = row.reviews_log;
            feature_idx += 1;
            features[[i, feature_idx]] = row.installs_log;
            feature_idx += 1;
            features[[i, feature_idx]] = row.size_log;
        }

        features
    }
}

pub struct FeatureBuilder<'a> {
    aliases: &'a HashMap<String, String>,
    prefix: &'a str,
    unknown_label: &'a str,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            aliases: &config.category_aliases,
            prefix: &config.category_prefix,
            unknown_label: &config.unknown_category,
        }
    }

    /// Слияние вариантов написания; прочие значения без изменений
    pub fn canonical_category<'s>(&'s self, raw: &'s str) -> &'s str {
        self.aliases.get(raw).map(String::as_str).unwrap_or(raw)
    }

    pub fn fit_vocabulary(&self, records: &[CleanedAppRecord]) -> CategoryVocabulary {
        CategoryVocabulary::fit(
            records.iter().map(|r| self.canonical_category(&r.category)),
            self.prefix,
            self.unknown_label,
        )
    }

    /// Кодирует записи. Без готового словаря он строится по этим же записям.
    pub fn build(
        &self,
        records: &[CleanedAppRecord],
        vocabulary: Option<&CategoryVocabulary>,
    ) -> FeatureTable {
        let vocabulary = match vocabulary {
            Some(v) => v.clone(),
            None => self.fit_vocabulary(records),
        };

        let rows: Vec<FeatureRecord> = records
            .iter()
            .map(|r| FeatureRecord {
                rating: r.rating,
                // log1p, чтобы нули оставались конечными
                reviews_log: (r.reviews as f64).ln_1p(),
                installs_log: (r.installs as f64).ln_1p(),
                size_log: r.size.ln_1p(),
                categories: vocabulary.encode(self.canonical_category(&r.category)),
            })
            .collect();

        let unknown = rows
            .iter()
            .filter(|r| r.categories.last().copied().unwrap_or(false))
            .count();
        if unknown > 0 {
            tracing::debug!("{} rows encoded into the unknown category bucket", unknown);
        }

        let mut columns = vec![RATING.to_string()];
        columns.extend(vocabulary.column_names());
        columns.extend([REVIEWS_LOG, INSTALLS_LOG, SIZE_LOG].map(String::from));

        tracing::info!("Built {} feature rows with {} columns", rows.len(), columns.len());

        FeatureTable {
            columns,
            rows,
            vocabulary,
        }
    }

    /// Целевая переменная: log1p(price) по нетрансформированной цене
    pub fn price_target(records: &[CleanedAppRecord]) -> Array1<f64> {
        records.iter().map(|r| r.price.ln_1p()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: &str, price: f64) -> CleanedAppRecord {
        CleanedAppRecord {
            category: category.to_string(),
            rating: 4.0,
            reviews: 0,
            size: 9.0,
            installs: 999,
            price,
        }
    }

    #[test]
    fn merges_spelling_variants() {
        let config = PipelineConfig::default();
        let builder = FeatureBuilder::new(&config);
        assert_eq!(builder.canonical_category("شبیه سازی"), "شبیه\u{200c}سازی");
        assert_eq!(builder.canonical_category("شبیه\u{200c}سازی"), "شبیه\u{200c}سازی");
        assert_eq!(builder.canonical_category("آموزش"), "آموزش");
    }

    #[test]
    fn drops_raw_columns_and_adds_logs() {
        let config = PipelineConfig::default();
        let builder = FeatureBuilder::new(&config);
        let records = vec![record("شبیه سازی", 1.0), record("شبیه\u{200c}سازی", 2.0), record("آموزش", 0.0)];

        let table = builder.build(&records, None);
        for raw in ["Price", "Reviews", "Installs", "Size", "Category"] {
            assert!(table.column_index(raw).is_none(), "{raw} must be dropped");
        }
        for derived in [REVIEWS_LOG, INSTALLS_LOG, SIZE_LOG] {
            assert!(table.column_index(derived).is_some());
        }
        // два варианта написания дают одну колонку
        assert_eq!(table.vocabulary.categories.len(), 2);
        assert_eq!(table.rows[0].categories, table.rows[1].categories);

        let row = &table.rows[0];
        assert_eq!(row.reviews_log, 0.0);
        assert!((row.installs_log - 1000f64.ln()).abs() < 1e-12);
        assert!((row.size_log - 10f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn indicator_group_sums_to_one() {
        let config = PipelineConfig::default();
        let builder = FeatureBuilder::new(&config);
        let train = vec![record("a", 1.0), record("b", 1.0)];
        let vocabulary = builder.fit_vocabulary(&train);

        let table = builder.build(&[record("a", 1.0), record("new", 1.0)], Some(&vocabulary));
        let matrix = table.to_matrix();
        let cat_columns: Vec<usize> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.starts_with("Cat_"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(cat_columns.len(), 3);
        for i in 0..matrix.nrows() {
            let sum: f64 = cat_columns.iter().map(|&j| matrix[[i, j]]).sum();
            assert_eq!(sum, 1.0);
        }
        assert_eq!(matrix[[1, table.column_index("Cat_unknown").unwrap()]], 1.0);
        assert_eq!(table.columns, builder.build(&train, Some(&vocabulary)).columns);
    }

    #[test]
    fn target_is_log1p_of_price() {
        let target = FeatureBuilder::price_target(&[record("a", 0.0), record("a", 9999.0)]);
        assert_eq!(target[0], 0.0);
        assert!((target[1] - 10000f64.ln()).abs() < 1e-12);
    }
}
