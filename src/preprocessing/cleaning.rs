//! Очистка и типизация колонок

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::preprocessing::text::TextNormalizer;
use crate::types::{
    Cell, CleanedAppRecord, DefaultedField, Field, Outcome, ParseIssue, RawTable, RowQuality,
};

/// Сводка по подстановкам и отброшенным строкам
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub output_rows: usize,
    /// Медианы считаются до удаления строк
    pub size_median: Option<f64>,
    pub rating_median: Option<f64>,
    pub defaulted: HashMap<Field, usize>,
    pub dropped: Vec<DroppedRow>,
    /// Бесплатные строки, убранные `select_paid`: input = output + dropped + unpaid
    #[serde(default)]
    pub unpaid_rows: usize,
}

impl CleaningReport {
    pub fn defaulted_count(&self, field: Field) -> usize {
        self.defaulted.get(&field).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedRow {
    pub source_row: usize,
    pub field: Field,
    pub reason: ParseIssue,
}

/// Результат очистки: записи и флаги качества идут параллельно
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedTable {
    pub records: Vec<CleanedAppRecord>,
    pub quality: Vec<RowQuality>,
    pub report: CleaningReport,
}

/// Разобранная строка до подстановки медиан
struct ParsedRow {
    category: Result<String, ParseIssue>,
    rating: Result<f64, ParseIssue>,
    reviews: Outcome<u64>,
    size: Result<f64, ParseIssue>,
    installs: Outcome<u64>,
    price: Outcome<f64>,
}

pub struct Cleaner<'a> {
    normalizer: &'a TextNormalizer,
}

impl<'a> Cleaner<'a> {
    pub fn new(normalizer: &'a TextNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn clean(&self, table: &RawTable) -> Result<CleanedTable, PipelineError> {
        let mut index = HashMap::new();
        for field in Field::ALL {
            index.insert(field, table.column_index(field.column())?);
        }

        let parsed: Vec<ParsedRow> = (0..table.len())
            .map(|row| {
                let cell = |field: Field| -> Option<String> {
                    let cell = table.cell(row, index[&field]);
                    (!cell.is_missing()).then(|| self.localized_text(cell))
                };
                self.parse_row(
                    cell(Field::Category),
                    cell(Field::Rating),
                    cell(Field::Reviews),
                    cell(Field::Size),
                    cell(Field::Installs),
                    cell(Field::Price),
                )
            })
            .collect();

        // Медианы по значениям, валидным до любых удалений
        let size_median = median(parsed.iter().filter_map(|r| r.size.ok()).collect());
        let rating_median = median(parsed.iter().filter_map(|r| r.rating.ok()).collect());
        tracing::debug!("Size median: {:?}, rating median: {:?}", size_median, rating_median);
        if size_median.is_none() {
            tracing::warn!("No valid Size values, rows with missing Size will be dropped");
        }
        if rating_median.is_none() {
            tracing::warn!("No valid Rating values, rows with missing Rating will be dropped");
        }

        let mut result = CleanedTable {
            report: CleaningReport {
                input_rows: table.len(),
                size_median,
                rating_median,
                ..Default::default()
            },
            ..Default::default()
        };

        for (row, p) in parsed.into_iter().enumerate() {
            let rating = fill_with(p.rating, rating_median);
            let size = fill_with(p.size, size_median);
            let mut quality = RowQuality {
                source_row: row,
                defaulted: Vec::new(),
            };

            match assemble(p, rating, size, &mut quality) {
                Ok(record) => {
                    for d in &quality.defaulted {
                        *result.report.defaulted.entry(d.field).or_insert(0) += 1;
                    }
                    result.records.push(record);
                    result.quality.push(quality);
                }
                Err((field, reason)) => result.report.dropped.push(DroppedRow {
                    source_row: row,
                    field,
                    reason,
                }),
            }
        }

        result.report.output_rows = result.records.len();
        tracing::info!(
            "Cleaned {} rows: {} kept, {} dropped",
            result.report.input_rows,
            result.report.output_rows,
            result.report.dropped.len()
        );

        Ok(result)
    }

    /// Текст ячейки с ASCII-цифрами
    fn localized_text(&self, cell: &Cell) -> String {
        self.normalizer.convert_localized_digits(&cell.to_text())
    }

    fn parse_row(
        &self,
        category: Option<String>,
        rating: Option<String>,
        reviews: Option<String>,
        size: Option<String>,
        installs: Option<String>,
        price: Option<String>,
    ) -> ParsedRow {
        ParsedRow {
            // пустая строка - это значение, а не пропуск
            category: category.ok_or(ParseIssue::Missing),
            rating: rating.ok_or(ParseIssue::Missing).and_then(|r| parse_float(&r)),
            reviews: match reviews.ok_or(ParseIssue::Missing).and_then(|r| parse_count(&r)) {
                Ok(value) => Outcome::Value { value },
                Err(reason) => Outcome::Defaulted { value: 0, reason },
            },
            size: size.ok_or(ParseIssue::Missing).and_then(|s| parse_stripped(&s)),
            installs: match installs {
                Some(raw) => self.normalizer.parse_install_count_tagged(&raw),
                None => Outcome::Defaulted { value: 0, reason: ParseIssue::Missing },
            },
            price: match price.ok_or(ParseIssue::Missing).and_then(|p| parse_stripped(&p)) {
                Ok(value) => Outcome::Value { value },
                Err(reason) => Outcome::Defaulted { value: 0.0, reason },
            },
        }
    }
}

/// Собирает запись; первое пустое поле становится причиной удаления строки
fn assemble(
    p: ParsedRow,
    rating: Outcome<f64>,
    size: Outcome<f64>,
    quality: &mut RowQuality,
) -> Result<CleanedAppRecord, (Field, ParseIssue)> {
    Ok(CleanedAppRecord {
        category: p.category.map_err(|reason| (Field::Category, reason))?,
        rating: required(Field::Rating, rating, quality)?,
        reviews: required(Field::Reviews, p.reviews, quality)?,
        size: required(Field::Size, size, quality)?,
        installs: required(Field::Installs, p.installs, quality)?,
        price: required(Field::Price, p.price, quality)?,
    })
}

fn required<T>(
    field: Field,
    outcome: Outcome<T>,
    quality: &mut RowQuality,
) -> Result<T, (Field, ParseIssue)> {
    match outcome {
        Outcome::Value { value } => Ok(value),
        Outcome::Defaulted { value, reason } => {
            quality.defaulted.push(DefaultedField { field, reason });
            Ok(value)
        }
        Outcome::Dropped { reason } => Err((field, reason)),
    }
}

/// Подстановка медианы; без медианы значение остаётся пустым
fn fill_with(parsed: Result<f64, ParseIssue>, median: Option<f64>) -> Outcome<f64> {
    match (parsed, median) {
        (Ok(value), _) => Outcome::Value { value },
        (Err(reason), Some(value)) => Outcome::Defaulted { value, reason },
        (Err(_), None) => Outcome::Dropped { reason: ParseIssue::NoMedian },
    }
}

fn parse_float(text: &str) -> Result<f64, ParseIssue> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseIssue::Missing);
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseIssue::Malformed),
    }
}

/// Удаляет всё, кроме `[0-9.]`, и разбирает остаток ("۱۲ مگابایت", "15,000 تومان")
fn parse_stripped(text: &str) -> Result<f64, ParseIssue> {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    parse_float(&stripped)
}

fn parse_count(text: &str) -> Result<u64, ParseIssue> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseIssue::Missing);
    }
    if let Ok(v) = text.parse::<u64>() {
        return Ok(v);
    }
    // "12.0" тоже целое
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() && v < 0.0 => Err(ParseIssue::Negative),
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v <= u64::MAX as f64 => Ok(v as u64),
        _ => Err(ParseIssue::Malformed),
    }
}

/// Медиана; для чётного числа значений - среднее двух средних
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
