/// Типы данных для конвейера очистки

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Имена колонок входной таблицы
pub mod columns {
    pub const APP: &str = "App";
    pub const DEVELOPER: &str = "Developer";
    pub const CATEGORY: &str = "Category";
    pub const RATING: &str = "Rating";
    pub const REVIEWS: &str = "Reviews";
    pub const SIZE: &str = "Size";
    pub const INSTALLS: &str = "Installs";
    pub const PRICE: &str = "Price";

    pub const ALL: [&str; 8] = [APP, DEVELOPER, CATEGORY, RATING, REVIEWS, SIZE, INSTALLS, PRICE];
}

/// Ячейка сырой таблицы: текст, число (не текст) или пропуск
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Missing,
}

static MISSING: Cell = Cell::Missing;

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Приведение к тексту (числа форматируются, пропуск даёт пустую строку)
    pub fn to_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Missing => String::new(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map(Cell::Text).unwrap_or(Cell::Missing)
    }
}

/// Строка в том виде, в каком её отдаёт загрузчик
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAppRecord {
    #[serde(rename = "App")]
    pub app: Option<String>,
    #[serde(rename = "Developer")]
    pub developer: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Rating")]
    pub rating: Option<String>,
    #[serde(rename = "Reviews")]
    pub reviews: Option<String>,
    #[serde(rename = "Size")]
    pub size: Option<String>,
    #[serde(rename = "Installs")]
    pub installs: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<String>,
}

/// Сырая таблица: заголовок и строки ячеек.
///
/// Строки короче заголовка допустимы, недостающие ячейки считаются пропусками.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_records(records: &[RawAppRecord]) -> Self {
        let mut table = Self::new(columns::ALL.iter().map(|c| c.to_string()).collect());
        for r in records {
            table.push_row(vec![
                r.app.clone().into(),
                r.developer.clone().into(),
                r.category.clone().into(),
                r.rating.clone().into(),
                r.reviews.clone().into(),
                r.size.clone().into(),
                r.installs.clone().into(),
                r.price.clone().into(),
            ]);
        }
        table
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, PipelineError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&MISSING)
    }

    /// Новая таблица с теми же колонками и выбранными строками в заданном порядке
    pub fn select_rows(&self, indices: &[usize]) -> RawTable {
        RawTable {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

/// Очищенная запись (контракт хранилища)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedAppRecord {
    pub category: String,
    pub rating: f64,
    pub reviews: u64,
    pub size: f64, // МБ
    pub installs: u64,
    pub price: f64,
}

/// Поле очищенной записи
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Category,
    Rating,
    Reviews,
    Size,
    Installs,
    Price,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Category,
        Field::Rating,
        Field::Reviews,
        Field::Size,
        Field::Installs,
        Field::Price,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Field::Category => columns::CATEGORY,
            Field::Rating => columns::RATING,
            Field::Reviews => columns::REVIEWS,
            Field::Size => columns::SIZE,
            Field::Installs => columns::INSTALLS,
            Field::Price => columns::PRICE,
        }
    }
}

/// Почему значение ячейки не удалось разобрать
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseIssue {
    Missing,
    Malformed,
    Negative,
    NoMedian,
}

/// Результат разбора одной ячейки
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Outcome<T> {
    Value { value: T },
    Defaulted { value: T, reason: ParseIssue },
    Dropped { reason: ParseIssue },
}

impl<T: Copy> Outcome<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Outcome::Value { value } | Outcome::Defaulted { value, .. } => Some(*value),
            Outcome::Dropped { .. } => None,
        }
    }
}

/// Поле, которому было подставлено значение по умолчанию
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultedField {
    pub field: Field,
    pub reason: ParseIssue,
}

/// Флаг качества для выжившей строки
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowQuality {
    /// Индекс строки в исходной таблице; после [`Pipeline`](crate::Pipeline) -
    /// в сырой таблице до дедупликации
    pub source_row: usize,
    pub defaulted: Vec<DefaultedField>,
}

impl RowQuality {
    pub fn is_clean(&self) -> bool {
        self.defaulted.is_empty()
    }
}

/// Идентификатор выжившей строки: индекс в сырой таблице и нормализованные имена
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowIdentity {
    pub source_row: usize,
    pub app: String,
    pub developer: String,
}

/// Строка признаков
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub rating: f64,
    pub reviews_log: f64,
    pub installs_log: f64,
    pub size_log: f64,
    /// Индикаторы категорий в порядке словаря (последний - unknown)
    pub categories: Vec<bool>,
}
