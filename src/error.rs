//! Ошибки конвейера

use thiserror::Error;

/// Ошибка конвейера очистки, кодирования признаков и обучения.
///
/// Плохие значения в ячейках ошибкой не считаются: они заменяются значением
/// по умолчанию. Ошибка возникает только при нарушении структуры входа.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("required column '{0}' is missing from the input table")]
    MissingColumn(String),
    #[error("invalid locale rules: {0}")]
    LocaleRules(String),
    #[error("category vocabulary error: {0}")]
    Vocabulary(String),
    #[error("training failed: {0}")]
    Training(String),
    #[error("model not trained")]
    NotTrained,
    #[error(transparent)]
    Metrics(#[from] linfa::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
