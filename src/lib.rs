//! Очистка и подготовка признаков для данных магазина приложений

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod storage;
pub mod types;

pub use config::{AppConfig, LocaleRules, PipelineConfig, TrainingConfig};
pub use error::PipelineError;
pub use models::*;
pub use pipeline::{select_paid, Pipeline, PipelineOutput, PipelineSummary};
pub use preprocessing::*;
pub use storage::{AppStore, MemoryStore, StoredApp};
pub use types::*;
