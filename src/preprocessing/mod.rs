/// Модуль предобработки данных

pub mod cleaning;
pub mod dedup;
pub mod feature_engineering;
pub mod normalization;
pub mod text;
pub mod vocabulary;

pub use cleaning::{Cleaner, CleanedTable, CleaningReport, DroppedRow};
pub use dedup::{DedupReport, Deduplicator};
pub use feature_engineering::{FeatureBuilder, FeatureTable};
pub use normalization::StandardScaler;
pub use text::{convert_localized_digits, normalize_identity_text, parse_install_count, TextNormalizer};
pub use vocabulary::CategoryVocabulary;
