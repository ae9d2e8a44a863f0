/// ML модели

pub mod price;
pub mod resample;

pub use price::{FeatureImportance, PriceModel, RegressionMetrics, TrainingReport};
pub use resample::bootstrap;
