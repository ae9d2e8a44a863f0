//! Модель цены приложения (цель - log1p(price))

#![allow(non_snake_case)]

use linfa::metrics::SingleTargetRegression;
use linfa::Dataset;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;
use crate::error::PipelineError;
use crate::models::resample::bootstrap;
use crate::preprocessing::{CategoryVocabulary, FeatureTable, StandardScaler};

/// Ridge Regression через нормальные уравнения
struct RidgeRegression {
    alpha: f64,
    weights: Option<Array1<f64>>,
    bias: Option<f64>,
}

impl RidgeRegression {
    fn new(alpha: f64) -> Self {
        Self {
            alpha,
            weights: None,
            bias: None,
        }
    }

    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<(), PipelineError> {
        let n_features = X.ncols();
        if X.nrows() == 0 || n_features == 0 {
            return Err(PipelineError::Training("empty dataset".to_string()));
        }

        // Центрирование, чтобы свободный член не штрафовался
        let x_mean = X.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_features));
        let y_mean = y.mean().unwrap_or(0.0);
        let Xc = X - &x_mean;
        let yc = y - y_mean;

        // (X^T X + αI) w = X^T y
        let mut xtx = Xc.t().dot(&Xc);
        for i in 0..n_features {
            xtx[[i, i]] += self.alpha;
        }
        let xty = Xc.t().dot(&yc);

        let weights = solve_linear_system(xtx, xty)?;

        self.bias = Some(y_mean - x_mean.dot(&weights));
        self.weights = Some(weights);

        Ok(())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>, PipelineError> {
        let weights = self.weights.as_ref().ok_or(PipelineError::NotTrained)?;
        let bias = self.bias.unwrap_or(0.0);
        Ok(X.dot(weights) + bias)
    }
}

/// Метод Гаусса с выбором главного элемента
fn solve_linear_system(mut A: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>, PipelineError> {
    let n = A.nrows();

    for i in 0..n {
        let max_row = (i..n)
            .max_by(|&p, &q| A[[p, i]].abs().total_cmp(&A[[q, i]].abs()))
            .unwrap_or(i);

        if max_row != i {
            for j in 0..n {
                A.swap([i, j], [max_row, j]);
            }
            b.swap(i, max_row);
        }

        let pivot = A[[i, i]];
        if pivot.abs() < 1e-10 {
            return Err(PipelineError::Training("singular matrix".to_string()));
        }

        for k in (i + 1)..n {
            let factor = A[[k, i]] / pivot;
            for j in i..n {
                A[[k, j]] -= factor * A[[i, j]];
            }
            b[k] -= factor * b[i];
        }
    }

    // Обратный ход
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= A[[i, j]] * x[j];
        }
        x[i] = sum / A[[i, i]];
    }

    Ok(x)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    fn compute(predicted: &Array1<f64>, actual: &Array1<f64>) -> Result<Self, PipelineError> {
        let mse = predicted.mean_squared_error(actual)?;
        let r2 = predicted.r2(actual)?;
        Ok(Self {
            mse,
            rmse: mse.sqrt(),
            r2,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    pub train: RegressionMetrics,
    pub test: RegressionMetrics,
    /// По убыванию |веса| на стандартизованных признаках
    pub importance: Vec<FeatureImportance>,
}

pub struct PriceModel {
    scaler: StandardScaler,
    ridge: Option<RidgeRegression>,
    columns: Vec<String>,
    vocabulary: Option<CategoryVocabulary>,
}

impl PriceModel {
    pub fn new() -> Self {
        Self {
            scaler: StandardScaler::new(),
            ridge: None,
            columns: Vec::new(),
            vocabulary: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.ridge.is_some()
    }

    /// Словарь категорий, на котором обучена модель
    pub fn vocabulary(&self) -> Option<&CategoryVocabulary> {
        self.vocabulary.as_ref()
    }

    /// Обучает новую модель; удобно для фонового потока, текущая модель не трогается
    pub fn fit(
        features: &FeatureTable,
        target: &Array1<f64>,
        config: &TrainingConfig,
    ) -> Result<(Self, TrainingReport), PipelineError> {
        let mut model = Self::new();
        let report = model.train(features, target, config)?;
        Ok((model, report))
    }

    pub fn train(
        &mut self,
        features: &FeatureTable,
        target: &Array1<f64>,
        config: &TrainingConfig,
    ) -> Result<TrainingReport, PipelineError> {
        if features.is_empty() {
            return Err(PipelineError::Training("no rows to train on".to_string()));
        }

        let (X, y) = bootstrap(&features.to_matrix(), target, config.bootstrap_samples, config.seed)?;
        let samples = X.nrows();

        // Выборка bootstrap уже перемешана, поэтому делим по порядку
        let (train, test) = Dataset::new(X, y).split_with_ratio(config.train_ratio);
        if train.records().nrows() == 0 || test.records().nrows() == 0 {
            return Err(PipelineError::Training(format!(
                "train/test split of {} samples left an empty side",
                samples
            )));
        }

        let mut scaler = StandardScaler::new();
        let X_train = scaler.fit_transform(train.records())?;
        let X_test = scaler.transform(test.records())?;

        let mut ridge = RidgeRegression::new(config.ridge_alpha);
        ridge.fit(&X_train, train.targets())?;

        let train_metrics = RegressionMetrics::compute(&ridge.predict(&X_train)?, train.targets())?;
        let test_metrics = RegressionMetrics::compute(&ridge.predict(&X_test)?, test.targets())?;
        tracing::info!(
            "Price model trained. Train RMSE: {:.4}, R2: {:.4}; test RMSE: {:.4}, R2: {:.4}",
            train_metrics.rmse,
            train_metrics.r2,
            test_metrics.rmse,
            test_metrics.r2
        );

        let mut importance: Vec<FeatureImportance> = match &ridge.weights {
            Some(weights) => features
                .columns
                .iter()
                .zip(weights.iter())
                .map(|(feature, w)| FeatureImportance {
                    feature: feature.clone(),
                    importance: w.abs(),
                })
                .collect(),
            None => Vec::new(),
        };
        importance.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        for item in importance.iter().take(10) {
            tracing::info!("Feature {}: {:.4}", item.feature, item.importance);
        }

        let report = TrainingReport {
            samples,
            train_samples: train.records().nrows(),
            test_samples: test.records().nrows(),
            train: train_metrics,
            test: test_metrics,
            importance,
        };

        self.scaler = scaler;
        self.ridge = Some(ridge);
        self.columns = features.columns.clone();
        self.vocabulary = Some(features.vocabulary.clone());

        Ok(report)
    }

    /// Предсказание в log1p-шкале
    pub fn predict_log(&self, features: &FeatureTable) -> Result<Array1<f64>, PipelineError> {
        let ridge = self.ridge.as_ref().ok_or(PipelineError::NotTrained)?;
        if features.columns != self.columns {
            return Err(PipelineError::Training(
                "feature columns differ from the trained model, encode with its vocabulary".to_string(),
            ));
        }
        let X = self.scaler.transform(&features.to_matrix())?;
        ridge.predict(&X)
    }

    /// Цена в денежных единицах (обратное преобразование expm1)
    pub fn predict_price(&self, features: &FeatureTable) -> Result<Array1<f64>, PipelineError> {
        Ok(self.predict_log(features)?.mapv(f64::exp_m1))
    }
}

impl Default for PriceModel {
    fn default() -> Self {
        Self::new()
    }
}
