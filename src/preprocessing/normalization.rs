//! Стандартизация признаков перед регрессией

use ndarray::{Array1, Array2, Axis};

use crate::error::PipelineError;

/// (x - mean) / std по каждой колонке
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    std: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some() && self.std.is_some()
    }

    pub fn fit(&mut self, features: &Array2<f64>) -> Result<(), PipelineError> {
        let mean = features
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::Training("cannot scale an empty dataset".to_string()))?;

        // Постоянные колонки (например, редкие индикаторы) не масштабируем
        let std = features
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < 1e-10 { 1.0 } else { s });

        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    pub fn transform(&self, features: &Array2<f64>) -> Result<Array2<f64>, PipelineError> {
        let (mean, std) = match (&self.mean, &self.std) {
            (Some(mean), Some(std)) => (mean, std),
            _ => return Err(PipelineError::NotTrained),
        };
        if features.ncols() != mean.len() {
            return Err(PipelineError::Training(format!(
                "expected {} feature columns, got {}",
                mean.len(),
                features.ncols()
            )));
        }

        Ok((features - mean) / std)
    }

    pub fn fit_transform(&mut self, features: &Array2<f64>) -> Result<Array2<f64>, PipelineError> {
        self.fit(features)?;
        self.transform(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn centers_and_scales_columns() {
        let x = array![[1.0, 5.0], [3.0, 5.0]];
        let scaled = StandardScaler::new().fit_transform(&x).unwrap();
        assert_eq!(scaled, array![[-1.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn refuses_unfitted_and_empty_input() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(PipelineError::NotTrained)
        ));
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(StandardScaler::new().fit(&empty).is_err());
    }
}
