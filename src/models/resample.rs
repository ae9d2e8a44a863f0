//! Bootstrap-выборка с возвращением

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::PipelineError;

/// `n_samples` строк с возвращением; одинаковый `seed` даёт одинаковую выборку.
/// При `n_samples == 0` данные возвращаются как есть.
pub fn bootstrap(
    features: &Array2<f64>,
    target: &Array1<f64>,
    n_samples: usize,
    seed: u64,
) -> Result<(Array2<f64>, Array1<f64>), PipelineError> {
    if features.nrows() != target.len() {
        return Err(PipelineError::Training(format!(
            "{} feature rows but {} targets",
            features.nrows(),
            target.len()
        )));
    }
    if features.nrows() == 0 {
        return Err(PipelineError::Training("cannot resample an empty dataset".to_string()));
    }
    if n_samples == 0 {
        return Ok((features.clone(), target.clone()));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let indices: Vec<usize> = (0..n_samples)
        .map(|_| rng.gen_range(0..features.nrows()))
        .collect();

    Ok((
        features.select(Axis(0), &indices),
        target.select(Axis(0), &indices),
    ))
}
