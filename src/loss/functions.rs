use ndarray::{Array1, ArrayView1};

use crate::error::{DdqnError, Result};

fn check_pair(predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Result<()> {
    if predictions.len() != targets.len() {
        return Err(DdqnError::shape_mismatch(
            format!("{} targets", predictions.len()),
            targets.len(),
        ));
    }
    if predictions.is_empty() {
        return Err(DdqnError::InsufficientData {
            requested: 1,
            available: 0,
        });
    }
    Ok(())
}

/// Mean squared error, `mean((p - t)^2)`.
pub fn mse(predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Result<f32> {
    check_pair(predictions, targets)?;
    let diff = &predictions - &targets;
    Ok((&diff * &diff).sum() / predictions.len() as f32)
}

/// Gradient of [`mse`] with respect to `predictions`: `2 (p - t) / n`.
pub fn mse_grad(predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Result<Array1<f32>> {
    check_pair(predictions, targets)?;
    let scale = 2.0 / predictions.len() as f32;
    Ok((&predictions - &targets) * scale)
}
