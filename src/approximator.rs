//! # Function Approximator Interface
//!
//! The agent never looks inside its value networks. It talks to them through
//! two traits:
//!
//! - [`QFunction`]: maps a batch of observations to a `[batch, action_size]`
//!   matrix of action-values and exports/imports its parameters. Evaluation
//!   takes `&self`, so it cannot record any state needed for gradients.
//! - [`Trainable`]: adds a recording forward pass, gradient accumulation and
//!   mutable access to `(parameter, gradient)` pairs for an
//!   [`Optimizer`](crate::optimizer::Optimizer).
//!
//! Parameters travel as an explicit [`Parameters`] snapshot. The target
//! network is built and re-synchronised by loading such a snapshot, never by
//! cloning the network.

use crate::error::{DdqnError, Result};
use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, ArrayViewD, ArrayViewMutD, Axis};
use serde::{Deserialize, Serialize};

/// Ordered, named snapshot of an approximator's parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    tensors: Vec<(String, ArrayD<f32>)>,
}

impl Parameters {
    pub fn new() -> Self {
        Parameters { tensors: Vec::new() }
    }

    pub fn push<S: Into<String>>(&mut self, name: S, tensor: ArrayD<f32>) {
        self.tensors.push((name.into(), tensor));
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.tensors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, tensor)| tensor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArrayD<f32>)> {
        self.tensors.iter().map(|(name, tensor)| (name.as_str(), tensor))
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn shapes(&self) -> Vec<Vec<usize>> {
        self.tensors.iter().map(|(_, t)| t.shape().to_vec()).collect()
    }

    /// Same number of tensors with the same shapes, in the same order.
    pub fn is_compatible_with(&self, other: &Parameters) -> bool {
        self.shapes() == other.shapes()
    }

    /// Error unless `other` can be loaded in place of `self`.
    pub fn check_compatible(&self, other: &Parameters) -> Result<()> {
        if self.is_compatible_with(other) {
            Ok(())
        } else {
            Err(DdqnError::shape_mismatch(
                format!("{:?}", self.shapes()),
                format!("{:?}", other.shapes()),
            ))
        }
    }
}

/// Observation -> action-values mapping.
pub trait QFunction {
    fn input_size(&self) -> usize;

    fn output_size(&self) -> usize;

    /// Action-values for each row of `states`, shape `[rows, output_size]`.
    fn evaluate_batch(&self, states: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Action-values for a single observation.
    fn evaluate(&self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        let values = self.evaluate_batch(state.insert_axis(Axis(0)))?;
        Ok(values.row(0).to_owned())
    }

    /// Export a deep copy of all parameters.
    fn parameters(&self) -> Parameters;

    /// Overwrite all parameters wholesale.
    fn load_parameters(&mut self, parameters: &Parameters) -> Result<()>;
}

/// A [`QFunction`] that can be fitted by gradient descent.
pub trait Trainable: QFunction {
    /// Forward pass that keeps what `backward` needs.
    fn forward_train(&mut self, states: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Accumulate parameter gradients given dLoss/dOutput of the last
    /// `forward_train` call.
    fn backward(&mut self, output_grad: ArrayView2<f32>) -> Result<()>;

    fn zero_grad(&mut self);

    /// Parameters paired with their accumulated gradients, in
    /// [`QFunction::parameters`] order.
    fn params_and_grads(&mut self) -> Vec<(ArrayViewMutD<'_, f32>, ArrayViewD<'_, f32>)>;
}

/// Index of the first maximum. NaN entries never win; an empty or all-NaN
/// row yields 0.
pub fn argmax(values: ArrayView1<f32>) -> usize {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, best_value)) if v <= best_value => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i).unwrap_or(0)
}

/// Error unless `states` has `expected` columns.
pub fn check_input_width(states: ArrayView2<f32>, expected: usize) -> Result<()> {
    if states.ncols() != expected {
        return Err(DdqnError::shape_mismatch(
            format!("observations of length {}", expected),
            format!("length {}", states.ncols()),
        ));
    }
    Ok(())
}
