pub mod test_network;

use crate::approximator::{check_input_width, Parameters, QFunction, Trainable};
use crate::error::Result;
use crate::replay_buffer::Experience;
use ndarray::{array, Array1, Array2, ArrayView2, ArrayViewD, ArrayViewMutD, Axis};

/// Approximator that returns the same action-values for every observation.
/// Its only parameter is that value vector.
pub struct ConstantQ {
    input_size: usize,
    values: Array1<f32>,
    grad: Array1<f32>,
    checks_width: bool,
}

impl ConstantQ {
    pub fn new(input_size: usize, values: Array1<f32>) -> Self {
        let grad = Array1::zeros(values.len());
        ConstantQ {
            input_size,
            values,
            grad,
            checks_width: true,
        }
    }

    /// Same stub, but accepts observations of any width.
    pub fn any_width(input_size: usize, values: Array1<f32>) -> Self {
        ConstantQ {
            checks_width: false,
            ..Self::new(input_size, values)
        }
    }

    pub fn values(&self) -> &Array1<f32> {
        &self.values
    }

    pub fn set_values(&mut self, values: Array1<f32>) {
        let mut parameters = Parameters::new();
        parameters.push("values", values.into_dyn());
        self.load_parameters(&parameters).unwrap();
    }

    pub fn grad(&self) -> &Array1<f32> {
        &self.grad
    }

    fn tile(&self, rows: usize) -> Array2<f32> {
        Array2::from_shape_fn((rows, self.values.len()), |(_, j)| self.values[j])
    }
}

impl QFunction for ConstantQ {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.values.len()
    }

    fn evaluate_batch(&self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        if self.checks_width {
            check_input_width(states, self.input_size)?;
        }
        Ok(self.tile(states.nrows()))
    }

    fn parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.push("values", self.values.clone().into_dyn());
        parameters
    }

    fn load_parameters(&mut self, parameters: &Parameters) -> Result<()> {
        self.parameters().check_compatible(parameters)?;
        if let Some(values) = parameters.get("values") {
            self.values
                .assign(&values.view().into_dimensionality::<ndarray::Ix1>()?);
        }
        Ok(())
    }
}

impl Trainable for ConstantQ {
    fn forward_train(&mut self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.evaluate_batch(states)
    }

    fn backward(&mut self, output_grad: ArrayView2<f32>) -> Result<()> {
        self.grad += &output_grad.sum_axis(Axis(0));
        Ok(())
    }

    fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    fn params_and_grads(&mut self) -> Vec<(ArrayViewMutD<'_, f32>, ArrayViewD<'_, f32>)> {
        let ConstantQ { values, grad, .. } = self;
        vec![(values.view_mut().into_dyn(), grad.view().into_dyn())]
    }
}

/// One-dimensional transition `i -> i + 1`.
pub fn transition(i: usize, action: usize, reward: f32, done: bool) -> Experience {
    Experience::new(array![i as f32], action, reward, done, array![i as f32 + 1.0])
}
