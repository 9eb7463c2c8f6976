use ndarray::{Array1, Array2, ArrayView2, ArrayViewD, ArrayViewMutD, Axis, Ix1, Ix2};
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::approximator::{check_input_width, Parameters, QFunction, Trainable};
use crate::error::{DdqnError, Result};

/// Activation applied after a layer's affine transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => inputs.mapv_inplace(|v| v.max(0.0)),
            Activation::Linear => {}
        }
    }

    /// Derivative evaluated at the pre-activation values.
    fn derivative(&self, pre_activation: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array2::ones(pre_activation.dim()),
        }
    }
}

/// A fully connected layer. `weights` has shape `(inputs, outputs)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dense {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    grad_weights: Array2<f32>,
    #[serde(skip)]
    grad_biases: Array1<f32>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
    #[serde(skip)]
    pre_activation: Option<Array2<f32>>,
}

impl Dense {
    /// Weights drawn uniformly from ±sqrt(1 / input_size), biases zero.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let bound = (1.0 / input_size.max(1) as f32).sqrt();
        let weights = Array2::random_using(
            (input_size, output_size),
            Uniform::new_inclusive(-bound, bound),
            rng,
        );
        Self::from_parts(weights, Array1::zeros(output_size), activation)
    }

    /// Layer with explicit weights and zero biases.
    pub fn with_weights(weights: Array2<f32>, activation: Activation) -> Self {
        let outputs = weights.ncols();
        Self::from_parts(weights, Array1::zeros(outputs), activation)
    }

    pub fn with_biases(mut self, biases: Array1<f32>) -> Result<Self> {
        if biases.len() != self.weights.ncols() {
            return Err(DdqnError::shape_mismatch(
                format!("{} biases", self.weights.ncols()),
                biases.len(),
            ));
        }
        self.biases = biases;
        Ok(self)
    }

    fn from_parts(weights: Array2<f32>, biases: Array1<f32>, activation: Activation) -> Self {
        let grad_weights = Array2::zeros(weights.dim());
        let grad_biases = Array1::zeros(biases.dim());
        Dense {
            weights,
            biases,
            activation,
            grad_weights,
            grad_biases,
            inputs: None,
            pre_activation: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    fn affine(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        inputs.dot(&self.weights) + &self.biases
    }

    fn forward(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut outputs = self.affine(inputs);
        self.activation.apply(&mut outputs);
        outputs
    }

    fn forward_train(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let pre_activation = self.affine(inputs);
        let mut outputs = pre_activation.clone();
        self.activation.apply(&mut outputs);
        self.inputs = Some(inputs.to_owned());
        self.pre_activation = Some(pre_activation);
        outputs
    }

    /// Accumulates gradients and returns dLoss/dInputs.
    fn backward(&mut self, output_grad: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.ensure_grads();
        let (inputs, pre_activation) = match (&self.inputs, &self.pre_activation) {
            (Some(inputs), Some(pre)) => (inputs, pre),
            _ => {
                return Err(DdqnError::Training(
                    "backward called without a preceding forward_train".to_string(),
                ))
            }
        };
        if output_grad.dim() != pre_activation.dim() {
            return Err(DdqnError::shape_mismatch(
                format!("{:?}", pre_activation.dim()),
                format!("{:?}", output_grad.dim()),
            ));
        }

        let delta = &output_grad * &self.activation.derivative(pre_activation.view());
        self.grad_weights += &inputs.t().dot(&delta);
        self.grad_biases += &delta.sum_axis(Axis(0));
        Ok(delta.dot(&self.weights.t()))
    }

    fn zero_grad(&mut self) {
        self.ensure_grads();
        self.grad_weights.fill(0.0);
        self.grad_biases.fill(0.0);
    }

    // Gradient buffers are skipped by serde, so they come back empty after a load.
    fn ensure_grads(&mut self) {
        if self.grad_weights.dim() != self.weights.dim() {
            self.grad_weights = Array2::zeros(self.weights.dim());
        }
        if self.grad_biases.dim() != self.biases.dim() {
            self.grad_biases = Array1::zeros(self.biases.dim());
        }
    }
}

/// Multi-layer perceptron: ReLU hidden layers, linear output layer.
///
/// # Examples
///
/// ```
/// use doubleq::approximator::QFunction;
/// use doubleq::network::Mlp;
/// use ndarray::array;
///
/// let net = Mlp::new(&[4, 32, 2], 42).unwrap();
/// let q_values = net.evaluate(array![0.1, -0.2, 0.3, 0.0].view()).unwrap();
/// assert_eq!(q_values.len(), 2);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mlp {
    layers: Vec<Dense>,
}

impl Mlp {
    /// `layer_sizes` lists every layer width, input first and action count last.
    pub fn new(layer_sizes: &[usize], seed: u64) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(DdqnError::invalid_configuration(
                "layer_sizes",
                "must contain at least input and output sizes",
            ));
        }
        if layer_sizes.iter().any(|&size| size == 0) {
            return Err(DdqnError::invalid_configuration(
                "layer_sizes",
                "every layer must have at least one unit",
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let last = layer_sizes.len() - 2;
        let layers = layer_sizes
            .windows(2)
            .enumerate()
            .map(|(i, window)| {
                let activation = if i == last {
                    Activation::Linear
                } else {
                    Activation::Relu
                };
                Dense::new(window[0], window[1], activation, &mut rng)
            })
            .collect();

        Ok(Mlp { layers })
    }

    /// Network from explicit layers; consecutive widths must chain.
    pub fn from_layers(layers: Vec<Dense>) -> Result<Self> {
        if layers.is_empty() {
            return Err(DdqnError::invalid_configuration(
                "layers",
                "network needs at least one layer",
            ));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].output_size() != pair[1].input_size() {
                return Err(DdqnError::shape_mismatch(
                    format!("layer {} input of {}", i + 1, pair[0].output_size()),
                    pair[1].input_size(),
                ));
            }
        }
        Ok(Mlp { layers })
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(&serialized)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = fs::File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        let stored: Mlp = bincode::deserialize(&buffer)?;
        let mut network = Mlp::from_layers(stored.layers)?;
        for layer in &mut network.layers {
            layer.ensure_grads();
        }
        Ok(network)
    }
}

impl QFunction for Mlp {
    fn input_size(&self) -> usize {
        self.layers[0].input_size()
    }

    fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].output_size()
    }

    fn evaluate_batch(&self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_input_width(states, self.input_size())?;
        let mut current = states.to_owned();
        for layer in &self.layers {
            current = layer.forward(current.view());
        }
        Ok(current)
    }

    fn parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        for (i, layer) in self.layers.iter().enumerate() {
            parameters.push(format!("layer{}.weight", i), layer.weights.clone().into_dyn());
            parameters.push(format!("layer{}.bias", i), layer.biases.clone().into_dyn());
        }
        parameters
    }

    fn load_parameters(&mut self, parameters: &Parameters) -> Result<()> {
        self.parameters().check_compatible(parameters)?;
        let mut tensors = parameters.iter().map(|(_, tensor)| tensor);
        for layer in &mut self.layers {
            if let (Some(weights), Some(biases)) = (tensors.next(), tensors.next()) {
                layer
                    .weights
                    .assign(&weights.view().into_dimensionality::<Ix2>()?);
                layer
                    .biases
                    .assign(&biases.view().into_dimensionality::<Ix1>()?);
            }
        }
        Ok(())
    }
}

impl Trainable for Mlp {
    fn forward_train(&mut self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_input_width(states, self.input_size())?;
        let mut current = states.to_owned();
        for layer in &mut self.layers {
            current = layer.forward_train(current.view());
        }
        Ok(current)
    }

    fn backward(&mut self, output_grad: ArrayView2<f32>) -> Result<()> {
        let mut current = output_grad.to_owned();
        for layer in self.layers.iter_mut().rev() {
            current = layer.backward(current.view())?;
        }
        Ok(())
    }

    fn zero_grad(&mut self) {
        for layer in &mut self.layers {
            layer.zero_grad();
        }
    }

    fn params_and_grads(&mut self) -> Vec<(ArrayViewMutD<'_, f32>, ArrayViewD<'_, f32>)> {
        let mut pairs = Vec::with_capacity(self.layers.len() * 2);
        for layer in &mut self.layers {
            layer.ensure_grads();
            let Dense {
                weights,
                biases,
                grad_weights,
                grad_biases,
                ..
            } = layer;
            pairs.push((weights.view_mut().into_dyn(), grad_weights.view().into_dyn()));
            pairs.push((biases.view_mut().into_dyn(), grad_biases.view().into_dyn()));
        }
        pairs
    }
}
