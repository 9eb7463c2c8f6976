use ndarray::{ArrayD, Zip};
use serde::{Deserialize, Serialize};

use crate::approximator::{Parameters, Trainable};
use crate::error::{DdqnError, Result};

/// Gradient-descent update rule applied to a [`Trainable`] model.
pub trait Optimizer {
    /// Clear gradients accumulated by earlier backward passes.
    fn zero_grad(&mut self, model: &mut dyn Trainable) {
        model.zero_grad();
    }

    /// Apply one update from the model's accumulated gradients.
    fn step(&mut self, model: &mut dyn Trainable) -> Result<()>;

    fn learning_rate(&self) -> f32;
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    Sgd(Sgd),
    Adam(Adam),
}

impl Optimizer for OptimizerWrapper {
    fn zero_grad(&mut self, model: &mut dyn Trainable) {
        match self {
            OptimizerWrapper::Sgd(optimizer) => optimizer.zero_grad(model),
            OptimizerWrapper::Adam(optimizer) => optimizer.zero_grad(model),
        }
    }

    fn step(&mut self, model: &mut dyn Trainable) -> Result<()> {
        match self {
            OptimizerWrapper::Sgd(optimizer) => optimizer.step(model),
            OptimizerWrapper::Adam(optimizer) => optimizer.step(model),
        }
    }

    fn learning_rate(&self) -> f32 {
        match self {
            OptimizerWrapper::Sgd(optimizer) => optimizer.learning_rate(),
            OptimizerWrapper::Adam(optimizer) => optimizer.learning_rate(),
        }
    }
}

/// Plain stochastic gradient descent.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Sgd {
    pub learning_rate: f32,
}

impl Sgd {
    pub fn new(learning_rate: f32) -> Sgd {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, model: &mut dyn Trainable) -> Result<()> {
        for (mut param, grad) in model.params_and_grads() {
            if param.shape() != grad.shape() {
                return Err(DdqnError::shape_mismatch(
                    format!("{:?}", param.shape()),
                    format!("{:?}", grad.shape()),
                ));
            }
            param.scaled_add(-self.learning_rate, &grad);
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

/// Adam with per-tensor moment estimates.
///
/// The moment buffers are shaped from the parameter set given at
/// construction, binding the optimizer to that model.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    pub t: i32,
    m: Vec<ArrayD<f32>>,
    v: Vec<ArrayD<f32>>,
}

impl Adam {
    pub fn new(parameters: &Parameters, learning_rate: f32) -> Self {
        Self::with_betas(parameters, learning_rate, 0.9, 0.999, 1e-8)
    }

    pub fn with_betas(
        parameters: &Parameters,
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    ) -> Self {
        let zeros: Vec<ArrayD<f32>> = parameters
            .iter()
            .map(|(_, tensor)| ArrayD::zeros(tensor.raw_dim()))
            .collect();
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: zeros.clone(),
            v: zeros,
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, model: &mut dyn Trainable) -> Result<()> {
        let pairs = model.params_and_grads();
        if pairs.len() != self.m.len() {
            return Err(DdqnError::shape_mismatch(
                format!("{} parameter tensors", self.m.len()),
                pairs.len(),
            ));
        }
        for ((param, grad), m) in pairs.iter().zip(&self.m) {
            if param.shape() != m.shape() || grad.shape() != m.shape() {
                return Err(DdqnError::shape_mismatch(
                    format!("{:?}", m.shape()),
                    format!("{:?}", param.shape()),
                ));
            }
        }

        self.t += 1;
        let (beta1, beta2, epsilon, lr) = (self.beta1, self.beta2, self.epsilon, self.learning_rate);
        let bias_correction1 = 1.0 - beta1.powi(self.t);
        let bias_correction2 = 1.0 - beta2.powi(self.t);

        for ((param, grad), (m, v)) in pairs
            .into_iter()
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            Zip::from(param)
                .and(&grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / bias_correction1;
                    let v_hat = *v / bias_correction2;
                    *p -= lr * m_hat / (v_hat.sqrt() + epsilon);
                });
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}
