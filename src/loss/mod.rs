//! # Loss Computation
//!
//! - [`functions`]: mean squared error and its gradient
//! - [`double_q`]: Double-Q TD targets and the gradient of the TD loss
//!   with respect to the online network's full action-value matrix

pub mod double_q;
pub mod functions;

pub use double_q::{double_q_targets, gather, td_output_grad, TdTargets};
pub use functions::{mse, mse_grad};
