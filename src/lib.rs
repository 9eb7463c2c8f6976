//! # doubleq - Double Deep Q-Learning core
//!
//! A small reinforcement-learning library implementing the learning core of
//! Double DQN for discrete-action control tasks:
//!
//! - **Replay buffer**: fixed-capacity FIFO store with uniform sampling
//!   (with replacement) and seedable randomness
//! - **Agent**: epsilon-greedy acting, learn triggering, Double-Q TD loss
//!   and periodic hard target-network synchronisation
//! - **Approximator seam**: value networks plug in through the
//!   [`approximator::QFunction`] and [`approximator::Trainable`] traits;
//!   [`network::Mlp`] is the bundled reference implementation
//! - **Optimizers**: SGD and Adam bound to the online network's parameters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doubleq::agent::AgentBuilder;
//! use doubleq::replay_buffer::Experience;
//! use ndarray::array;
//!
//! let mut agent = AgentBuilder::new(4, 2)
//!     .hidden_layers(&[128, 128])
//!     .buffer_length(10_000)
//!     .sync_frame(1000)
//!     .build()
//!     .unwrap();
//!
//! let state = array![0.0, 0.1, 0.0, -0.1];
//! let action = agent.act(state.view(), 0.1).unwrap();
//! let next_state = array![0.01, 0.12, -0.01, -0.12];
//! agent.step(Experience::new(state, action, 1.0, false, next_state)).unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`agent`] - The Double DQN agent and its builder
//! - [`approximator`] - Traits for value networks and parameter snapshots
//! - [`config`] - Agent hyperparameters, JSON loading and validation
//! - [`error`] - Error types and result handling
//! - [`loss`] - MSE and Double-Q TD targets
//! - [`network`] - Reference multi-layer perceptron
//! - [`optimizer`] - SGD and Adam
//! - [`replay_buffer`] - Experience storage and minibatch sampling

pub mod agent;
pub mod approximator;
pub mod config;
pub mod error;
pub mod loss;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;

#[cfg(test)]
mod tests;
