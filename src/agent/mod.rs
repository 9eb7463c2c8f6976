//! # Double DQN Agent
//!
//! The agent ties together the pieces of the learning core:
//!
//! - **Action selection**: epsilon-greedy over the online network's action-values
//! - **Experience storage**: every `step` pushes one transition into a FIFO
//!   [`ReplayBuffer`](crate::replay_buffer::ReplayBuffer)
//! - **Learning**: Double-Q TD targets, where the online network selects the
//!   next action and the target network evaluates it
//! - **Target synchronisation**: periodic hard copy of online parameters into
//!   the target network
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use doubleq::agent::Agent;
//! use doubleq::config::{AgentConfig, LearnTrigger};
//! use doubleq::network::Mlp;
//! use doubleq::replay_buffer::Experience;
//! use ndarray::array;
//!
//! let config = AgentConfig::new(500, 5000, 2, 4)
//!     .with_learn_trigger(LearnTrigger::Periodic { min_buffer: 1000 })
//!     .with_seed(11);
//! let online = Mlp::new(&[4, 128, 128, 2], 1).unwrap();
//! let target = Mlp::new(&[4, 128, 128, 2], 2).unwrap();
//! let mut agent = Agent::with_adam(config, online, target).unwrap();
//!
//! let state = array![0.1, 0.2, -0.3, 0.4];
//! let action = agent.act(state.view(), 0.05).unwrap();
//! let next_state = array![0.12, 0.18, -0.31, 0.42];
//! if let Some(loss) = agent.step(Experience::new(state, action, 1.0, false, next_state)).unwrap() {
//!     println!("loss {}", loss);
//! }
//! ```

mod dqn;
pub use dqn::{Agent, AgentBuilder};
