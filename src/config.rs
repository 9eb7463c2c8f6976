//! Construction parameters for the [`Agent`](crate::agent::Agent).
//!
//! An [`AgentConfig`] can be built in code or loaded from JSON:
//!
//! ```rust
//! use doubleq::config::{AgentConfig, LearnTrigger};
//!
//! let config = AgentConfig::new(100, 1000, 2, 4)
//!     .with_batch_size(32)
//!     .with_learn_trigger(LearnTrigger::Periodic { min_buffer: 500 });
//! assert!(config.validate().is_ok());
//!
//! let json = r#"{ "sync_frame": 100, "buffer_length": 1000, "action_size": 2, "observation_size": 4 }"#;
//! let loaded = AgentConfig::from_json_str(json).unwrap();
//! assert_eq!(loaded.discount_factor, 0.99);
//! ```

use crate::error::{DdqnError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Decides on which `step` calls the agent runs `learn()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LearnTrigger {
    /// Learn whenever the buffer length equals `buffer_length` after an insert.
    ///
    /// The buffer never grows past its capacity, so once it has filled this
    /// holds on every subsequent step.
    #[default]
    OnFill,
    /// Learn only on the single step at which the buffer first becomes full.
    FirstFill,
    /// Learn every `update_rate` frames once the buffer holds at least
    /// `max(min_buffer, batch_size)` records.
    Periodic { min_buffer: usize },
    /// Never learn from `step`; the caller drives `learn()` itself.
    Manual,
}

fn default_discount_factor() -> f32 {
    0.99
}

fn default_learning_rate() -> f32 {
    1e-3
}

fn default_batch_size() -> usize {
    64
}

fn default_update_rate() -> usize {
    4
}

/// Agent hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Target network is hard-synced when `t_frame % sync_frame == 0` after a learn step
    pub sync_frame: usize,
    /// Replay buffer capacity
    pub buffer_length: usize,
    pub action_size: usize,
    pub observation_size: usize,
    #[serde(default = "default_discount_factor")]
    pub discount_factor: f32,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Frame cadence for [`LearnTrigger::Periodic`]
    #[serde(default = "default_update_rate")]
    pub update_rate: usize,
    #[serde(default)]
    pub learn_trigger: LearnTrigger,
    /// Seeds exploration and replay sampling; `None` seeds from entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

impl AgentConfig {
    pub fn new(
        sync_frame: usize,
        buffer_length: usize,
        action_size: usize,
        observation_size: usize,
    ) -> Self {
        AgentConfig {
            sync_frame,
            buffer_length,
            action_size,
            observation_size,
            discount_factor: default_discount_factor(),
            learning_rate: default_learning_rate(),
            batch_size: default_batch_size(),
            update_rate: default_update_rate(),
            learn_trigger: LearnTrigger::default(),
            seed: None,
        }
    }

    pub fn with_discount_factor(mut self, discount_factor: f32) -> Self {
        self.discount_factor = discount_factor;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_update_rate(mut self, update_rate: usize) -> Self {
        self.update_rate = update_rate;
        self
    }

    pub fn with_learn_trigger(mut self, learn_trigger: LearnTrigger) -> Self {
        self.learn_trigger = learn_trigger;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check every parameter, failing on the first one out of range.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("sync_frame", self.sync_frame),
            ("buffer_length", self.buffer_length),
            ("action_size", self.action_size),
            ("observation_size", self.observation_size),
            ("batch_size", self.batch_size),
            ("update_rate", self.update_rate),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(DdqnError::invalid_configuration(name, "must be greater than 0"));
            }
        }

        if !(self.discount_factor > 0.0 && self.discount_factor <= 1.0) {
            return Err(DdqnError::invalid_configuration(
                "discount_factor",
                format!("must be in (0, 1], got {}", self.discount_factor),
            ));
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(DdqnError::invalid_configuration(
                "learning_rate",
                format!("must be finite and positive, got {}", self.learning_rate),
            ));
        }

        if self.batch_size > self.buffer_length {
            return Err(DdqnError::invalid_configuration(
                "batch_size",
                format!(
                    "{} exceeds buffer_length {}, no batch could ever be sampled",
                    self.batch_size, self.buffer_length
                ),
            ));
        }

        if let LearnTrigger::Periodic { min_buffer } = self.learn_trigger {
            if min_buffer > self.buffer_length {
                return Err(DdqnError::invalid_configuration(
                    "min_buffer",
                    format!(
                        "{} exceeds buffer_length {}, the trigger could never fire",
                        min_buffer, self.buffer_length
                    ),
                ));
            }
        }

        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AgentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::new(10, 100, 2, 4);
        assert_eq!(config.discount_factor, 0.99);
        assert_eq!(config.learning_rate, 1e-3);
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.update_rate, 4);
        assert_eq!(config.learn_trigger, LearnTrigger::OnFill);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        for config in [
            AgentConfig::new(0, 100, 2, 4),
            AgentConfig::new(10, 0, 2, 4),
            AgentConfig::new(10, 100, 0, 4),
            AgentConfig::new(10, 100, 2, 0),
            AgentConfig::new(10, 100, 2, 4).with_batch_size(0),
            AgentConfig::new(10, 100, 2, 4).with_update_rate(0),
        ] {
            assert!(matches!(
                config.validate(),
                Err(DdqnError::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn test_discount_and_learning_rate_bounds() {
        let base = AgentConfig::new(10, 100, 2, 4);
        assert!(base.clone().with_discount_factor(1.0).validate().is_ok());
        assert!(base.clone().with_discount_factor(0.0).validate().is_err());
        assert!(base.clone().with_discount_factor(1.5).validate().is_err());
        assert!(base.clone().with_discount_factor(f32::NAN).validate().is_err());
        assert!(base.clone().with_learning_rate(-1e-3).validate().is_err());
        assert!(base.with_learning_rate(f32::INFINITY).validate().is_err());
    }

    #[test]
    fn test_batch_larger_than_buffer_rejected() {
        let config = AgentConfig::new(10, 16, 2, 4).with_batch_size(32);
        match config.validate() {
            Err(DdqnError::InvalidConfiguration { name, .. }) => assert_eq!(name, "batch_size"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unreachable_min_buffer_rejected() {
        let base = AgentConfig::new(10, 16, 2, 4).with_batch_size(8);
        let config = base
            .clone()
            .with_learn_trigger(LearnTrigger::Periodic { min_buffer: 17 });
        match config.validate() {
            Err(DdqnError::InvalidConfiguration { name, .. }) => assert_eq!(name, "min_buffer"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(base
            .clone()
            .with_learn_trigger(LearnTrigger::Periodic { min_buffer: 16 })
            .validate()
            .is_ok());
        assert!(base.with_learn_trigger(LearnTrigger::Manual).validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip_with_trigger() {
        let config = AgentConfig::new(50, 500, 3, 6)
            .with_batch_size(16)
            .with_learn_trigger(LearnTrigger::Periodic { min_buffer: 100 })
            .with_seed(7);
        let json = config.to_json_string().unwrap();
        assert!(json.contains("\"periodic\""));
        let parsed = AgentConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_json_invalid_values_rejected() {
        let json = r#"{ "sync_frame": 0, "buffer_length": 100, "action_size": 2, "observation_size": 4 }"#;
        assert!(matches!(
            AgentConfig::from_json_str(json),
            Err(DdqnError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            AgentConfig::from_json_str("{ not json"),
            Err(DdqnError::Serialization(_))
        ));
    }
}
