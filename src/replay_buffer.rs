use crate::error::{DdqnError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One environment transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub done: bool,
    pub next_state: Array1<f32>,
}

impl Experience {
    pub fn new(
        state: Array1<f32>,
        action: usize,
        reward: f32,
        done: bool,
        next_state: Array1<f32>,
    ) -> Self {
        Experience {
            state,
            action,
            reward,
            done,
            next_state,
        }
    }

    /// Check the transition against the observation and action dimensions.
    pub fn validate(&self, observation_size: usize, action_size: usize) -> Result<()> {
        if self.state.len() != observation_size {
            return Err(DdqnError::shape_mismatch(
                format!("state of length {}", observation_size),
                format!("length {}", self.state.len()),
            ));
        }
        if self.next_state.len() != observation_size {
            return Err(DdqnError::shape_mismatch(
                format!("next_state of length {}", observation_size),
                format!("length {}", self.next_state.len()),
            ));
        }
        if self.action >= action_size {
            return Err(DdqnError::shape_mismatch(
                format!("action in [0, {})", action_size),
                self.action,
            ));
        }
        Ok(())
    }
}

/// A minibatch split into parallel columns; row `i` of every column
/// belongs to the same transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub states: Array2<f32>,
    pub actions: Vec<usize>,
    pub rewards: Array1<f32>,
    pub dones: Vec<bool>,
    pub next_states: Array2<f32>,
}

impl Batch {
    pub fn from_experiences<'a, I>(experiences: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Experience>,
    {
        let experiences: Vec<&Experience> = experiences.into_iter().collect();
        let first = experiences.first().ok_or(DdqnError::InsufficientData {
            requested: 1,
            available: 0,
        })?;

        let batch_size = experiences.len();
        let state_size = first.state.len();
        let mut states = Array2::zeros((batch_size, state_size));
        let mut next_states = Array2::zeros((batch_size, state_size));
        let mut actions = Vec::with_capacity(batch_size);
        let mut rewards = Array1::zeros(batch_size);
        let mut dones = Vec::with_capacity(batch_size);

        for (i, exp) in experiences.iter().enumerate() {
            if exp.state.len() != state_size || exp.next_state.len() != state_size {
                return Err(DdqnError::shape_mismatch(
                    format!("states of length {}", state_size),
                    format!(
                        "state {} / next_state {} in row {}",
                        exp.state.len(),
                        exp.next_state.len(),
                        i
                    ),
                ));
            }
            states.row_mut(i).assign(&exp.state);
            next_states.row_mut(i).assign(&exp.next_state);
            actions.push(exp.action);
            rewards[i] = exp.reward;
            dones.push(exp.done);
        }

        Ok(Batch {
            states,
            actions,
            rewards,
            dones,
            next_states,
        })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Fixed-capacity FIFO store of transitions with uniform sampling.
///
/// Once full, every `add` evicts the oldest record. Sampling draws
/// indices independently, so one batch may contain the same record
/// more than once.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    buffer: VecDeque<Experience>,
    capacity: usize,
    rng: StdRng,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    /// Buffer whose sampling sequence is reproducible.
    pub fn with_seed(capacity: usize, seed: u64) -> Result<Self> {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Result<Self> {
        if capacity == 0 {
            return Err(DdqnError::invalid_configuration(
                "capacity",
                "must be greater than 0",
            ));
        }
        Ok(ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            rng,
        })
    }

    pub fn add(&mut self, experience: Experience) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(experience);
    }

    /// Draw `batch_size` records uniformly with replacement.
    pub fn sample(&mut self, batch_size: usize) -> Result<Batch> {
        let indices = sample_indices(&mut self.rng, batch_size, self.buffer.len())?;
        Batch::from_experiences(indices.into_iter().map(|i| &self.buffer[i]))
    }

    /// Same as [`sample`](Self::sample) but driven by a caller-supplied RNG.
    pub fn sample_with<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Batch> {
        let indices = sample_indices(rng, batch_size, self.buffer.len())?;
        Batch::from_experiences(indices.into_iter().map(|i| &self.buffer[i]))
    }

    /// The whole buffer, oldest first, as a single batch.
    pub fn as_batch(&self) -> Result<Batch> {
        Batch::from_experiences(self.buffer.iter())
    }

    /// Stored records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

fn sample_indices<R: Rng + ?Sized>(
    rng: &mut R,
    batch_size: usize,
    available: usize,
) -> Result<Vec<usize>> {
    if batch_size == 0 || batch_size > available {
        return Err(DdqnError::InsufficientData {
            requested: batch_size,
            available,
        });
    }
    Ok((0..batch_size).map(|_| rng.gen_range(0..available)).collect())
}
