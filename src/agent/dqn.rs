use crate::approximator::{argmax, check_input_width, QFunction, Trainable};
use crate::config::{AgentConfig, LearnTrigger};
use crate::error::{DdqnError, Result};
use crate::loss;
use crate::network::Mlp;
use crate::optimizer::{Adam, Optimizer, OptimizerWrapper};
use crate::replay_buffer::{Batch, Experience, ReplayBuffer};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

/// Double Deep Q-Network agent.
///
/// The agent owns an online approximator, a target approximator, an
/// optimizer bound to the online approximator and a replay buffer:
/// - `act` picks actions epsilon-greedily from the online network
/// - `step` stores a transition and runs `learn` when the configured
///   [`LearnTrigger`] fires
/// - `learn` fits the online network to Double-Q targets (next action
///   selected by the online network, evaluated by the target network)
/// - the target network is hard-copied from the online network whenever
///   `t_frame % sync_frame == 0` after a learn step
///
/// # Example
///
/// ```rust
/// use doubleq::agent::AgentBuilder;
/// use doubleq::replay_buffer::Experience;
/// use ndarray::array;
///
/// let mut agent = AgentBuilder::new(2, 2)
///     .hidden_layers(&[16])
///     .buffer_length(8)
///     .batch_size(4)
///     .sync_frame(8)
///     .seed(3)
///     .build()
///     .unwrap();
///
/// let state = array![0.1, -0.2];
/// let action = agent.act(state.view(), 0.1).unwrap();
/// let next_state = array![0.15, -0.25];
///
/// let loss = agent
///     .step(Experience::new(state, action, 1.0, false, next_state))
///     .unwrap();
/// assert!(loss.is_none()); // buffer not yet full
/// ```
pub struct Agent<Q, O> {
    config: AgentConfig,
    online: Q,
    target: Q,
    optimizer: O,
    buffer: ReplayBuffer,
    rng: StdRng,
    t_frame: u64,
    learn_steps: u64,
    filled: bool,
}

impl<Q: Trainable, O: Optimizer> Agent<Q, O> {
    /// Validates `config`, checks both approximators against it and loads
    /// the online parameters into `target`.
    pub fn new(config: AgentConfig, online: Q, mut target: Q, optimizer: O) -> Result<Self> {
        config.validate()?;
        check_dimensions(&online, &config, "online")?;
        check_dimensions(&target, &config, "target")?;
        target.load_parameters(&online.parameters())?;

        let (buffer, rng) = match config.seed {
            Some(seed) => (
                ReplayBuffer::with_seed(config.buffer_length, seed)?,
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (
                ReplayBuffer::new(config.buffer_length)?,
                StdRng::from_entropy(),
            ),
        };

        info!(
            observation_size = config.observation_size,
            action_size = config.action_size,
            buffer_length = config.buffer_length,
            sync_frame = config.sync_frame,
            "created double DQN agent"
        );

        Ok(Agent {
            config,
            online,
            target,
            optimizer,
            buffer,
            rng,
            t_frame: 0,
            learn_steps: 0,
            filled: false,
        })
    }

    /// Epsilon-greedy action for one observation.
    pub fn act(&mut self, state: ArrayView1<f32>, epsilon: f32) -> Result<usize> {
        check_epsilon(epsilon)?;
        if state.len() != self.config.observation_size {
            return Err(DdqnError::shape_mismatch(
                format!("state of length {}", self.config.observation_size),
                format!("length {}", state.len()),
            ));
        }

        if self.rng.gen::<f32>() < epsilon {
            Ok(self.rng.gen_range(0..self.config.action_size))
        } else {
            let q_values = self.online.evaluate(state)?;
            Ok(argmax(q_values.view()))
        }
    }

    /// Epsilon-greedy actions for a batch of observations, one independent
    /// exploration draw per row.
    pub fn act_batch(&mut self, states: ArrayView2<f32>, epsilon: f32) -> Result<Vec<usize>> {
        check_epsilon(epsilon)?;
        check_input_width(states, self.config.observation_size)?;
        let q_values = self.online.evaluate_batch(states)?;
        let action_size = self.config.action_size;
        Ok(q_values
            .axis_iter(Axis(0))
            .map(|row| {
                if self.rng.gen::<f32>() < epsilon {
                    self.rng.gen_range(0..action_size)
                } else {
                    argmax(row)
                }
            })
            .collect())
    }

    /// Online network action-values for one observation.
    pub fn q_values(&self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.online.evaluate(state)
    }

    /// Store a transition, advance `t_frame`, and learn if due.
    ///
    /// Returns the loss when a learn step ran.
    pub fn step(&mut self, experience: Experience) -> Result<Option<f32>> {
        experience.validate(self.config.observation_size, self.config.action_size)?;
        self.buffer.add(experience);
        self.t_frame += 1;

        if self.learn_due() {
            self.learn().map(Some)
        } else {
            Ok(None)
        }
    }

    fn learn_due(&mut self) -> bool {
        let len = self.buffer.len();
        match self.config.learn_trigger {
            LearnTrigger::OnFill => len == self.config.buffer_length,
            LearnTrigger::FirstFill => {
                if !self.filled && len == self.config.buffer_length {
                    self.filled = true;
                    true
                } else {
                    false
                }
            }
            LearnTrigger::Periodic { min_buffer } => {
                len >= min_buffer.max(self.config.batch_size)
                    && self.t_frame % self.config.update_rate as u64 == 0
            }
            LearnTrigger::Manual => false,
        }
    }

    /// Sample a batch and run one gradient step on it.
    pub fn learn(&mut self) -> Result<f32> {
        let batch = self.buffer.sample(self.config.batch_size)?;
        self.learn_on(&batch)
    }

    /// One gradient step on the given batch, followed by the target sync
    /// check. A non-finite loss aborts before any parameter changes.
    pub fn learn_on(&mut self, batch: &Batch) -> Result<f32> {
        let td = self.td_targets(batch)?;

        let q_values = self.online.forward_train(batch.states.view())?;
        let state_action_values = loss::gather(q_values.view(), &batch.actions)?;
        let loss_value = loss::mse(state_action_values.view(), td.targets.view())?;
        if !loss_value.is_finite() {
            warn!(t_frame = self.t_frame, loss = loss_value, "non-finite TD loss");
            return Err(DdqnError::Numerical(format!(
                "TD loss is {} at frame {}",
                loss_value, self.t_frame
            )));
        }

        let output_grad = loss::td_output_grad(q_values.view(), &batch.actions, td.targets.view())?;
        self.optimizer.zero_grad(&mut self.online);
        self.online.backward(output_grad.view())?;
        self.optimizer.step(&mut self.online)?;
        self.learn_steps += 1;

        debug!(
            t_frame = self.t_frame,
            learn_steps = self.learn_steps,
            loss = loss_value,
            "learn step"
        );

        self.target_net_update()?;
        Ok(loss_value)
    }

    /// TD loss on a freshly sampled batch, without updating anything.
    pub fn calc_loss(&mut self) -> Result<f32> {
        let batch = self.buffer.sample(self.config.batch_size)?;
        self.calc_loss_on(&batch)
    }

    /// TD loss on the given batch, without updating anything.
    pub fn calc_loss_on(&self, batch: &Batch) -> Result<f32> {
        let td = self.td_targets(batch)?;
        let q_values = self.online.evaluate_batch(batch.states.view())?;
        let state_action_values = loss::gather(q_values.view(), &batch.actions)?;
        loss::mse(state_action_values.view(), td.targets.view())
    }

    /// Double-Q targets for `batch`. Uses only the non-recording
    /// evaluation path of both networks.
    pub fn td_targets(&self, batch: &Batch) -> Result<loss::TdTargets> {
        let online_next = self.online.evaluate_batch(batch.next_states.view())?;
        let target_next = self.target.evaluate_batch(batch.next_states.view())?;
        loss::double_q_targets(
            online_next.view(),
            target_next.view(),
            batch.rewards.view(),
            &batch.dones,
            self.config.discount_factor,
        )
    }

    fn target_net_update(&mut self) -> Result<()> {
        if self.t_frame % self.config.sync_frame as u64 == 0 {
            self.sync_target_network()?;
        }
        Ok(())
    }

    /// Overwrite the target network with the online network's parameters.
    pub fn sync_target_network(&mut self) -> Result<()> {
        self.target.load_parameters(&self.online.parameters())?;
        info!(t_frame = self.t_frame, "synced target network");
        Ok(())
    }

    pub fn t_frame(&self) -> u64 {
        self.t_frame
    }

    pub fn learn_steps(&self) -> u64 {
        self.learn_steps
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn online(&self) -> &Q {
        &self.online
    }

    pub fn target(&self) -> &Q {
        &self.target
    }

    pub fn online_mut(&mut self) -> &mut Q {
        &mut self.online
    }

    pub fn target_mut(&mut self) -> &mut Q {
        &mut self.target
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }
}

impl<Q: Trainable> Agent<Q, Adam> {
    /// Agent whose Adam optimizer is bound to `online` at
    /// `config.learning_rate`.
    pub fn with_adam(config: AgentConfig, online: Q, target: Q) -> Result<Self> {
        let optimizer = Adam::new(&online.parameters(), config.learning_rate);
        Self::new(config, online, target, optimizer)
    }
}

fn check_dimensions<Q: QFunction>(network: &Q, config: &AgentConfig, role: &str) -> Result<()> {
    if network.input_size() != config.observation_size
        || network.output_size() != config.action_size
    {
        return Err(DdqnError::shape_mismatch(
            format!(
                "{} network mapping {} -> {}",
                role, config.observation_size, config.action_size
            ),
            format!("{} -> {}", network.input_size(), network.output_size()),
        ));
    }
    Ok(())
}

fn check_epsilon(epsilon: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&epsilon) {
        return Err(DdqnError::invalid_configuration(
            "epsilon",
            format!("must be in [0, 1], got {}", epsilon),
        ));
    }
    Ok(())
}

/// Builder for an [`Agent`] over [`Mlp`] networks with an Adam optimizer
pub struct AgentBuilder {
    config: AgentConfig,
    hidden_layers: Vec<usize>,
    network_seed: Option<u64>,
}

impl AgentBuilder {
    pub fn new(observation_size: usize, action_size: usize) -> Self {
        AgentBuilder {
            config: AgentConfig::new(1000, 10_000, action_size, observation_size),
            hidden_layers: vec![64, 64],
            network_seed: None,
        }
    }

    /// Start from an existing config.
    pub fn from_config(config: AgentConfig) -> Self {
        AgentBuilder {
            config,
            hidden_layers: vec![64, 64],
            network_seed: None,
        }
    }

    pub fn hidden_layers(mut self, sizes: &[usize]) -> Self {
        self.hidden_layers = sizes.to_vec();
        self
    }

    pub fn sync_frame(mut self, sync_frame: usize) -> Self {
        self.config.sync_frame = sync_frame;
        self
    }

    pub fn buffer_length(mut self, buffer_length: usize) -> Self {
        self.config.buffer_length = buffer_length;
        self
    }

    pub fn discount_factor(mut self, discount_factor: f32) -> Self {
        self.config.discount_factor = discount_factor;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.config.learning_rate = learning_rate;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn update_rate(mut self, update_rate: usize) -> Self {
        self.config.update_rate = update_rate;
        self
    }

    pub fn learn_trigger(mut self, learn_trigger: LearnTrigger) -> Self {
        self.config.learn_trigger = learn_trigger;
        self
    }

    /// Seeds network initialisation, exploration and replay sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self.network_seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<Agent<Mlp, OptimizerWrapper>> {
        self.config.validate()?;

        let mut layer_sizes = Vec::with_capacity(self.hidden_layers.len() + 2);
        layer_sizes.push(self.config.observation_size);
        layer_sizes.extend_from_slice(&self.hidden_layers);
        layer_sizes.push(self.config.action_size);

        let seed = self.network_seed.unwrap_or_else(rand::random);
        let online = Mlp::new(&layer_sizes, seed)?;
        let target = Mlp::new(&layer_sizes, seed.wrapping_add(1))?;
        let optimizer =
            OptimizerWrapper::Adam(Adam::new(&online.parameters(), self.config.learning_rate));

        Agent::new(self.config, online, target, optimizer)
    }
}
