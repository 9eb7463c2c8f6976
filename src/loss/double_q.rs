use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::approximator::argmax;
use crate::error::{DdqnError, Result};

/// Regression targets for one batch together with the next-state actions
/// the online network selected to produce them.
#[derive(Clone, Debug, PartialEq)]
pub struct TdTargets {
    pub targets: Array1<f32>,
    pub next_actions: Vec<usize>,
}

/// `q_values[i, actions[i]]` for every row.
pub fn gather(q_values: ArrayView2<f32>, actions: &[usize]) -> Result<Array1<f32>> {
    if q_values.nrows() != actions.len() {
        return Err(DdqnError::shape_mismatch(
            format!("{} actions", q_values.nrows()),
            actions.len(),
        ));
    }
    actions
        .iter()
        .enumerate()
        .map(|(i, &action)| {
            q_values.get((i, action)).copied().ok_or_else(|| {
                DdqnError::shape_mismatch(
                    format!("action in [0, {})", q_values.ncols()),
                    action,
                )
            })
        })
        .collect()
}

/// Double-Q targets: `reward + discount * Q_target(s')[argmax_a Q_online(s')[a]]`,
/// with the bootstrap term dropped for terminal transitions.
///
/// `online_next` selects the next action, `target_next` evaluates it.
pub fn double_q_targets(
    online_next: ArrayView2<f32>,
    target_next: ArrayView2<f32>,
    rewards: ArrayView1<f32>,
    dones: &[bool],
    discount_factor: f32,
) -> Result<TdTargets> {
    if online_next.dim() != target_next.dim() {
        return Err(DdqnError::shape_mismatch(
            format!("target values of shape {:?}", online_next.dim()),
            format!("{:?}", target_next.dim()),
        ));
    }
    let rows = online_next.nrows();
    if rewards.len() != rows || dones.len() != rows {
        return Err(DdqnError::shape_mismatch(
            format!("{} rewards and done flags", rows),
            format!("{} rewards, {} done flags", rewards.len(), dones.len()),
        ));
    }

    let mut targets = Array1::zeros(rows);
    let mut next_actions = Vec::with_capacity(rows);
    for i in 0..rows {
        let next_action = argmax(online_next.row(i));
        next_actions.push(next_action);
        targets[i] = if dones[i] {
            rewards[i]
        } else {
            rewards[i] + discount_factor * target_next[[i, next_action]]
        };
    }

    Ok(TdTargets {
        targets,
        next_actions,
    })
}

/// Gradient of `mse(gather(q_values, actions), targets)` with respect to the
/// whole `q_values` matrix. Only the taken action's column is non-zero in
/// each row; `targets` are treated as constants.
pub fn td_output_grad(
    q_values: ArrayView2<f32>,
    actions: &[usize],
    targets: ArrayView1<f32>,
) -> Result<Array2<f32>> {
    let selected = gather(q_values, actions)?;
    let row_grads = super::functions::mse_grad(selected.view(), targets)?;
    let mut grad = Array2::zeros(q_values.dim());
    for (i, &action) in actions.iter().enumerate() {
        grad[[i, action]] = row_grads[i];
    }
    Ok(grad)
}
