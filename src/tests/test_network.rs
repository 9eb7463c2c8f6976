use ndarray::{array, Array2};

use crate::approximator::{QFunction, Trainable};
use crate::error::DdqnError;
use crate::network::{Activation, Dense, Mlp};

#[test]
fn test_network_output_shape() {
    let network = Mlp::new(&[4, 32, 16, 3], 0).unwrap();
    assert_eq!(network.layers().len(), 3);
    assert_eq!(network.input_size(), 4);
    assert_eq!(network.output_size(), 3);

    let batch = Array2::from_shape_fn((5, 4), |(i, j)| (i * j) as f32 * 0.1);
    let output = network.evaluate_batch(batch.view()).unwrap();
    assert_eq!(output.dim(), (5, 3));

    // single evaluation agrees with the batched row
    let single = network.evaluate(batch.row(2)).unwrap();
    for (a, b) in single.iter().zip(output.row(2).iter()) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn test_seeded_initialisation_is_reproducible() {
    let a = Mlp::new(&[3, 8, 2], 99).unwrap();
    let b = Mlp::new(&[3, 8, 2], 99).unwrap();
    let c = Mlp::new(&[3, 8, 2], 100).unwrap();
    assert_eq!(a.parameters(), b.parameters());
    assert_ne!(a.parameters(), c.parameters());
}

#[test]
fn test_hidden_relu_output_linear() {
    let network = Mlp::new(&[2, 4, 4, 2], 1).unwrap();
    let activations: Vec<Activation> = network.layers().iter().map(|l| l.activation).collect();
    assert_eq!(
        activations,
        vec![Activation::Relu, Activation::Relu, Activation::Linear]
    );
}

#[test]
fn test_explicit_layers() {
    let hidden = Dense::with_weights(array![[1.0, -1.0]], Activation::Relu);
    let output = Dense::with_weights(array![[2.0], [3.0]], Activation::Linear)
        .with_biases(array![0.5])
        .unwrap();
    let network = Mlp::from_layers(vec![hidden, output]).unwrap();

    // relu([2, -2]) = [2, 0] -> 2 * 2 + 0.5
    let q = network.evaluate(array![2.0].view()).unwrap();
    assert_eq!(q, array![4.5]);

    let mismatched = vec![
        Dense::with_weights(array![[1.0, 1.0]], Activation::Relu),
        Dense::with_weights(array![[1.0]], Activation::Linear),
    ];
    assert!(matches!(
        Mlp::from_layers(mismatched),
        Err(DdqnError::ShapeMismatch { .. })
    ));
    assert!(Mlp::from_layers(vec![]).is_err());
    assert!(Dense::with_weights(array![[1.0, 1.0]], Activation::Linear)
        .with_biases(array![1.0])
        .is_err());
}

#[test]
fn test_invalid_layer_sizes() {
    assert!(matches!(
        Mlp::new(&[4], 0),
        Err(DdqnError::InvalidConfiguration { .. })
    ));
    assert!(matches!(
        Mlp::new(&[4, 0, 2], 0),
        Err(DdqnError::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_wrong_input_width() {
    let network = Mlp::new(&[3, 2], 0).unwrap();
    assert!(matches!(
        network.evaluate(array![1.0, 2.0].view()),
        Err(DdqnError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_parameter_export_and_load() {
    let source = Mlp::new(&[3, 5, 2], 10).unwrap();
    let mut dest = Mlp::new(&[3, 5, 2], 11).unwrap();
    let input = array![0.3, -0.7, 1.1];
    assert_ne!(
        source.evaluate(input.view()).unwrap(),
        dest.evaluate(input.view()).unwrap()
    );

    dest.load_parameters(&source.parameters()).unwrap();
    assert_eq!(
        source.evaluate(input.view()).unwrap(),
        dest.evaluate(input.view()).unwrap()
    );

    // the loaded copy is independent of the source
    let mut source = source;
    let params = source.parameters();
    let mut shifted = crate::approximator::Parameters::new();
    for (name, tensor) in params.iter() {
        shifted.push(name, tensor.mapv(|v| v + 1.0));
    }
    source.load_parameters(&shifted).unwrap();
    assert_ne!(source.parameters(), dest.parameters());

    let other_shape = Mlp::new(&[3, 4, 2], 0).unwrap();
    assert!(matches!(
        dest.load_parameters(&other_shape.parameters()),
        Err(DdqnError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_backward_requires_forward() {
    let mut network = Mlp::new(&[2, 3, 2], 0).unwrap();
    assert!(matches!(
        network.backward(Array2::ones((1, 2)).view()),
        Err(DdqnError::Training(_))
    ));
}

#[test]
fn test_gradients_match_finite_differences() {
    // loss = sum(output * weights_out), so dLoss/dOutput = weights_out
    let mut network = Mlp::new(&[2, 3, 2], 7).unwrap();
    let inputs = array![[0.4, -0.3], [1.2, 0.8]];
    let weights_out = array![[1.0, -0.5], [0.25, 2.0]];
    let loss = |net: &Mlp| -> f32 {
        (&net.evaluate_batch(inputs.view()).unwrap() * &weights_out).sum()
    };

    network.zero_grad();
    network.forward_train(inputs.view()).unwrap();
    network.backward(weights_out.view()).unwrap();
    let analytic: Vec<Vec<f32>> = network
        .params_and_grads()
        .into_iter()
        .map(|(_, grad)| grad.iter().copied().collect())
        .collect();

    let params = network.parameters();
    let h = 1e-3;
    for (t, (name, tensor)) in params.iter().enumerate() {
        for k in 0..tensor.len() {
            let perturbed = |delta: f32| {
                let mut shifted = crate::approximator::Parameters::new();
                for (other_name, other) in params.iter() {
                    let mut copy = other.clone();
                    if other_name == name {
                        let flat = copy.as_slice_mut().unwrap();
                        flat[k] += delta;
                    }
                    shifted.push(other_name, copy);
                }
                let mut perturbed = network.clone();
                perturbed.load_parameters(&shifted).unwrap();
                loss(&perturbed)
            };
            let numeric = (perturbed(h) - perturbed(-h)) / (2.0 * h);
            assert!(
                (numeric - analytic[t][k]).abs() < 1e-2,
                "{}[{}]: numeric {} analytic {}",
                name,
                k,
                numeric,
                analytic[t][k]
            );
        }
    }
}

#[test]
fn test_zero_grad_clears_accumulation() {
    let mut network = Mlp::new(&[2, 2], 0).unwrap();
    let inputs = array![[1.0, 2.0]];
    network.forward_train(inputs.view()).unwrap();
    network.backward(array![[1.0, 1.0]].view()).unwrap();
    network.forward_train(inputs.view()).unwrap();
    network.backward(array![[1.0, 1.0]].view()).unwrap();

    // two identical passes accumulate twice the bias gradient
    let bias_grad: Vec<f32> = network.params_and_grads()[1].1.iter().copied().collect();
    assert_eq!(bias_grad, vec![2.0, 2.0]);

    network.zero_grad();
    assert!(network
        .params_and_grads()
        .iter()
        .all(|(_, grad)| grad.iter().all(|&g| g == 0.0)));
}
