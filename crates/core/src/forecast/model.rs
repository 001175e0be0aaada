//! Next-day demand regressor.
//!
//! A linear autoregressive model: one weight per lag plus a bias, fitted by
//! full-batch gradient descent on mean squared error. Every call to [`train`]
//! is a fresh fit; nothing is cached between requests.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::sales::WindowSample;
use crate::errors::DomainError;

/// Scales `final_loss` into the confidence score.
pub const CONFIDENCE_SENSITIVITY: f64 = 20.0;

/// Ranges narrower than this are treated as flat and use a unit scale.
const MIN_SCALE: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    /// Base step size; the effective step is divided by `window_size + 1`.
    pub learning_rate: f64,
    pub l2_penalty: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self { epochs: 1500, learning_rate: 1.0, l2_penalty: 1e-4 }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.epochs == 0 {
            return Err(DomainError::invalid("training_epochs", "must be greater than zero"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(DomainError::invalid("learning_rate", "must be a positive finite number"));
        }
        if !self.l2_penalty.is_finite() || self.l2_penalty < 0.0 {
            return Err(DomainError::invalid("l2_penalty", "must be a non-negative finite number"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    weights: Vec<f64>,
    bias: f64,
    offset: f64,
    scale: f64,
    final_loss: f64,
    epochs: usize,
    training_samples: usize,
}

impl TrainedModel {
    pub fn window_size(&self) -> usize {
        self.weights.len()
    }

    /// Lag weights in normalized space, oldest lag first.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Mean squared error over the training samples after the last epoch, in normalized space.
    pub fn final_loss(&self) -> f64 {
        self.final_loss
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    pub fn training_samples(&self) -> usize {
        self.training_samples
    }

    fn normalize(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }

    fn denormalize(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    fn evaluate<'a>(&self, window: impl Iterator<Item = &'a f64>) -> f64 {
        self.weights.iter().zip(window).map(|(weight, x)| weight * x).sum::<f64>() + self.bias
    }
}

pub fn train(samples: &[WindowSample], config: &TrainingConfig) -> Result<TrainedModel, DomainError> {
    config.validate()?;

    let Some(first) = samples.first() else {
        return Err(DomainError::InsufficientData { required: 1, available: 0 });
    };
    let window_size = first.features.len();
    if window_size == 0 {
        return Err(DomainError::invalid("window_size", "must be greater than zero"));
    }
    if samples.iter().any(|sample| sample.features.len() != window_size) {
        return Err(DomainError::invalid("samples", "all samples must share one window size"));
    }

    let (min, max) = samples
        .iter()
        .flat_map(|sample| sample.features.iter().chain(std::iter::once(&sample.label)))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), value| (lo.min(*value), hi.max(*value)));
    let range = max - min;
    let scale = if range.is_finite() && range > MIN_SCALE { range } else { 1.0 };
    let offset = if min.is_finite() { min } else { 0.0 };

    let inputs: Vec<Vec<f64>> = samples
        .iter()
        .map(|sample| sample.features.iter().map(|value| (value - offset) / scale).collect())
        .collect();
    let targets: Vec<f64> = samples.iter().map(|sample| (sample.label - offset) / scale).collect();

    let n = samples.len() as f64;
    let step = config.learning_rate / (window_size as f64 + 1.0);
    let mut weights = vec![1.0 / window_size as f64; window_size];
    let mut bias = 0.0;

    for _ in 0..config.epochs {
        let mut weight_gradients = vec![0.0; window_size];
        let mut bias_gradient = 0.0;

        for (features, target) in inputs.iter().zip(&targets) {
            let prediction: f64 =
                weights.iter().zip(features).map(|(weight, x)| weight * x).sum::<f64>() + bias;
            let error = prediction - target;
            for (gradient, x) in weight_gradients.iter_mut().zip(features) {
                *gradient += error * x;
            }
            bias_gradient += error;
        }

        for (weight, gradient) in weights.iter_mut().zip(&weight_gradients) {
            *weight -= step * (gradient / n + config.l2_penalty * *weight);
        }
        bias -= step * bias_gradient / n;
    }

    let final_loss = inputs
        .iter()
        .zip(&targets)
        .map(|(features, target)| {
            let prediction: f64 =
                weights.iter().zip(features).map(|(weight, x)| weight * x).sum::<f64>() + bias;
            (prediction - target).powi(2)
        })
        .sum::<f64>()
        / n;

    if !final_loss.is_finite() || !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
        return Err(DomainError::Computation(format!(
            "training did not converge to finite parameters (loss = {final_loss})"
        )));
    }

    debug!(
        event_name = "forecast.train.completed",
        window_size,
        training_samples = samples.len(),
        epochs = config.epochs,
        final_loss,
        "regressor fitted"
    );

    Ok(TrainedModel {
        weights,
        bias,
        offset,
        scale,
        final_loss,
        epochs: config.epochs,
        training_samples: samples.len(),
    })
}

/// Rolls the model forward `horizon` days from `last_window`.
///
/// Each prediction is clamped at zero and then pushed into the input buffer,
/// displacing the oldest value, so later steps build on earlier predictions.
pub fn predict(
    model: &TrainedModel,
    last_window: &[f64],
    horizon: usize,
) -> Result<Vec<f64>, DomainError> {
    if last_window.len() != model.window_size() {
        return Err(DomainError::invalid(
            "last_window",
            format!("expected {} values, got {}", model.window_size(), last_window.len()),
        ));
    }

    let mut buffer: VecDeque<f64> = last_window.iter().map(|value| model.normalize(*value)).collect();
    let mut predictions = Vec::with_capacity(horizon);

    for day in 0..horizon {
        let value = model.denormalize(model.evaluate(buffer.iter()));
        if !value.is_finite() {
            return Err(DomainError::Computation(format!(
                "prediction for horizon day {} is not finite",
                day + 1
            )));
        }
        let value = value.max(0.0);
        predictions.push(value);

        buffer.pop_front();
        buffer.push_back(model.normalize(value));
    }

    Ok(predictions)
}

/// Maps training loss to a `[0, 1]` score; lower loss gives higher confidence.
pub fn confidence_from_loss(loss: f64) -> f64 {
    if !loss.is_finite() {
        return 0.0;
    }
    (1.0 / (1.0 + CONFIDENCE_SENSITIVITY * loss.max(0.0))).clamp(0.0, 1.0)
}
