//! Sliding-window linear forecasting of daily close prices.

use crate::core::error::CoreError;
use crate::core::price::{HistoricalSeries, PredictedSeries};
use crate::core::regression::LinearModel;
use crate::core::scaler::MinMaxScaler;
use std::collections::VecDeque;
use tracing::debug;

/// Number of past days fed to the model for each prediction.
pub const DEFAULT_WINDOW: usize = 60;

#[derive(Debug, Clone, Copy)]
pub struct Forecaster {
    window: usize,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl Forecaster {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// Scales the series, builds one training example per observation after
    /// the first window and fits the linear model.
    pub fn fit(&self, series: &HistoricalSeries) -> Result<FittedForecaster, CoreError> {
        let insufficient = || CoreError::InsufficientData {
            observations: series.len(),
            required: self.window + 1,
        };
        if series.len() <= self.window {
            return Err(insufficient());
        }

        let closes = series.closes();
        let scaler = MinMaxScaler::fit(&closes).ok_or_else(insufficient)?;
        let scaled = scaler.transform_all(&closes);

        let (features, targets): (Vec<Vec<f64>>, Vec<f64>) = (self.window..scaled.len())
            .map(|i| (scaled[i - self.window..i].to_vec(), scaled[i]))
            .unzip();
        let model = LinearModel::fit(&features, &targets).ok_or_else(insufficient)?;
        debug!(
            examples = targets.len(),
            window = self.window,
            "Fitted forecasting model"
        );

        Ok(FittedForecaster {
            scaler,
            model,
            seed: scaled[scaled.len() - self.window..].to_vec(),
            training_examples: targets.len(),
        })
    }

    pub fn predict(
        &self,
        series: &HistoricalSeries,
        horizon: usize,
    ) -> Result<PredictedSeries, CoreError> {
        if horizon == 0 {
            return Err(CoreError::InvalidHorizon);
        }
        self.fit(series)?.predict(horizon)
    }
}

#[derive(Debug, Clone)]
pub struct FittedForecaster {
    scaler: MinMaxScaler,
    model: LinearModel,
    seed: Vec<f64>,
    training_examples: usize,
}

impl FittedForecaster {
    pub fn training_examples(&self) -> usize {
        self.training_examples
    }

    /// Rolls the model forward one day at a time, feeding each prediction
    /// back into the window. Outputs are not clamped to the observed range.
    pub fn predict(&self, horizon: usize) -> Result<PredictedSeries, CoreError> {
        if horizon == 0 {
            return Err(CoreError::InvalidHorizon);
        }

        let mut window: VecDeque<f64> = self.seed.iter().copied().collect();
        let mut prices = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let next = self.model.predict(&window);
            window.pop_front();
            window.push_back(next);
            prices.push(self.scaler.inverse_transform(next));
        }

        Ok(PredictedSeries { prices })
    }
}

/// Forecasts `horizon` days with the default window.
pub fn predict(series: &HistoricalSeries, horizon: usize) -> Result<PredictedSeries, CoreError> {
    Forecaster::default().predict(series, horizon)
}
