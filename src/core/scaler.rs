/// Linear rescaling into [0, 1] using the min and max of a reference series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    min: f64,
    range: f64,
}

impl MinMaxScaler {
    /// Fits the scaler on `values`. Returns `None` for an empty slice.
    ///
    /// A flat series has zero range; it is treated as a range of 1 so every
    /// value maps to 0 and maps back to the input constant.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let (min, max) = values
            .iter()
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((*v, *v)),
                Some((lo, hi)) => Some((lo.min(*v), hi.max(*v))),
            })?;
        let range = if max - min == 0.0 { 1.0 } else { max - min };
        Some(Self { min, range })
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range
    }

    pub fn inverse_transform(&self, scaled: f64) -> f64 {
        scaled * self.range + self.min
    }

    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.transform(*v)).collect()
    }
}
