use serde::{Deserialize, Serialize};

/// Population statistics of a purchase window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation (divides by `count`).
    pub sd: f64,
}

impl Summary {
    /// `None` for an empty window.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            count: values.len(),
            mean,
            sd: variance.sqrt(),
        })
    }

    /// `mean + sigmas * sd`, at full precision.
    pub fn threshold(&self, sigmas: f64) -> f64 {
        self.mean + sigmas * self.sd
    }
}
