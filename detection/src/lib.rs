pub mod detector;
pub mod stats;

pub use detector::{AnomalyDetector, Assessment, Evaluation};
pub use stats::Summary;
