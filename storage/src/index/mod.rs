pub mod graph;
pub mod neighborhood;

pub use graph::SocialGraph;
pub use neighborhood::{expand, within_distance};
