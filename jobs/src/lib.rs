pub mod queue;
pub mod worker;

pub use queue::{ChannelEventQueue, EventQueue, Job};
pub use worker::Worker;
