pub mod history;
pub mod index;
pub mod network;

pub use history::{PurchaseHistory, PurchaseRecord};
pub use index::SocialGraph;
pub use network::SocialNetwork;
