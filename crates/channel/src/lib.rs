pub mod broadcast;
pub mod channel;

pub use broadcast::*;
pub use channel::*;
