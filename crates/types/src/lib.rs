pub mod geo;
pub mod messages;
pub mod order;

pub use geo::*;
pub use messages::*;
pub use order::*;
