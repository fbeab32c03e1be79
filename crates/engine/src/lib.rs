pub mod decision;
pub mod engine;
pub mod error;

pub use decision::*;
pub use engine::*;
pub use error::*;
