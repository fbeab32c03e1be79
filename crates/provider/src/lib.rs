pub mod estimator;
pub mod eta;
pub mod matrix;

pub use estimator::*;
pub use eta::*;
pub use matrix::*;
