pub mod time;
pub mod validation;

pub use time::*;
pub use validation::*;
