pub mod common;
pub mod event;
pub mod promo_code;
pub mod reservation;

pub use common::*;
pub use event::*;
pub use promo_code::*;
pub use reservation::*;
