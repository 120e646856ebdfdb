//! Report composition and delivery

pub mod compose;
pub mod delivery;

pub use compose::*;
pub use delivery::*;
