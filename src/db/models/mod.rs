//! Store models split into domain-specific modules.

pub mod booking;
pub mod listing;
pub mod user;

pub use booking::*;
pub use listing::*;
pub use user::*;
