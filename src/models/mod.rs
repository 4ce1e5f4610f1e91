mod holding;
mod quote;
mod trade;
mod user;

pub use holding::*;
pub use quote::*;
pub use trade::*;
pub use user::*;
