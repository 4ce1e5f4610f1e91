mod auth;
mod trading;

pub use auth::*;
pub use trading::*;
