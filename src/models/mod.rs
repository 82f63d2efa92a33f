//! Domain models shared by the monitor and discovery engines

mod alert;
mod transfer;
mod wallet;

pub use alert::*;
pub use transfer::*;
pub use wallet::*;
