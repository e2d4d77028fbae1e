pub mod database;
pub mod in_memory;
pub mod senders;

pub use database::*;
pub use in_memory::*;
pub use senders::*;
