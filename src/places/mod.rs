pub mod client;
pub mod error;
pub mod resolver;
pub mod structs;
