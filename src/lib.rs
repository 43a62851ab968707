pub mod client;
pub mod config;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod server;
pub mod solver;

pub use error::{Error, Result};
