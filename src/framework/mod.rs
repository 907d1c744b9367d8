pub mod config;
pub use config::Config;

pub mod data;
pub use data::DataError;

pub mod logging;
pub mod poise;
pub mod secrets;
