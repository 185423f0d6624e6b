//! expense-bot logs expenses to a Google Sheet through an Apps Script web app and analyzes them
//! with a local model served by Ollama.

pub mod analysis;
pub mod api;
pub mod args;
pub mod bot;
pub mod commands;
mod config;
mod error;
pub mod model;
mod utils;


pub use api::Mode;
pub use bot::Bot;
pub use config::Config;
pub use error::{Error, ErrorType, Result};
