//! Request/response surface of the control server

mod client;
mod commands;
mod error;

pub use client::ApiClient;
pub use commands::{NewPersona, PromptChange, RemoteCommand, ORIGIN};
pub use error::ApiError;
