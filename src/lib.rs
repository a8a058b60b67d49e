pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod global;
pub mod presenter;
pub mod session;
pub mod upload;

pub use app::{AppController, AppView};
pub use error::{ClientError, ClientResult};
