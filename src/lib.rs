#![doc = "The `taskhub` library crate."]
#![doc = ""]
#![doc = "Domain models, storage, session authentication, task ownership rules,"]
#![doc = "HTTP routing and the retention sweeper for the taskhub service."]
#![doc = "The binary (`main.rs`) wires these together and runs the server."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod sweeper;
pub mod tasks;

pub use crate::error::AppError;
pub use crate::state::AppState;
