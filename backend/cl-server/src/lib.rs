pub mod demo;
pub mod error;
pub mod logger;
pub mod routes;
pub mod socket;


pub use crate::routes::{AppState, build_router};
