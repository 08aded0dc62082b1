//! API server and routes

pub mod middleware;
pub mod routes;
mod server;
pub mod types;

pub use server::ApiServer;
pub use types::ApiError;
