// HTTP server module

pub mod error;
pub mod routes;

pub use routes::router;
