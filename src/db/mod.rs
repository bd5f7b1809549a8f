mod repository;
mod schema;
pub mod seed;

pub use repository::Repository;
