pub mod models;
pub mod connection;
pub mod migrations;

pub use models::*;
pub use connection::*;
pub use migrations::*;
