pub mod connection;
pub mod journal;
pub mod profiles;
pub mod repository;
pub mod schema;

pub use connection::*;
pub use journal::*;
pub use profiles::*;
pub use repository::*;
pub use schema::*;
