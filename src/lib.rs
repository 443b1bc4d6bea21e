pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod session;
pub mod stores;
pub mod transport;
pub mod utils;
pub mod views;

pub use context::Desidia;
pub use error::{ApiError, DesidiaError, ErrorKind};
pub use session::{Permission, Session};
pub use transport::{ApiRequest, AuthEvent, TokenPair, Transport};
