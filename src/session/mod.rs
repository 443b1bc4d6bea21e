//! Authenticated identity and role-based permissions.

mod controller;
mod permission;

pub use controller::{ProfileUpdate, Session};
pub use permission::{Permission, permissions_for};
