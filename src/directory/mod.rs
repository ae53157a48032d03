//! # User Directory Integration
//!
//! REST proxy to the external identity/document-store service:
//! - `client`: HTTP client for create/list/delete/reset-password operations
//! - `types`: wire types for the directory contract

pub mod client;
pub mod types;

pub use client::DirectoryClient;
pub use types::{ChildProfile, CreatedUser, ParentProfile};
