//! Application services layer.

pub mod admin;
pub mod aggregate;
pub mod error;
pub mod queries;
pub mod questions;
pub mod repos;
