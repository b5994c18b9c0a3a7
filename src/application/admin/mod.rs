//! Application services for the administrative surface.

pub mod cache;
pub mod questions;

pub use cache::{AdminCacheError, AdminCacheService};
pub use questions::{
    AdminQuestionError, AdminQuestionService, CreateQuestionCommand, CreatedQuestion,
};
