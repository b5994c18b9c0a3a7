//! Exam-preparation backend: question catalogue endpoints served through a
//! read-through aggregate cache with coalesced refreshes and tag-based
//! invalidation.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
