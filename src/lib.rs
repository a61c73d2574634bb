//! Suggestion moderation and vocabulary sync gateway for the English/Mon
//! translation chat - library exports for testing

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod infrastructure;

pub use error::{Error, Result};
