pub mod auth;
pub mod backend;
pub mod database;
pub mod entities;
pub mod repositories;
pub mod traits;
