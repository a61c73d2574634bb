pub mod auth;
pub mod registry;
pub mod services;
pub mod session;
pub mod subscription;
pub mod traits;
pub mod vocabulary;
