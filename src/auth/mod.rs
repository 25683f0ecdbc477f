pub mod auth;
pub mod directory;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod sessions;
