pub mod auth;
pub mod health;
pub mod pages;
pub mod platform;
pub mod session;
pub mod subscription;
