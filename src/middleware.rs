pub mod auth;
pub mod authorization;
pub mod csrf;
pub mod security;
pub mod subscription;
pub mod tenancy;
