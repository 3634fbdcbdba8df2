pub mod auth;
pub mod branch;
pub mod rbac;
pub mod security;
pub mod session;
pub mod subscription;
pub mod tenancy;
