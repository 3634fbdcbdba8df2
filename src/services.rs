pub mod auth;
pub mod authorization;
pub mod security_sentinel;
pub mod subscription_gate;
pub mod tenant_resolver;
