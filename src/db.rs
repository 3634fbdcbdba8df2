pub mod tenancy_repo;
pub mod branch_repo;
pub mod security_repo;
pub mod session;
