pub mod rbac;
pub mod role;
