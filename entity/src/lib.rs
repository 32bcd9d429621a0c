pub mod account;
pub mod permission;
pub mod role;
pub mod vacancy;
