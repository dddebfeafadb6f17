pub mod config;
pub mod constants;
pub mod enums;
pub mod error;
pub mod lifecycle;
pub mod log;
pub mod party_rules;
