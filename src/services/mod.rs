pub mod auth;
pub mod chat;
pub mod community;
pub mod document;
pub mod file;
pub mod material;
pub mod party_info;
pub mod publication;
pub mod search;
pub mod user;
pub mod work_log;
