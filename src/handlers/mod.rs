pub mod auth;
pub mod chat;
pub mod community;
pub mod documents;
pub mod files;
pub mod materials;
pub mod party_info;
pub mod search;
pub mod upload;
pub mod users;
pub mod work_logs;
