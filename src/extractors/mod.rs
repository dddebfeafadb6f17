pub mod claims;
pub mod current_user;
