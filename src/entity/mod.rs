pub mod answer_likes;
pub mod answers;
pub mod categories;
pub mod document_attachments;
pub mod document_editors;
pub mod documents;
pub mod files;
pub mod materials;
pub mod party_infos;
pub mod replies;
pub mod topics;
pub mod users;
pub mod work_log_editors;
pub mod work_logs;
