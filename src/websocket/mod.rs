pub mod handler;
pub mod msg_edit_handler;
pub mod msg_select_handler;
pub mod msg_comment_handler;
pub mod msg_ping_handler;
