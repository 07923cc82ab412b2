pub mod broadcaster;
pub mod comment_log;
pub mod connctx;
pub mod object_store;
pub mod presence;
pub mod registry;
pub mod room;
