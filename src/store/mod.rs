pub mod message_thread;
pub mod terms_store;
