pub mod chat_screen;
pub mod intake_service;
pub mod terms_gate;
