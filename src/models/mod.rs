pub mod chat;
pub mod stream;
