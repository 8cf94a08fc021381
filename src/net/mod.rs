pub mod api;
pub mod command;
pub mod http;
pub mod protocol;
pub mod session;
