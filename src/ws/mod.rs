pub mod client;
pub mod debounce;
pub mod handler;
pub mod hub;
pub mod session;
