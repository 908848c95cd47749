pub mod client;
pub mod invoice;
pub mod session;
pub mod user;
