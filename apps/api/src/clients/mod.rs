pub mod directory;
pub mod handlers;
pub mod phone;
