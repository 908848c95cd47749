// Accounts, bearer sessions, the admin gate, and the ownership guard.

pub mod accounts;
pub mod extractors;
pub mod handlers;
pub mod ownership;
pub mod password;
