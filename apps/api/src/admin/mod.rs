// Admin-only plan management: plan changes, counter resets, user listing.

pub mod handlers;
pub mod plans;
