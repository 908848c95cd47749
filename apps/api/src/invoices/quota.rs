//! Free/paid plan gate for sending invoices.
//!
//! [`can_send`] is the single predicate. `PgStore::send_invoice` repeats it as
//! the `WHERE` clause of its conditional update; keep the two in step.

use serde::Serialize;

use crate::models::user::{Plan, User};

pub const DEFAULT_FREE_INVOICE_LIMIT: i32 = 3;

/// True when the user may move another invoice from draft to sent.
pub fn can_send(user: &User, free_limit: i32) -> bool {
    match user.plan {
        Plan::Paid => true,
        Plan::Free => user.invoice_count < free_limit,
    }
}

/// Remaining free sends, or `None` for paid users (unlimited).
pub fn invoices_remaining(user: &User, free_limit: i32) -> Option<i32> {
    match user.plan {
        Plan::Paid => None,
        Plan::Free => Some((free_limit - user.invoice_count).max(0)),
    }
}

/// Plan summary attached to most responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanInfo {
    pub plan: Plan,
    pub invoice_count: i32,
    pub can_send_invoice: bool,
    pub invoices_remaining: Option<i32>,
}

impl PlanInfo {
    pub fn for_user(user: &User, free_limit: i32) -> Self {
        PlanInfo {
            plan: user.plan,
            invoice_count: user.invoice_count,
            can_send_invoice: can_send(user, free_limit),
            invoices_remaining: invoices_remaining(user, free_limit),
        }
    }
}
