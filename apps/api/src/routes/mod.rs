pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::admin::handlers as admin;
use crate::auth::handlers as auth;
use crate::clients::handlers as clients;
use crate::dashboard::handlers as dashboard;
use crate::invoices::handlers as invoices;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route("/api/v1/auth/register", post(auth::handle_register))
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        .route("/api/v1/me", get(auth::handle_me))
        .route(
            "/api/v1/profile",
            patch(auth::handle_update_profile).delete(auth::handle_delete_account),
        )
        .route("/api/v1/upgrade", get(auth::handle_upgrade_info))
        .route("/api/v1/dashboard", get(dashboard::handle_dashboard))
        // Client directory
        .route(
            "/api/v1/clients",
            get(clients::handle_list_clients).post(clients::handle_create_client),
        )
        .route(
            "/api/v1/clients/:id",
            get(clients::handle_get_client)
                .put(clients::handle_update_client)
                .delete(clients::handle_delete_client),
        )
        // Invoices
        .route(
            "/api/v1/invoices",
            get(invoices::handle_list_invoices).post(invoices::handle_create_invoice),
        )
        .route(
            "/api/v1/invoices/:id",
            get(invoices::handle_get_invoice)
                .put(invoices::handle_update_invoice)
                .delete(invoices::handle_delete_invoice),
        )
        .route("/api/v1/invoices/:id/send", post(invoices::handle_send_invoice))
        .route("/api/v1/invoices/:id/mark-paid", post(invoices::handle_mark_paid))
        .route("/api/v1/invoices/:id/wa-link", post(invoices::handle_wa_link))
        // Admin
        .route("/api/v1/admin", get(admin::handle_overview))
        .route("/api/v1/admin/users", get(admin::handle_list_users))
        .route("/api/v1/admin/users/:id/plan", put(admin::handle_set_plan))
        .route("/api/v1/admin/users/:id/upgrade", post(admin::handle_upgrade))
        .route("/api/v1/admin/users/:id/downgrade", post(admin::handle_downgrade))
        .route("/api/v1/admin/users/:id/reset-count", post(admin::handle_reset_count))
        .with_state(state)
}
