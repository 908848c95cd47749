//! Per-user dashboard: invoice counts, paid and pending totals, the newest
//! invoices, and the overdue ones.

pub mod handlers;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::invoices::lifecycle::{clients_by_id, InvoiceListItem};
use crate::invoices::templates::format_rupiah;
use crate::models::client::Client;
use crate::models::invoice::{Invoice, InvoiceStatus};

pub const RECENT_INVOICES: usize = 5;

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub total_clients: i64,
    pub total_invoices: i64,
    pub draft_invoices: i64,
    pub sent_invoices: i64,
    pub paid_invoices: i64,
    pub total_paid: Decimal,
    pub total_pending: Decimal,
    pub formatted_paid: String,
    pub formatted_pending: String,
    pub recent_invoices: Vec<InvoiceListItem>,
    /// Sent invoices whose due date is before today, oldest due date first.
    pub overdue_invoices: Vec<InvoiceListItem>,
}

fn count_status(invoices: &[Invoice], status: InvoiceStatus) -> i64 {
    invoices.iter().filter(|i| i.status == status).count() as i64
}

fn sum_status(invoices: &[Invoice], status: InvoiceStatus) -> Decimal {
    invoices
        .iter()
        .filter(|i| i.status == status)
        .map(|i| i.amount)
        .sum()
}

/// Both invoice lists carry their client's name and WhatsApp number.
pub fn compute_dashboard(
    clients: &[Client],
    invoices: &[Invoice],
    today: NaiveDate,
) -> DashboardSummary {
    let total_paid = sum_status(invoices, InvoiceStatus::Paid);
    let total_pending = sum_status(invoices, InvoiceStatus::Sent);

    let mut recent_invoices = invoices.to_vec();
    recent_invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_invoices.truncate(RECENT_INVOICES);

    let mut overdue_invoices: Vec<Invoice> = invoices
        .iter()
        .filter(|i| i.status == InvoiceStatus::Sent)
        .filter(|i| i.due_date.is_some_and(|due| due < today))
        .cloned()
        .collect();
    overdue_invoices.sort_by_key(|i| i.due_date);

    let by_id = clients_by_id(clients.iter().cloned());
    let join = |list: Vec<Invoice>| -> Vec<InvoiceListItem> {
        list.into_iter()
            .map(|invoice| InvoiceListItem::new(invoice, &by_id))
            .collect()
    };

    DashboardSummary {
        total_clients: clients.len() as i64,
        total_invoices: invoices.len() as i64,
        draft_invoices: count_status(invoices, InvoiceStatus::Draft),
        sent_invoices: count_status(invoices, InvoiceStatus::Sent),
        paid_invoices: count_status(invoices, InvoiceStatus::Paid),
        total_paid,
        total_pending,
        formatted_paid: format_rupiah(total_paid),
        formatted_pending: format_rupiah(total_pending),
        recent_invoices: join(recent_invoices),
        overdue_invoices: join(overdue_invoices),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn client_named(name: &str) -> Client {
        Client {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            client_name: name.to_string(),
            client_whatsapp: "628123456789".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn make_invoice(
        client: &Client,
        minute: u32,
        amount: i64,
        status: InvoiceStatus,
        due_date: Option<NaiveDate>,
    ) -> Invoice {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, minute, 0).unwrap();
        Invoice {
            id: Uuid::new_v4(),
            user_id: client.user_id,
            client_id: client.id,
            amount: Decimal::from(amount),
            description: "Jasa fotografi".to_string(),
            due_date,
            status,
            sent_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_empty_dashboard() {
        let summary = compute_dashboard(&[], &[], today());
        assert_eq!(summary.total_invoices, 0);
        assert_eq!(summary.total_paid, Decimal::ZERO);
        assert_eq!(summary.formatted_pending, "Rp0");
        assert!(summary.recent_invoices.is_empty());
        assert!(summary.overdue_invoices.is_empty());
    }

    #[test]
    fn test_counts_and_totals_by_status() {
        let clients = vec![client_named("Budi"), client_named("Sari")];
        let invoices = vec![
            make_invoice(&clients[0], 0, 1_000_000, InvoiceStatus::Draft, None),
            make_invoice(&clients[0], 1, 2_000_000, InvoiceStatus::Sent, None),
            make_invoice(&clients[1], 2, 3_000_000, InvoiceStatus::Sent, None),
            make_invoice(&clients[1], 3, 4_500_000, InvoiceStatus::Paid, None),
        ];
        let summary = compute_dashboard(&clients, &invoices, today());
        assert_eq!(summary.total_clients, 2);
        assert_eq!(summary.total_invoices, 4);
        assert_eq!(summary.draft_invoices, 1);
        assert_eq!(summary.sent_invoices, 2);
        assert_eq!(summary.paid_invoices, 1);
        assert_eq!(summary.total_pending, Decimal::from(5_000_000));
        assert_eq!(summary.total_paid, Decimal::from(4_500_000));
        assert_eq!(summary.formatted_paid, "Rp4.500.000");
    }

    #[test]
    fn test_recent_keeps_five_newest() {
        let client = client_named("Budi");
        let invoices: Vec<Invoice> = (0..7)
            .map(|m| make_invoice(&client, m, 10_000, InvoiceStatus::Draft, None))
            .collect();
        let summary = compute_dashboard(&[client], &invoices, today());
        assert_eq!(summary.recent_invoices.len(), RECENT_INVOICES);
        assert_eq!(summary.recent_invoices[0].invoice.id, invoices[6].id);
        assert_eq!(summary.recent_invoices[4].invoice.id, invoices[2].id);
        assert_eq!(summary.recent_invoices[0].client_name.as_deref(), Some("Budi"));
    }

    #[test]
    fn test_overdue_is_sent_and_strictly_past_due() {
        let budi = client_named("Budi");
        let sari = client_named("Sari");
        let d = |offset: i64| Some(today() + Duration::days(offset));
        let invoices = vec![
            make_invoice(&budi, 0, 10_000, InvoiceStatus::Sent, d(-1)),
            make_invoice(&sari, 1, 10_000, InvoiceStatus::Sent, d(-9)),
            make_invoice(&budi, 2, 10_000, InvoiceStatus::Sent, d(0)),
            make_invoice(&budi, 3, 10_000, InvoiceStatus::Paid, d(-5)),
            make_invoice(&budi, 4, 10_000, InvoiceStatus::Draft, d(-5)),
            make_invoice(&budi, 5, 10_000, InvoiceStatus::Sent, None),
        ];
        let summary = compute_dashboard(&[budi, sari], &invoices, today());
        let ids: Vec<Uuid> = summary
            .overdue_invoices
            .iter()
            .map(|item| item.invoice.id)
            .collect();
        assert_eq!(ids, vec![invoices[1].id, invoices[0].id]);

        let overdue = &summary.overdue_invoices[0];
        assert_eq!(overdue.client_name.as_deref(), Some("Sari"));
        assert_eq!(overdue.client_whatsapp.as_deref(), Some("628123456789"));
    }
}
