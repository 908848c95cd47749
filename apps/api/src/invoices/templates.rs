//! WhatsApp collection templates: preset texts, due-date based suggestion,
//! placeholder substitution, Rupiah formatting, and `wa.me` deep links.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::client::Client;
use crate::models::invoice::Invoice;

pub const PLACEHOLDER_NAME: &str = "[Nama]";
pub const PLACEHOLDER_AMOUNT: &str = "[Nominal]";
pub const PLACEHOLDER_DESCRIPTION: &str = "[Deskripsi]";

const WA_BASE_URL: &str = "https://wa.me";

/// Template keys, named after the reminder's offset from the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TemplateKey {
    #[serde(rename = "h-1")]
    DayBefore,
    #[serde(rename = "h+1")]
    DayAfter,
    #[serde(rename = "h+7")]
    WeekAfter,
}

impl TemplateKey {
    #[cfg(test)]
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKey::DayBefore => "h-1",
            TemplateKey::DayAfter => "h+1",
            TemplateKey::WeekAfter => "h+7",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            TemplateKey::DayBefore => "Halo Pak/Bu [Nama],\nmengingatkan invoice sebesar [Nominal] untuk pekerjaan [Deskripsi] yang jatuh tempo besok.\nMohon konfirmasinya ya. Terima kasih.",
            TemplateKey::DayAfter => "Halo Pak/Bu [Nama],\nkami follow up invoice [Nominal] yang jatuh tempo kemarin.\nMohon konfirmasi status pembayarannya ya. Terima kasih.",
            TemplateKey::WeekAfter => "Halo Pak/Bu [Nama],\nkami mengingatkan kembali terkait invoice [Nominal] untuk pekerjaan [Deskripsi] yang hingga hari ini belum kami terima.\nMohon konfirmasi atau informasikan jika ada kendala. Terima kasih.",
        }
    }
}

pub const ALL_TEMPLATES: [TemplateKey; 3] = [
    TemplateKey::DayBefore,
    TemplateKey::DayAfter,
    TemplateKey::WeekAfter,
];

#[derive(Debug, Clone, Serialize)]
pub struct PresetTemplate {
    pub key: TemplateKey,
    pub text: &'static str,
}

pub fn preset_templates() -> Vec<PresetTemplate> {
    ALL_TEMPLATES
        .iter()
        .map(|key| PresetTemplate {
            key: *key,
            text: key.text(),
        })
        .collect()
}

/// Picks the template for an invoice from its due date.
///
/// - exactly 1 day left → `h-1`
/// - 7 or more days overdue → `h+7`
/// - everything else (no due date, due today, 1-6 days overdue, more than
///   1 day left) → `h+1`
pub fn suggest_template(due_date: Option<NaiveDate>, today: NaiveDate) -> TemplateKey {
    let Some(due) = due_date else {
        return TemplateKey::DayAfter;
    };
    match (due - today).num_days() {
        1 => TemplateKey::DayBefore,
        days if days <= -7 => TemplateKey::WeekAfter,
        _ => TemplateKey::DayAfter,
    }
}

/// `Rp` + amount rounded to whole rupiah with `.` thousands separators.
pub fn format_rupiah(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = rounded.abs().to_u128().unwrap_or_default().to_string();
    format!("{sign}Rp{}", group_thousands(&digits))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

/// Fills every occurrence of `[Nama]`, `[Nominal]` and `[Deskripsi]`.
pub fn render_message(template: &str, invoice: &Invoice, client: &Client) -> String {
    template
        .replace(PLACEHOLDER_NAME, &client.client_name)
        .replace(PLACEHOLDER_AMOUNT, &format_rupiah(invoice.amount))
        .replace(PLACEHOLDER_DESCRIPTION, &invoice.description)
}

/// `https://wa.me/{phone}?text={message}`. `phone` must already be normalized.
pub fn build_wa_link(message: &str, phone: &str) -> String {
    format!(
        "{WA_BASE_URL}/{phone}?text={}",
        urlencoding::encode(message)
    )
}
