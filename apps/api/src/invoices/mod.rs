// Invoice lifecycle, the free-plan quota gate, and WhatsApp message templates.

pub mod handlers;
pub mod lifecycle;
pub mod quota;
pub mod templates;
