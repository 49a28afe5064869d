// Persisted kits: the gateway the wizard saves through, the library and
// moderation endpoints, and the PDF export.

pub mod export;
pub mod gateway;
pub mod handlers;
