// Cross-cutting prompt fragments. Each service that needs model calls
// defines its own prompts.rs alongside it.

/// System instruction sent with every completion request. Pairs with the
/// `json_object` response format to keep output machine-parseable.
pub const JSON_SYSTEM: &str = "You are a helpful assistant that outputs JSON.";
