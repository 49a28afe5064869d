// The generation wizard: a four-stage pipeline (job input → competency
// review → question review → kit preview) owning all in-progress editable
// data. The machine is pure; the service sequences model calls and the
// final save around it.

pub mod handlers;
pub mod machine;
pub mod service;
