//! Small helpers shared by the Stencil crates.

pub mod backoff;
pub mod path_processing;
pub mod redaction;

pub use backoff::{MAX_BACKOFF, backoff_delays};
pub use path_processing::expand_tilde;
pub use redaction::{is_sensitive_header, redact_header_value};
