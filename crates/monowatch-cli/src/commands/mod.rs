//! CLI command implementations.

pub mod feed;
pub mod layout_template;
pub mod scan;
pub mod watch;
