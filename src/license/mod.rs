//! SPDX license expressions and license metadata.
//!
//! - [`expression`]: parses SPDX expressions and flattens them into plain
//!   license identifiers.
//! - [`metadata`]: resolves identifiers to display name and reference URL
//!   from the SPDX license dataset, memoizing each lookup.

pub mod expression;
pub mod metadata;
