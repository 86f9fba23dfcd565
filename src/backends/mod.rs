//! Backends module - black-box line-list services
//!
//! Provides:
//! - encode: base64 encoding/decoding and file checksums
//! - pretty: JSON pretty-printing
//!
//! The pipeline treats these as line-list-to-line-list transforms invoked
//! conditionally based on active arguments.

pub mod encode;
pub mod pretty;
