//! Composable SCALE codecs with support for recursive and asynchronously produced values
//!
//! See [subscale_codec] for details.

pub use subscale_codec::*;
