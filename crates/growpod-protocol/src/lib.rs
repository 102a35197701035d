//! # growpod-protocol
//!
//! The camera's HTTP surface, independent of any server framework.
//!
//! - [`routes`]: the fixed route table and content types
//! - [`codec`]: query-string parsing and MJPEG multipart framing
//! - [`messages`]: `/status` document and `/control` / `/stream` requests
//! - [`pages`]: the static HTML pages

pub mod codec;
pub mod messages;
pub mod pages;
pub mod routes;

pub use codec::*;
pub use messages::*;
pub use routes::Route;
