// Library root
// -----------
// Unofficial LibreLinkUp follower client. The binary (`main.rs`) wires the
// CLI config to these modules.
//
// Module responsibilities:
// - `api`: HTTP transport seam (`Transport`) and its reqwest implementation.
// - `headers`: request headers, including the hashed `account-id`.
// - `resolver`: default/region hosts and the starting version header.
// - `session`: login negotiation (region redirect, minimum version bump).
// - `connections`: connection discovery and patient selection.
// - `reading`: graph fetch and latest-reading extraction.
// - `client`: ties the above together over one transport.
// - `config` / `ui`: CLI arguments, prompts and output.
pub mod api;
pub mod client;
pub mod config;
pub mod connections;
pub mod error;
pub mod headers;
pub mod reading;
pub mod resolver;
pub mod session;
pub mod ui;

pub use client::LibreLinkUpClient;
pub use error::{ErrorKind, LluError, LluResult};
pub use reading::{Reading, Trend, TrendTable};
pub use session::{Credentials, SessionContext};
