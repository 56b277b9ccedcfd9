//! PresenceBridge Core Library
//!
//! Host-side core for pulling rich-presence data out of companion native
//! modules over a fixed C ABI, and re-exposing it to native UI frontends.
//!
//! # Architecture
//!
//! This library is designed to be consumed via FFI by native UI frontends:
//! - **macOS**: SwiftUI app using static lib via Swift ↔ Rust FFI
//! - **Windows**: WPF app using DLL via C# ↔ Rust P/Invoke
//!
//! A companion module is an ordinary dynamic library that may export
//! `GetCurrentPresenceInfo`. The export receives an opaque configuration
//! handle, allocates a fixed-layout presence block (numeric identifier plus
//! four owned UTF-16 string buffers) from the C runtime allocator, and hands
//! it back through an out-pointer with a result code. The host takes sole
//! ownership of the block and frees it exactly once, sub-fields first.
//!
//! Absence is a first-class outcome throughout: a missing module, a missing
//! export, a non-success result code or a null block all surface as
//! "presence unavailable", never as an error.
//!
//! # Core Modules
//!
//! ## Transfer Protocol
//! - `block` - The fixed-layout presence record and its owning handle
//! - `resolver` - Soft-fail export lookup on loaded companion modules
//! - `config` - Host configuration and its one-call boundary representation
//! - `context` - The query state machine with cached accessors and disposal
//! - `producer` - Allocation helpers for companions written in Rust
//!
//! ## Glue
//! - `json` - Lenient typed getters over `serde_json` values
//! - `folders` - Special-folder resolution for product directories
//! - `icons` - Local cache for presence artwork URLs
//! - `snapshot` - Timestamped JSON manifests of query results
//! - `ffi` - C ABI surface for the native frontends

pub mod block;
pub mod config;
pub mod context;
pub mod ffi;
pub mod folders;
pub mod icons;
pub mod json;
pub mod producer;
pub mod resolver;
pub mod snapshot;

pub use block::{BlockHandle, RawPresenceBlock};
pub use config::{BoundaryConfig, BoundaryError, PresenceConfig, RawQueryConfig};
pub use context::PresenceContext;
pub use resolver::{
    ModuleHandle, PresenceQueryFn, PresenceSource, PRESENCE_OK, PRESENCE_QUERY_EXPORT,
};
pub use snapshot::PresenceSnapshot;
