//! # LinkProxy ZMTP
//!
//! **Internal protocol implementation crate for LinkProxy.**
//!
//! ⚠️ **This is an internal implementation detail. Use the `linkproxy` crate for the public API.**
//!
//! This crate provides the low-level ZMTP 3.1 protocol implementation with direct stream I/O.
//! For application development, use `linkproxy::zmq::*` which provides a higher-level, more
//! ergonomic API with proper error handling and convenience methods.
//!
//! ## Socket Types (Internal API)
//!
//! - **DEALER**: Asynchronous request-reply with load balancing
//! - **ROUTER**: Server-side routing with identity-based addressing  
//! - **REQ**: Synchronous request-reply client (strict alternation)
//! - **REP**: Synchronous reply server (stateful envelope tracking)
//! - **PUB**: Publisher for broadcasting events
//! - **SUB**: Subscriber with topic-based filtering
//!
//! ## For Application Development
//!
//! ```toml
//! [dependencies]
//! linkproxy = { version = "0.1", features = ["zmq"] }
//! ```
//!
//! ```rust,ignore
//! use linkproxy::zmq::DealerSocket;
//!
//! #[compio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut socket = DealerSocket::connect("127.0.0.1:5555").await?;
//!     socket.send(vec![b"Hello!".into()]).await?;
//!     let response = socket.recv().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Zero-copy**: Messages use `Bytes` for efficient sharing
//! - **`io_uring`**: High-performance async I/O via `compio`
//! - **Sans-IO protocol**: Testable, runtime-agnostic design
//! - **Type-safe**: No unsafe code in protocol layer
//! - **Interoperable**: Compatible with libzmq

// Allow some pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::needless_pass_by_ref_mut)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::unused_async)]
#![allow(clippy::let_underscore_future)]
#![allow(clippy::future_not_send)] // Runtime-agnostic design
#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::missing_errors_doc)] // Will add gradually
#![allow(clippy::doc_markdown)] // Too many false positives
#![allow(clippy::while_let_loop)] // Sometimes clearer as explicit loop
#![allow(clippy::option_if_let_else)] // Sometimes clearer as if/else
#![allow(clippy::never_loop)] // State machines use loop with early returns

// Internal modules (not part of public API)
mod base;
mod codec;
mod config;
mod greeting;
mod handshake;
mod integrated_actor;
mod multipart;
mod socket_trait;
mod utils;

// Public protocol types
pub mod session;

// Socket implementations
pub mod dealer;
pub mod inproc_stream;
pub mod pair;
pub mod publisher;
pub mod pull;
pub mod push;
pub mod rep;
pub mod req;
pub mod router;
pub mod subscriber;
pub mod xpub;
pub mod xsub;

// The generalized, steerable message proxy
pub mod proxy;

// Re-export socket types for clean API
pub use config::BufferConfig;
pub use dealer::DealerSocket;
pub use socket_trait::Socket;
pub use pair::PairSocket;
pub use publisher::PubSocket;
pub use pull::PullSocket;
pub use push::PushSocket;
pub use rep::RepSocket;
pub use req::ReqSocket;
pub use router::RouterSocket;
pub use subscriber::SubSocket;
pub use xpub::XPubSocket;
pub use xsub::XSubSocket;

// Re-export commonly used types
pub use session::{SocketType, ZmtpSession};

/// Prelude module for convenient imports
///
/// ```rust
/// use linkproxy_zmtp::prelude::*;
/// ```
pub mod prelude {
    pub use super::session::SocketType;
    pub use super::{
        DealerSocket, PairSocket, PubSocket, PullSocket, PushSocket, RepSocket, ReqSocket,
        RouterSocket, SubSocket, XPubSocket, XSubSocket,
    };
    pub use bytes::Bytes;
}
