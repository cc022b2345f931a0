//! Connection management for the CCLink protocol.
//!
//! This is the "just works" layer. One [`CCLink`] handle owns one logical
//! connection: it dials the endpoint, keeps the session alive with
//! heartbeats, reconnects after transport errors with bounded retries, runs
//! every inbound message through an ordered middleware chain, fans messages
//! out to route-key subscribers, and correlates request/response pairs with
//! per-call timeouts.

pub mod client;
pub mod config;
pub mod error;
pub mod middleware;

mod worker;

pub use client::{CCLink, CCLinkBuilder, ClientEvent, SendStatus};
pub use config::{ClientConfig, DEFAULT_ENDPOINT};
pub use error::{ClientError, Result};
pub use middleware::{DispatchError, Middleware, MiddlewareFuture, Next};
pub use worker::HEARTBEAT_ROUTE;
