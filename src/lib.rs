//! HTTP load balancer.
//!
//! Accepts inbound requests, picks a healthy backend according to the
//! configured selection strategy, and proxies the request transparently,
//! tagging each response with the backend that served it.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌────────────────────────────────────────────────┐
//!                 │                 LOAD BALANCER                  │
//!   Client        │  ┌────────┐   ┌────────────┐   ┌────────────┐  │
//!   request ──────┼─▶│  http  │──▶│  balance   │──▶│  http      │──┼──▶ Backend
//!                 │  │ server │   │ (registry  │   │  forward   │  │    server
//!   response ◀────┼──│        │◀──│ + strategy)│◀──│            │◀─┼────
//!                 │  └────────┘   └────────────┘   └────────────┘  │
//!                 │                                                │
//!                 │  ┌──────────────────────────────────────────┐  │
//!                 │  │            Cross-Cutting Concerns        │  │
//!                 │  │  config · health checks · admin status   │  │
//!                 │  │  observability · lifecycle               │  │
//!                 │  └──────────────────────────────────────────┘  │
//!                 └────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod balance;
pub mod config;
pub mod http;

// Traffic management
pub mod health;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use balance::{Registry, Strategy};
pub use config::Config;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
