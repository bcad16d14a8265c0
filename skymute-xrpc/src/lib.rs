//! A minimal authenticated XRPC transport for atproto services.
//!
//! This crate provides the plumbing the higher-level `skymute` crates build
//! on: an object-safe [`XrpcTransport`] trait over JSON queries and
//! procedures, a reqwest-backed [`XrpcClient`] with password-session
//! authentication and automatic token refresh, typed errors carrying
//! rate-limit metadata, a cursor-pagination driver, and an `at://` URI
//! parser.
//!
//! # Key Components
//!
//! *   [`XrpcTransport`]: The trait consumed by everything that talks to a
//!     PDS. Services mock it in tests instead of standing up a server.
//! *   [`XrpcClient`]: The live implementation. Created with credentials it
//!     establishes a session lazily and refreshes it when the access token
//!     expires.
//! *   [`api`]: Typed bindings for the handful of XRPC calls the workspace
//!     consumes.
//! *   [`reduce_pages`] / [`collect_pages`]: Drive a cursor-paginated fetch
//!     to exhaustion.
/// Typed request/response bindings for the consumed XRPC methods.
pub mod api;
mod aturi;
mod client;
mod cursor;
mod error;

pub use aturi::{AtUri, AtUriError};
pub use client::{Credentials, XrpcClient, XrpcTransport};
pub use cursor::{collect_pages, reduce_pages, Page};
pub use error::{RateLimit, XrpcError};
