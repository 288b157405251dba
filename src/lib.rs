//! Client-side controller for BGP peering sessions driven through a backend
//! control plane: session lifecycle requests, the received route feed and
//! locally originated announcements, exchanged as `{type, data}` JSON
//! envelopes over one channel.

pub mod announce;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod message;
pub mod rib;
pub mod session;
pub mod transport;
pub mod utils;

#[cfg(feature = "cli")]
pub mod cli;

pub use client::{Client, Notice};
pub use error::{Error, Result};
