//! Data-access layer for an on-chain social network.
//!
//! The crate fronts a fixed social-graph contract with a typed client:
//! reads go through a coalescing, invalidation-aware cache keyed by
//! `(operation, args, chain id)`; writes wait for on-chain confirmation
//! and then stale exactly the reads they affect. Post payloads live
//! off-chain behind a pinning service, resolved and classified by the
//! media pipeline.
//!
//! `SocialClient` is the main entry point; the modules underneath are
//! usable on their own (the pagination engine and media classifier are
//! pure and sync-friendly).

pub mod abi;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod media;
pub mod pinning;
pub mod transport;
pub mod types;
pub mod wallet;

pub use client::{PostMedia, SocialClient};
pub use config::{CliArgs, Config};
pub use error::{ClientError, ContractError};
pub use feed::{FeedSource, FeedState};
pub use types::{Address, InteractionKind, Post, PostId, Profile, TxReceipt};
