//! Common type aliases, re-exported so call sites don't have to remember which channel flavor
//! lives under which module path.

#![allow(unused)]

// Error handling
pub use anyhow::{anyhow, bail, ensure, Context};

// Tokio MPSC/oneshot/watch channels, aliased so "async" vs "std" is visible at the use site.
pub use tokio::sync::mpsc::{
    channel as async_bounded_channel, unbounded_channel as async_unbounded_channel, Receiver as AsyncBoundedReceiver,
    Sender as AsyncBoundedSender, UnboundedReceiver as AsyncUnboundedReceiver, UnboundedSender as AsyncUnboundedSender,
};
pub use tokio::sync::oneshot::{
    channel as async_oneshot_channel, Receiver as AsyncOneshotReceiver, Sender as AsyncOneshotSender,
};
pub use tokio::sync::watch::{
    channel as async_watch_channel, Receiver as AsyncWatchReceiver, Sender as AsyncWatchSender,
};

// Common synchronization/cell types.
pub use std::sync::atomic::{Ordering as AtomicOrdering, *};
pub use std::sync::{Arc, Weak};

pub use tokio_util::sync::CancellationToken;

/// Result type used throughout this crate's public API.
pub type Result<T> = anyhow::Result<T>;
