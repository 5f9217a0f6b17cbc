//! Channel management for the host/MCU serial link.
//!
//! A [`ChannelManager`] owns two workers over one transport:
//! - the receive worker pulls bytes from an [`RxSource`], parses them and
//!   pushes messages into a bounded receive queue, raising an [`EventFlag`]
//!   notification per message;
//! - the send worker drains a bounded send queue, frames each message and
//!   writes it to the transport, pacing frames to the line speed.
//!
//! Applications talk to the queues through a cloneable [`ChannelHandle`].

pub mod config;
pub mod error;
pub mod event;
pub mod manager;
pub mod queue;
pub mod source;
pub mod stats;
mod worker;

pub use config::{ChannelConfig, OverflowPolicy};
pub use error::{ChannelError, Result};
pub use event::{EventFlag, Subscription};
pub use manager::{ChannelHandle, ChannelManager, RunStatus};
pub use queue::{BoundedQueue, QueueFull};
pub use source::{DmaReader, RxSource};
pub use stats::{LinkStats, LinkStatsSnapshot};
