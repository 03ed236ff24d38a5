//! Standalone host driver.
//!
//! When no host audio graph is present, [`HostOutput`] plays the role of one:
//! a render thread calls [`crate::SpatialEffectInstance::process`] in
//! fixed-size blocks and hands the interleaved result to a `cpal` device
//! callback through a lock-free ring buffer.

mod feed;
mod output;

pub use feed::{InputFeed, SilenceFeed, ToneFeed};
pub use output::{BlockRenderer, HostOutput, fill_from_ring};
