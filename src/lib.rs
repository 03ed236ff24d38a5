//! # PetalSonic Bridge
//!
//! A real-time safe bridge between a host audio graph and a binaural
//! spatialization engine backed by Steam Audio.
//!
//! The host owns a [`SpatialEffect`] and edits its source coordinates from a
//! control thread. Each activation produces a [`SpatialEffectInstance`] whose
//! [`process`](SpatialEffectInstance::process) is called once per audio
//! callback: the left input channel is fed to the engine as a mono source,
//! and the rendered binaural mix is written back as stereo frames.
//!
//! ## Quick Start
//!
//! ```no_run
//! use petalsonic_bridge::*;
//!
//! let effect = SpatialEffect::new(BridgeDesc::default());
//! let mut instance = effect.instantiate();
//!
//! // Control thread
//! effect.set_position(Vec3::new(2.0, 0.0, -1.0));
//! instance.gateway().set_listener_gain(0.8);
//!
//! // Audio thread
//! let input = vec![AudioFrame::new(0.1, 0.1); 512];
//! let mut output = vec![AudioFrame::SILENCE; 512];
//! instance.process(&input, &mut output);
//! ```
//!
//! ## Architecture
//!
//! - [`api`]: the engine call contract, [`SpatialAudioApi`]
//! - [`handle`]: [`EngineSlot`], shared ownership of one engine instance
//! - [`gateway`]: [`SpatialGateway`], listener, source and room parameter updates
//! - [`pipeline`]: [`RenderPipeline`], the feed, render and emit protocol
//! - [`effect`]: the host-facing effect resource and instance
//! - [`room`]: shoebox room acoustics
//! - [`backend`]: [`SteamAudioApi`], the Steam Audio engine
//! - [`host`]: [`HostOutput`], a standalone `cpal` driver

pub mod api;
pub mod backend;
pub mod config;
pub mod effect;
pub mod error;
pub mod gateway;
pub mod handle;
pub mod host;
pub mod math;
pub mod pipeline;
pub mod room;

#[cfg(test)]
mod test_support;

pub use api::{DistanceRolloffModel, RenderingMode, SourceId, SpatialAudioApi};
pub use backend::SteamAudioApi;
pub use config::BridgeDesc;
pub use effect::{Axis, PropertyInfo, SpatialCoordinates, SpatialEffect, SpatialEffectInstance};
pub use error::{PetalSonicError, Result};
pub use gateway::SpatialGateway;
pub use handle::{EngineFactory, EngineHandle, EngineSlot};
pub use host::{HostOutput, InputFeed, SilenceFeed, ToneFeed};
pub use math::{Pose, Quat, Vec3};
pub use pipeline::{AudioFrame, RenderPipeline};
pub use room::{ReflectionProperties, ReverbProperties, RoomProperties, WallMaterial};
