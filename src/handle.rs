//! Shared, reference-counted ownership of the spatialization engine.
//!
//! [`EngineSlot`] holds at most one [`EngineHandle`]. Every consumer takes a
//! strong reference with [`EngineSlot::load`] before touching the engine, so a
//! concurrent [`EngineSlot::shutdown`] on the control thread never frees an
//! engine the audio thread is still using: the last `Arc` holder tears it down.
//! Loading is lock-free and never blocks the audio thread.

use crate::api::SpatialAudioApi;
use crate::config::BridgeDesc;
use crate::error::Result;
use crate::room::{ReflectionProperties, ReverbProperties};
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Builds an engine for a validated descriptor.
pub type EngineFactory = dyn Fn(&BridgeDesc) -> Result<Box<dyn SpatialAudioApi>> + Send + Sync;

/// An engine instance plus the presets that disable room effects.
pub struct EngineHandle {
    api: Box<dyn SpatialAudioApi>,
    null_reflection: ReflectionProperties,
    null_reverb: ReverbProperties,
}

impl EngineHandle {
    pub fn new(api: Box<dyn SpatialAudioApi>) -> Self {
        Self {
            api,
            null_reflection: ReflectionProperties::disabled(),
            null_reverb: ReverbProperties::disabled(),
        }
    }

    pub fn api(&self) -> &dyn SpatialAudioApi {
        self.api.as_ref()
    }

    pub fn null_reflection(&self) -> &ReflectionProperties {
        &self.null_reflection
    }

    pub fn null_reverb(&self) -> &ReverbProperties {
        &self.null_reverb
    }
}

/// Installation point for one engine handle.
#[derive(Default)]
pub struct EngineSlot {
    current: ArcSwapOption<EngineHandle>,
}

impl EngineSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs an engine and installs it, replacing any previous handle.
    ///
    /// # Panics
    ///
    /// Panics if `desc` has a zero sample rate, a channel count other than 2,
    /// or zero frames per buffer.
    ///
    /// # Errors
    ///
    /// Returns the factory's error. The slot is left empty in that case, so
    /// every consumer degrades to silence.
    pub fn initialize(&self, desc: &BridgeDesc, factory: &EngineFactory) -> Result<()> {
        desc.assert_valid();

        match factory(desc) {
            Ok(api) => {
                self.install(EngineHandle::new(api));
                log::info!(
                    "Spatial engine initialized (sample_rate: {} Hz, channels: {}, frames_per_buffer: {})",
                    desc.sample_rate,
                    desc.channels,
                    desc.frames_per_buffer
                );
                Ok(())
            }
            Err(e) => {
                self.current.store(None);
                Err(e)
            }
        }
    }

    /// Installs an already constructed handle, replacing any previous one.
    pub fn install(&self, handle: EngineHandle) {
        self.current.store(Some(Arc::new(handle)));
    }

    /// Releases the installed handle. No-op when the slot is empty.
    pub fn shutdown(&self) {
        if self.current.swap(None).is_some() {
            log::info!("Spatial engine shut down");
        }
    }

    /// Takes a strong reference to the installed handle, if any.
    pub fn load(&self) -> Option<Arc<EngineHandle>> {
        self.current.load_full()
    }

    pub fn is_initialized(&self) -> bool {
        self.current.load().is_some()
    }
}
