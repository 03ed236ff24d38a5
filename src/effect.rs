//! Host-facing effect: configuration resource plus per-activation instance.
//!
//! The host owns a [`SpatialEffect`] and edits its `x`, `y`, `z` properties
//! from its control thread. Activating the effect calls
//! [`SpatialEffect::instantiate`], which brings up an engine and one binaural
//! source. The host then calls [`SpatialEffectInstance::process`] once per
//! audio callback; dropping the instance shuts the engine down.

use crate::api::{RenderingMode, SourceId};
use crate::backend::SteamAudioApi;
use crate::config::BridgeDesc;
use crate::error::{PetalSonicError, Result};
use crate::gateway::SpatialGateway;
use crate::handle::{EngineFactory, EngineSlot};
use crate::math::{Pose, Vec3};
use crate::pipeline::{AudioFrame, RenderPipeline};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Source position shared between the control and audio threads.
///
/// Each coordinate is stored as the bit pattern of an `f32`, so reads and
/// writes are lock-free. The three axes are independent: a reader may observe
/// a mix of old and new coordinates while a writer is mid-update.
#[derive(Debug, Default)]
pub struct SpatialCoordinates {
    x: AtomicU32,
    y: AtomicU32,
    z: AtomicU32,
}

impl SpatialCoordinates {
    pub fn get(&self, axis: Axis) -> f32 {
        f32::from_bits(self.atomic(axis).load(Ordering::Relaxed))
    }

    pub fn set(&self, axis: Axis, value: f32) {
        self.atomic(axis).store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.get(Axis::X), self.get(Axis::Y), self.get(Axis::Z))
    }

    fn atomic(&self, axis: Axis) -> &AtomicU32 {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Editor metadata for one float property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub suffix: &'static str,
}

/// Range hint shown for the coordinate properties. Values outside it are stored as given.
pub const COORDINATE_RANGE: (f32, f32) = (-100.0, 100.0);

const PROPERTIES: [(Axis, &str); 3] = [(Axis::X, "x"), (Axis::Y, "y"), (Axis::Z, "z")];

/// Configurable effect resource. Cheap to share; instances read its coordinates live.
pub struct SpatialEffect {
    desc: BridgeDesc,
    coordinates: Arc<SpatialCoordinates>,
    factory: Arc<EngineFactory>,
}

impl SpatialEffect {
    /// Creates an effect rendering through Steam Audio.
    pub fn new(desc: BridgeDesc) -> Self {
        Self::with_engine_factory(desc, Arc::new(|desc: &BridgeDesc| SteamAudioApi::boxed(desc)))
    }

    /// Creates an effect rendering through a custom engine.
    pub fn with_engine_factory(desc: BridgeDesc, factory: Arc<EngineFactory>) -> Self {
        Self {
            desc,
            coordinates: Arc::new(SpatialCoordinates::default()),
            factory,
        }
    }

    pub fn desc(&self) -> &BridgeDesc {
        &self.desc
    }

    pub fn x(&self) -> f32 {
        self.coordinates.get(Axis::X)
    }

    pub fn y(&self) -> f32 {
        self.coordinates.get(Axis::Y)
    }

    pub fn z(&self) -> f32 {
        self.coordinates.get(Axis::Z)
    }

    pub fn set_x(&self, x: f32) {
        self.coordinates.set(Axis::X, x);
    }

    pub fn set_y(&self, y: f32) {
        self.coordinates.set(Axis::Y, y);
    }

    pub fn set_z(&self, z: f32) {
        self.coordinates.set(Axis::Z, z);
    }

    pub fn set_position(&self, position: Vec3) {
        self.set_x(position.x);
        self.set_y(position.y);
        self.set_z(position.z);
    }

    pub fn position(&self) -> Vec3 {
        self.coordinates.position()
    }

    /// Properties exposed to the host's configuration surface.
    pub fn property_list() -> Vec<PropertyInfo> {
        PROPERTIES
            .iter()
            .map(|&(_, name)| PropertyInfo {
                name,
                min: COORDINATE_RANGE.0,
                max: COORDINATE_RANGE.1,
                suffix: "m",
            })
            .collect()
    }

    /// Sets a property by name.
    ///
    /// # Errors
    ///
    /// Returns [`PetalSonicError::Configuration`] for names not in [`Self::property_list`].
    pub fn set_property(&self, name: &str, value: f32) -> Result<()> {
        let axis = Self::axis_for(name)?;
        self.coordinates.set(axis, value);
        Ok(())
    }

    /// Reads a property by name, verbatim as last set.
    pub fn get_property(&self, name: &str) -> Result<f32> {
        Ok(self.coordinates.get(Self::axis_for(name)?))
    }

    fn axis_for(name: &str) -> Result<Axis> {
        PROPERTIES
            .iter()
            .find(|&&(_, property)| property == name)
            .map(|&(axis, _)| axis)
            .ok_or_else(|| PetalSonicError::Configuration(format!("Unknown property: {}", name)))
    }

    /// Activates the effect.
    pub fn instantiate(&self) -> SpatialEffectInstance {
        SpatialEffectInstance::new(self.desc.clone(), self.coordinates.clone(), &*self.factory)
    }
}

impl Default for SpatialEffect {
    fn default() -> Self {
        Self::new(BridgeDesc::default())
    }
}

/// One active effect: an engine, one binaural source and the render pipeline.
pub struct SpatialEffectInstance {
    slot: Arc<EngineSlot>,
    gateway: SpatialGateway,
    pipeline: RenderPipeline,
    coordinates: Arc<SpatialCoordinates>,
    source_id: SourceId,
}

impl SpatialEffectInstance {
    /// Brings up the engine with unity listener gain, the listener at the
    /// origin, and a single high-quality binaural source.
    ///
    /// If the engine cannot be built the failure is logged and the instance
    /// renders silence.
    pub fn new(
        desc: BridgeDesc,
        coordinates: Arc<SpatialCoordinates>,
        factory: &EngineFactory,
    ) -> Self {
        let slot = Arc::new(EngineSlot::new());
        if let Err(e) = slot.initialize(&desc, factory) {
            log::error!("Failed to initialize spatial engine, output will be silent: {}", e);
        }

        let gateway = SpatialGateway::new(slot.clone());
        gateway.set_listener_gain(1.0);
        gateway.set_listener_transform(Pose::identity());
        let source_id = gateway.create_sound_object(RenderingMode::BinauralHighQuality);

        Self {
            pipeline: RenderPipeline::new(slot.clone(), desc.frames_per_buffer),
            slot,
            gateway,
            coordinates,
            source_id,
        }
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    /// Parameter access for the control thread.
    pub fn gateway(&self) -> SpatialGateway {
        self.gateway.clone()
    }

    /// Audio callback entry point.
    ///
    /// Refreshes the source transform from the current coordinates, then
    /// feeds the left channel of `input` and writes the binaural mix to `output`.
    pub fn process(&mut self, input: &[AudioFrame], output: &mut [AudioFrame]) {
        self.gateway
            .set_source_transform(self.source_id, Pose::from_position(self.coordinates.position()));
        self.pipeline.process(self.source_id, input, output);
    }
}

impl Drop for SpatialEffectInstance {
    fn drop(&mut self) {
        self.slot.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DistanceRolloffModel;
    use crate::math::Quat;
    use crate::test_support::{ApiCall, ApiRecorder, init_logger, recording_factory};
    use std::sync::atomic::Ordering as AtomicOrdering;

    fn stub_effect() -> (SpatialEffect, Arc<ApiRecorder>) {
        init_logger();
        let (recorder, factory) = recording_factory();
        let effect = SpatialEffect::with_engine_factory(BridgeDesc::default(), Arc::from(factory));
        (effect, recorder)
    }

    #[test]
    fn properties_round_trip_verbatim() {
        let (effect, _) = stub_effect();

        effect.set_property("x", 12.5).unwrap();
        effect.set_property("y", -250.0).unwrap();
        effect.set_z(3.0);

        assert_eq!(effect.get_property("x").unwrap(), 12.5);
        // Outside the range hint, still stored as given
        assert_eq!(effect.y(), -250.0);
        assert_eq!(effect.get_property("z").unwrap(), 3.0);
        assert_eq!(effect.position(), Vec3::new(12.5, -250.0, 3.0));
    }

    #[test]
    fn unknown_property_is_a_configuration_error() {
        let (effect, _) = stub_effect();
        assert!(matches!(
            effect.set_property("w", 1.0),
            Err(PetalSonicError::Configuration(_))
        ));
        assert!(effect.get_property("rotation").is_err());
    }

    #[test]
    fn property_list_declares_metre_range() {
        let properties = SpatialEffect::property_list();
        let names: Vec<_> = properties.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
        assert!(properties
            .iter()
            .all(|p| p.min == -100.0 && p.max == 100.0 && p.suffix == "m"));
    }

    #[test]
    fn instantiation_sets_up_listener_and_one_source() {
        let (effect, recorder) = stub_effect();
        let instance = effect.instantiate();
        let id = instance.source_id();
        let identity = Quat::IDENTITY;

        assert!(id.is_valid());
        assert_eq!(
            recorder.calls(),
            vec![
                ApiCall::MasterVolume(1.0),
                ApiCall::HeadPosition(0.0, 0.0, 0.0),
                ApiCall::HeadRotation(identity.x, identity.y, identity.z, identity.w),
                ApiCall::CreateSoundObject(RenderingMode::BinauralHighQuality),
                ApiCall::DistanceModel(id, DistanceRolloffModel::None, 0.0, 0.0),
            ]
        );
    }

    #[test]
    fn process_refreshes_transform_every_callback() {
        let (effect, recorder) = stub_effect();
        let mut instance = effect.instantiate();
        let id = instance.source_id();
        recorder.clear_calls();

        let input = vec![AudioFrame::SILENCE; 512];
        let mut output = vec![AudioFrame::SILENCE; 512];
        effect.set_position(Vec3::new(1.0, 2.0, 3.0));
        instance.process(&input, &mut output);
        instance.process(&input, &mut output);

        let positions: Vec<_> = recorder
            .calls()
            .into_iter()
            .filter(|call| matches!(call, ApiCall::SourcePosition(..)))
            .collect();
        assert_eq!(
            positions,
            vec![
                ApiCall::SourcePosition(id, 1.0, 2.0, 3.0),
                ApiCall::SourcePosition(id, 1.0, 2.0, 3.0),
            ]
        );
    }

    #[test]
    fn silence_in_silence_out_then_muted_listener() {
        let (effect, _) = stub_effect();
        let mut instance = effect.instantiate();
        let mut output = vec![AudioFrame::new(1.0, 1.0); 512];

        instance.process(&vec![AudioFrame::SILENCE; 512], &mut output);
        assert!(output.iter().all(|&f| f == AudioFrame::SILENCE));

        // With unity gain the stub passes the signal through
        let loud = vec![AudioFrame::new(0.5, 0.5); 512];
        instance.process(&loud, &mut output);
        assert!(output.iter().all(|f| f.left == 0.5 && f.right == 0.5));

        instance.gateway().set_listener_gain(0.0);
        instance.process(&loud, &mut output);
        assert!(output.iter().all(|&f| f == AudioFrame::SILENCE));
    }

    #[test]
    fn failed_engine_renders_silence() {
        let factory: Arc<EngineFactory> = Arc::new(
            |_: &BridgeDesc| -> Result<Box<dyn crate::api::SpatialAudioApi>> {
                Err(PetalSonicError::SpatialAudio("unavailable".into()))
            },
        );
        let effect = SpatialEffect::with_engine_factory(BridgeDesc::default(), factory);
        let mut instance = effect.instantiate();

        assert_eq!(instance.source_id(), SourceId::INVALID);
        let mut output = vec![AudioFrame::new(1.0, -1.0); 64];
        instance.process(&vec![AudioFrame::new(0.3, 0.3); 64], &mut output);
        assert!(output.iter().all(|&f| f == AudioFrame::SILENCE));
    }

    #[test]
    fn dropping_instance_shuts_engine_down() {
        let (effect, recorder) = stub_effect();
        let instance = effect.instantiate();
        let gateway = instance.gateway();
        assert!(!recorder.dropped.load(AtomicOrdering::SeqCst));

        drop(instance);

        assert!(recorder.dropped.load(AtomicOrdering::SeqCst));
        assert!(!gateway.slot().is_initialized());
    }
}
