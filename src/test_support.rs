//! Deterministic stub engine for unit tests.

use crate::api::{DistanceRolloffModel, RenderingMode, SourceId, SpatialAudioApi};
use crate::config::BridgeDesc;
use crate::error::Result;
use crate::handle::EngineFactory;
use crate::room::{ReflectionProperties, ReverbProperties};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ApiCall {
    SetInterleavedBuffer { id: SourceId, num_channels: usize, num_frames: usize },
    FillOutput { num_channels: usize, num_frames: usize },
    MasterVolume(f32),
    StereoSpeakerMode(bool),
    HeadPosition(f32, f32, f32),
    HeadRotation(f32, f32, f32, f32),
    CreateAmbisonic(usize),
    CreateSoundObject(RenderingMode),
    Destroy(SourceId),
    SourcePosition(SourceId, f32, f32, f32),
    SourceRotation(SourceId, f32, f32, f32, f32),
    SourceVolume(SourceId, f32),
    DistanceAttenuation(SourceId, f32),
    DistanceModel(SourceId, DistanceRolloffModel, f32, f32),
    RoomEffectsGain(SourceId, f32),
    Directivity(SourceId, f32, f32),
    ListenerDirectivity(SourceId, f32, f32),
    NearFieldGain(SourceId, f32),
    OcclusionIntensity(SourceId, f32),
    Spread(SourceId, f32),
    Reflection(ReflectionProperties),
    Reverb(ReverbProperties),
}

/// State shared between a [`RecordingApi`] and the test observing it.
pub(crate) struct ApiRecorder {
    pub calls: Mutex<Vec<ApiCall>>,
    pub dropped: AtomicBool,
    /// When false, every render reports no valid output
    pub render_ok: AtomicBool,
    /// When set, renders copy this interleaved buffer instead of mixing inputs
    pub scripted_output: Mutex<Option<Vec<f32>>>,
    next_id: AtomicI32,
    master_volume: Mutex<f32>,
    source_volumes: Mutex<HashMap<SourceId, f32>>,
    inputs: Mutex<HashMap<SourceId, Vec<f32>>>,
}

impl ApiRecorder {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            dropped: AtomicBool::new(false),
            render_ok: AtomicBool::new(true),
            scripted_output: Mutex::new(None),
            next_id: AtomicI32::new(0),
            master_volume: Mutex::new(1.0),
            source_volumes: Mutex::new(HashMap::new()),
            inputs: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Engine stub that records every call and mixes mono inputs to both channels.
///
/// Output sample `i` of each channel is the sum over sources of
/// `input[i] * source_volume * master_volume`.
pub(crate) struct RecordingApi {
    recorder: Arc<ApiRecorder>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::with_recorder(Arc::new(ApiRecorder::new()))
    }

    fn with_recorder(recorder: Arc<ApiRecorder>) -> Self {
        recorder.dropped.store(false, Ordering::SeqCst);
        Self { recorder }
    }

    pub fn recorder(&self) -> Arc<ApiRecorder> {
        self.recorder.clone()
    }
}

impl Drop for RecordingApi {
    fn drop(&mut self) {
        self.recorder.dropped.store(true, Ordering::SeqCst);
    }
}

/// A factory producing [`RecordingApi`]s that all report to the returned recorder.
pub(crate) fn recording_factory() -> (Arc<ApiRecorder>, Box<EngineFactory>) {
    let recorder = Arc::new(ApiRecorder::new());
    let factory_recorder = recorder.clone();
    let factory: Box<EngineFactory> =
        Box::new(move |_desc: &BridgeDesc| -> Result<Box<dyn SpatialAudioApi>> {
            Ok(Box::new(RecordingApi::with_recorder(factory_recorder.clone())))
        });
    (recorder, factory)
}

impl SpatialAudioApi for RecordingApi {
    fn fill_interleaved_output_buffer(
        &self,
        num_channels: usize,
        num_frames: usize,
        output: &mut [f32],
    ) -> bool {
        self.recorder.record(ApiCall::FillOutput {
            num_channels,
            num_frames,
        });
        if !self.recorder.render_ok.load(Ordering::SeqCst) {
            return false;
        }

        let samples = num_channels * num_frames;
        if let Some(scripted) = self.recorder.scripted_output.lock().unwrap().as_ref() {
            output[..samples].copy_from_slice(&scripted[..samples]);
            return true;
        }

        let master = *self.recorder.master_volume.lock().unwrap();
        let volumes = self.recorder.source_volumes.lock().unwrap();
        let inputs = self.recorder.inputs.lock().unwrap();
        for frame in 0..num_frames {
            let mixed: f32 = inputs
                .iter()
                .map(|(id, input)| {
                    input.get(frame).copied().unwrap_or(0.0) * volumes.get(id).copied().unwrap_or(1.0)
                })
                .sum();
            for channel in 0..num_channels {
                output[frame * num_channels + channel] = mixed * master;
            }
        }
        true
    }

    fn set_interleaved_buffer(
        &self,
        source_id: SourceId,
        input: &[f32],
        num_channels: usize,
        num_frames: usize,
    ) {
        self.recorder.record(ApiCall::SetInterleavedBuffer {
            id: source_id,
            num_channels,
            num_frames,
        });
        let mono = (0..num_frames).map(|i| input[i * num_channels]).collect();
        self.recorder.inputs.lock().unwrap().insert(source_id, mono);
    }

    fn set_master_volume(&self, volume: f32) {
        self.recorder.record(ApiCall::MasterVolume(volume));
        *self.recorder.master_volume.lock().unwrap() = volume;
    }

    fn set_stereo_speaker_mode(&self, enabled: bool) {
        self.recorder.record(ApiCall::StereoSpeakerMode(enabled));
    }

    fn set_head_position(&self, x: f32, y: f32, z: f32) {
        self.recorder.record(ApiCall::HeadPosition(x, y, z));
    }

    fn set_head_rotation(&self, x: f32, y: f32, z: f32, w: f32) {
        self.recorder.record(ApiCall::HeadRotation(x, y, z, w));
    }

    fn create_ambisonic_source(&self, num_channels: usize) -> SourceId {
        self.recorder.record(ApiCall::CreateAmbisonic(num_channels));
        SourceId(self.recorder.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn create_sound_object_source(&self, rendering_mode: RenderingMode) -> SourceId {
        self.recorder.record(ApiCall::CreateSoundObject(rendering_mode));
        SourceId(self.recorder.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn destroy_source(&self, source_id: SourceId) {
        self.recorder.record(ApiCall::Destroy(source_id));
        self.recorder.inputs.lock().unwrap().remove(&source_id);
    }

    fn set_source_position(&self, source_id: SourceId, x: f32, y: f32, z: f32) {
        self.recorder.record(ApiCall::SourcePosition(source_id, x, y, z));
    }

    fn set_source_rotation(&self, source_id: SourceId, x: f32, y: f32, z: f32, w: f32) {
        self.recorder
            .record(ApiCall::SourceRotation(source_id, x, y, z, w));
    }

    fn set_source_volume(&self, source_id: SourceId, volume: f32) {
        self.recorder.record(ApiCall::SourceVolume(source_id, volume));
        self.recorder
            .source_volumes
            .lock()
            .unwrap()
            .insert(source_id, volume);
    }

    fn set_source_distance_attenuation(&self, source_id: SourceId, distance_attenuation: f32) {
        self.recorder
            .record(ApiCall::DistanceAttenuation(source_id, distance_attenuation));
    }

    fn set_source_distance_model(
        &self,
        source_id: SourceId,
        rolloff: DistanceRolloffModel,
        min_distance: f32,
        max_distance: f32,
    ) {
        self.recorder.record(ApiCall::DistanceModel(
            source_id,
            rolloff,
            min_distance,
            max_distance,
        ));
    }

    fn set_source_room_effects_gain(&self, source_id: SourceId, room_effects_gain: f32) {
        self.recorder
            .record(ApiCall::RoomEffectsGain(source_id, room_effects_gain));
    }

    fn set_sound_object_directivity(&self, source_id: SourceId, alpha: f32, order: f32) {
        self.recorder
            .record(ApiCall::Directivity(source_id, alpha, order));
    }

    fn set_sound_object_listener_directivity(&self, source_id: SourceId, alpha: f32, order: f32) {
        self.recorder
            .record(ApiCall::ListenerDirectivity(source_id, alpha, order));
    }

    fn set_sound_object_near_field_effect_gain(&self, source_id: SourceId, gain: f32) {
        self.recorder.record(ApiCall::NearFieldGain(source_id, gain));
    }

    fn set_sound_object_occlusion_intensity(&self, source_id: SourceId, intensity: f32) {
        self.recorder
            .record(ApiCall::OcclusionIntensity(source_id, intensity));
    }

    fn set_sound_object_spread(&self, source_id: SourceId, spread_deg: f32) {
        self.recorder.record(ApiCall::Spread(source_id, spread_deg));
    }

    fn set_reflection_properties(&self, properties: &ReflectionProperties) {
        self.recorder.record(ApiCall::Reflection(*properties));
    }

    fn set_reverb_properties(&self, properties: &ReverbProperties) {
        self.recorder.record(ApiCall::Reverb(*properties));
    }
}
