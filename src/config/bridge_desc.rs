/// Number of output channels the bridge renders. Only stereo is supported.
pub const NUM_OUTPUT_CHANNELS: usize = 2;

/// Configuration descriptor for a bridge instance
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeDesc {
    /// Sample rate the spatialization engine renders at
    pub sample_rate: u32,
    /// Number of output channels (must be 2)
    pub channels: u16,
    /// Frames per engine render call. Scratch buffers are sized from this once.
    pub frames_per_buffer: usize,
    /// Optional path to a custom HRTF SOFA file (None uses Steam Audio's default HRTF)
    pub hrtf_path: Option<String>,
}

impl Default for BridgeDesc {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: NUM_OUTPUT_CHANNELS as u16,
            frames_per_buffer: 512,
            hrtf_path: None,
        }
    }
}

impl BridgeDesc {
    /// Panics if the descriptor violates the engine construction contract.
    pub fn assert_valid(&self) {
        assert!(self.sample_rate > 0, "sample rate must be positive");
        assert_eq!(
            self.channels as usize, NUM_OUTPUT_CHANNELS,
            "only stereo output is supported"
        );
        assert!(
            self.frames_per_buffer > 0,
            "frames per buffer must be positive"
        );
    }
}
