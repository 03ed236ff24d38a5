mod bridge_desc;

pub use bridge_desc::{BridgeDesc, NUM_OUTPUT_CHANNELS};
