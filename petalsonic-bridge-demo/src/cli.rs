use anyhow::{Context, Result, bail};
use petalsonic_bridge::room::{WallMaterial, compute_reverb_properties};
use petalsonic_bridge::{
    BridgeDesc, HostOutput, Quat, RoomProperties, SpatialEffect, ToneFeed, Vec3,
};
use std::time::{Duration, Instant};

const ORBIT_RADIUS: f32 = 2.0;
const ORBIT_PERIOD_SECS: f32 = 4.0;
const UPDATE_INTERVAL: Duration = Duration::from_millis(20);

pub struct Options {
    pub seconds: f32,
    pub frequency: f32,
    pub room: bool,
    pub hrtf_path: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            seconds: 10.0,
            frequency: 440.0,
            room: false,
            hrtf_path: None,
        }
    }
}

impl Options {
    pub fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--seconds" => options.seconds = next_number(&mut args, &arg)?,
                "--frequency" => options.frequency = next_number(&mut args, &arg)?,
                "--hrtf" => options.hrtf_path = Some(next_value(&mut args, &arg)?),
                "--room" => options.room = true,
                other => bail!(
                    "Unknown argument {} (expected --seconds N, --frequency HZ, --hrtf PATH, --room)",
                    other
                ),
            }
        }
        Ok(options)
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("{} expects a value", flag))
}

/// Parses a finite, non-negative number.
fn next_number(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<f32> {
    let value: f32 = next_value(args, flag)?
        .parse()
        .with_context(|| format!("{} expects a number", flag))?;
    if !value.is_finite() || value < 0.0 {
        bail!("{} expects a finite, non-negative number, got {}", flag, value);
    }
    Ok(value)
}

fn demo_room() -> RoomProperties {
    RoomProperties {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        dimensions: Vec3::new(8.0, 3.0, 6.0),
        materials: [
            WallMaterial::PLASTER_SMOOTH,
            WallMaterial::PLASTER_SMOOTH,
            WallMaterial::PARQUET_ON_CONCRETE,
            WallMaterial::ACOUSTIC_CEILING_TILES,
            WallMaterial::GLASS_THICK,
            WallMaterial::CURTAIN_HEAVY,
        ],
        ..Default::default()
    }
}

/// Orbits a tone around the listener, moving the source from the control thread.
pub fn run_orbit(options: &Options) -> Result<()> {
    let duration = Duration::try_from_secs_f32(options.seconds)
        .with_context(|| format!("--seconds {} is out of range", options.seconds))?;
    let desc = BridgeDesc {
        sample_rate: 48000,
        frames_per_buffer: 512,
        hrtf_path: options.hrtf_path.clone(),
        ..Default::default()
    };

    let effect = SpatialEffect::new(desc.clone());
    effect.set_position(Vec3::new(0.0, 0.0, -ORBIT_RADIUS));
    let instance = effect.instantiate();
    let gateway = instance.gateway();
    if !gateway.slot().is_initialized() {
        bail!("Spatial engine failed to initialize");
    }

    if options.room {
        let room = demo_room();
        log::info!(
            "Room enabled: {:?} m, mean RT60 {:.2} s",
            room.dimensions,
            compute_reverb_properties(&room).mean_rt60(0..9)
        );
        gateway.set_room_properties(Some(&room), None);
    }

    let mut output = HostOutput::new(desc.clone());
    output.start(instance, ToneFeed::new(options.frequency, 0.3, desc.sample_rate))?;
    log::info!(
        "Orbiting a {} Hz tone at {} m for {} s",
        options.frequency,
        ORBIT_RADIUS,
        options.seconds
    );

    let started = Instant::now();
    while started.elapsed() < duration {
        let angle = started.elapsed().as_secs_f32() / ORBIT_PERIOD_SECS * std::f32::consts::TAU;
        effect.set_position(Vec3::new(
            ORBIT_RADIUS * angle.sin(),
            0.0,
            -ORBIT_RADIUS * angle.cos(),
        ));
        std::thread::sleep(UPDATE_INTERVAL);
    }

    output.stop()?;
    log::info!(
        "Rendered {} frames with {} underruns",
        output.frames_rendered(),
        output.underruns()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options> {
        Options::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_flags() {
        let options = parse(&["--seconds", "2.5", "--room", "--hrtf", "a.sofa"]).unwrap();
        assert_eq!(options.seconds, 2.5);
        assert!(options.room);
        assert_eq!(options.hrtf_path.as_deref(), Some("a.sofa"));
        assert_eq!(options.frequency, 440.0);
    }

    #[test]
    fn rejects_unknown_and_incomplete_flags() {
        assert!(parse(&["--loud"]).is_err());
        assert!(parse(&["--seconds"]).is_err());
        assert!(parse(&["--frequency", "high"]).is_err());
    }

    #[test]
    fn rejects_non_finite_and_negative_numbers() {
        for value in ["inf", "-inf", "NaN", "-1"] {
            assert!(parse(&["--seconds", value]).is_err(), "{}", value);
            assert!(parse(&["--frequency", value]).is_err(), "{}", value);
        }
        assert_eq!(parse(&["--seconds", "0"]).unwrap().seconds, 0.0);
    }
}
