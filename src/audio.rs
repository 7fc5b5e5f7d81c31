//! Audio capture and WAV encoding
//!
//! Records from the default input device using CPAL (Cross-Platform Audio
//! Library) and writes mono 16-bit PCM WAV files with hound.

use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use hound::{WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Audio recording device with configuration
pub struct AudioRecorder {
    device: Device,
    config: StreamConfig,
    sample_rate: u32,
}

/// Information about an available audio input device
#[derive(Debug)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub supported_sample_rates: Vec<u32>,
    pub supported_formats: Vec<SampleFormat>,
}

impl AudioRecorder {
    /// Create a new audio recorder on the default input device
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No default input device found"))?;

        let config = Self::get_optimal_config(&device, sample_rate)?;

        Ok(Self {
            device,
            config,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Find the best audio configuration for the target sample rate
    fn get_optimal_config(device: &Device, target_sample_rate: u32) -> Result<StreamConfig> {
        let supported_configs = device.supported_input_configs()?;

        // Find config closest to target sample rate
        let mut best_config = None;
        let mut best_diff = u32::MAX;

        for config in supported_configs {
            let diff = (config.max_sample_rate().0 as u32).abs_diff(target_sample_rate);
            if diff < best_diff {
                best_diff = diff;
                best_config = Some(config);
            }
        }

        let config = best_config.ok_or_else(|| anyhow!("No suitable audio configuration found"))?;

        let mut config: StreamConfig = config
            .with_sample_rate(cpal::SampleRate(target_sample_rate))
            .into();
        // The service expects mono input
        config.channels = 1;
        Ok(config)
    }

    /// List all available audio input devices
    pub fn list_devices() -> Result<Vec<AudioDeviceInfo>> {
        let host = cpal::default_host();
        let devices = host.input_devices()?;
        let default_device = host.default_input_device();

        let mut device_infos = Vec::new();

        for device in devices {
            let name = device.name().unwrap_or("Unknown Device".to_string());
            let is_default = default_device
                .as_ref()
                .map(|d| d.name().unwrap_or_default() == name)
                .unwrap_or(false);

            let supported_sample_rates = device
                .supported_input_configs()?
                .map(|c| c.max_sample_rate().0 as u32)
                .collect();

            let supported_formats = device
                .supported_input_configs()?
                .map(|c| c.sample_format())
                .collect();

            device_infos.push(AudioDeviceInfo {
                name,
                is_default,
                supported_sample_rates,
                supported_formats,
            });
        }

        Ok(device_infos)
    }

    /// Record a fixed-duration buffer from the input device (blocking)
    ///
    /// Blocks the calling thread until exactly `duration * sample_rate`
    /// samples have been captured, then returns them as signed 16-bit PCM.
    pub fn record_buffer(&self, duration: Duration) -> Result<Vec<i16>> {
        let target_samples = (duration.as_secs_f64() * self.sample_rate as f64) as usize;

        let buffer = Arc::new(Mutex::new(Vec::with_capacity(target_samples)));
        let buffer_clone = buffer.clone();

        let failed = Arc::new(AtomicBool::new(false));
        let failed_clone = failed.clone();

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buffer) = buffer_clone.lock() {
                    for &sample in data {
                        if buffer.len() >= target_samples {
                            break;
                        }
                        buffer.push((sample * i16::MAX as f32) as i16);
                    }
                }
            },
            move |err| {
                eprintln!("Audio device disconnected or stream error: {}", err);
                failed_clone.store(true, Ordering::Release);
            },
            None,
        )?;

        stream.play()?;

        // Wait until the callback has filled the buffer
        loop {
            if failed.load(Ordering::Acquire) {
                return Err(anyhow!("Audio stream failed during recording"));
            }

            let captured = buffer
                .lock()
                .map_err(|_| anyhow!("Audio buffer lock poisoned"))?
                .len();
            if captured >= target_samples {
                break;
            }

            std::thread::sleep(Duration::from_millis(50));
        }

        drop(stream);

        let samples = Arc::try_unwrap(buffer)
            .map_err(|_| anyhow!("Audio buffer still in use after recording"))?
            .into_inner()
            .map_err(|_| anyhow!("Audio buffer lock poisoned"))?;

        Ok(samples)
    }
}

/// Write an audio buffer to a WAV file
///
/// The output is always mono, 16-bit PCM at the given sample rate, with one
/// frame per buffer sample. The file is finalized before returning so a
/// reader can open it immediately.
pub fn buffer_to_wav<P: AsRef<Path>>(
    buffer: &[i16],
    output_path: P,
    sample_rate: u32,
) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(output_path, spec)?;
    for &sample in buffer {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Temporary WAV file that is deleted when dropped
///
/// Encodes a recorded buffer to a uniquely named file under the system temp
/// directory. The guard owns the file for the duration of one transcription
/// request; dropping it removes the file on every exit path.
pub struct TempWav {
    path: PathBuf,
}

impl TempWav {
    /// Encode the buffer to a fresh temp file and return the owning guard
    pub fn write(buffer: &[i16], sample_rate: u32) -> Result<Self> {
        let path = std::env::temp_dir().join(format!("mic-check-{}.wav", Uuid::new_v4()));
        buffer_to_wav(buffer, &path, sample_rate)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempWav {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            eprintln!("Failed to remove temp file {}: {}", self.path.display(), e);
        }
    }
}
