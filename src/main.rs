mod audio;
mod client;

use crate::audio::{AudioRecorder, TempWav};
use crate::client::{DEFAULT_SERVICE_URL, Language, SttClient, SttError};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mic-check")]
#[command(about = "Record from the microphone and transcribe via a local STT service")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a clip and send it for transcription
    Transcribe {
        /// Recording duration in seconds
        #[arg(long, default_value = "5")]
        duration: u64,

        /// Audio sample rate in Hz
        #[arg(long, default_value = "16000")]
        sample_rate: u32,

        /// Language hint, e.g. "hindi" (omit for automatic detection)
        #[arg(long)]
        language: Option<String>,

        /// STT service base URL
        #[arg(long, default_value = DEFAULT_SERVICE_URL)]
        service_url: String,
    },

    /// List available audio recording devices
    Devices,
}

/// Record a clip, upload it, and print the transcription
///
/// Capture and encoding faults propagate to the caller; faults at or after
/// the network call are printed and the function returns normally. The temp
/// WAV guard is dropped on every exit path, so the file never outlives this
/// call.
async fn record_and_transcribe(
    duration: u64,
    sample_rate: u32,
    language: Option<String>,
    service_url: String,
) -> Result<()> {
    match &language {
        Some(lang) => println!(
            "Recording for {} seconds for {} transcription... Speak now!",
            duration,
            lang.to_uppercase()
        ),
        None => println!(
            "Recording for {} seconds... Speak now (Hindi or English)!",
            duration
        ),
    }

    let recorder = AudioRecorder::new(sample_rate)?;
    let samples = recorder.record_buffer(Duration::from_secs(duration))?;
    println!("Recording finished!");

    let temp_wav = TempWav::write(&samples, recorder.sample_rate())?;

    let stt = SttClient::new(service_url);
    match stt.transcribe(temp_wav.path(), language.as_deref()).await {
        Ok(result) => match &result.language {
            Language::Detected(lang) => {
                println!("Transcription: {}", result.text);
                println!("Detected Language: {}", lang);
            }
            Language::Specified(lang) => {
                println!("Transcription ({}): {}", lang, result.text);
                println!("Specified Language: {}", lang);
            }
        },
        Err(SttError::Connection(url)) => {
            println!(
                "Error: Could not connect to STT service. Make sure it's running on {}",
                url
            );
        }
        Err(SttError::Service { status, body }) => {
            println!("Error: {} - {}", status, body);
        }
        Err(e) => {
            println!("Error: {}", e);
        }
    }

    Ok(())
}

fn print_banner() {
    println!("STT Mic Check - Automatic Language Detection");
    println!("============================================");
    println!("Speak in Hindi or English - the system will automatically detect and transcribe!");
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            print_banner();
            record_and_transcribe(5, 16000, None, DEFAULT_SERVICE_URL.to_string()).await?;
        }

        Some(Commands::Transcribe {
            duration,
            sample_rate,
            language,
            service_url,
        }) => {
            record_and_transcribe(duration, sample_rate, language, service_url).await?;
        }

        Some(Commands::Devices) => {
            let devices = AudioRecorder::list_devices()?;

            println!("Available Audio Devices:");
            println!(
                "{:<30} {:<10} {:<20} Formats",
                "Name", "Default", "Sample Rates"
            );
            println!("{}", "-".repeat(80));

            for device in devices {
                let default_str = if device.is_default { "YES" } else { "NO" };
                let sample_rates = device
                    .supported_sample_rates
                    .iter()
                    .take(3)
                    .map(|sr| sr.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");

                let formats = device
                    .supported_formats
                    .iter()
                    .take(2)
                    .map(|f| format!("{:?}", f))
                    .collect::<Vec<_>>()
                    .join(", ");

                println!(
                    "{:<30} {:<10} {:<20} {}",
                    &device.name[..device.name.len().min(30)],
                    default_str,
                    sample_rates,
                    formats
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_contract() {
        let cli = Cli::parse_from(["mic-check", "transcribe"]);
        match cli.command {
            Some(Commands::Transcribe {
                duration,
                sample_rate,
                language,
                service_url,
            }) => {
                assert_eq!(duration, 5);
                assert_eq!(sample_rate, 16000);
                assert_eq!(language, None);
                assert_eq!(service_url, "http://localhost:5001");
            }
            _ => panic!("expected transcribe command"),
        }
    }

    #[test]
    fn test_no_subcommand_selects_auto_mode() {
        let cli = Cli::parse_from(["mic-check"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_language_flag_parses() {
        let cli = Cli::parse_from(["mic-check", "transcribe", "--language", "hindi"]);
        match cli.command {
            Some(Commands::Transcribe { language, .. }) => {
                assert_eq!(language.as_deref(), Some("hindi"));
            }
            _ => panic!("expected transcribe command"),
        }
    }
}
