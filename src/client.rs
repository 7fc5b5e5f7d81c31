//! HTTP client for the speech-to-text service
//!
//! Uploads a recorded WAV file as a multipart form to the local STT service
//! and parses the JSON transcription response. The service exposes two
//! endpoints: `/transcribe` with automatic language detection, and
//! `/transcribe/{language}` with an explicit language hint.

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Default base URL of the STT service
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5001";

/// Transcription request error types
#[derive(Error, Debug)]
pub enum SttError {
    #[error("could not connect to STT service at {0}")]
    Connection(String),
    #[error("service returned {status}: {body}")]
    Service { status: u16, body: String },
    #[error("transcription request failed: {0}")]
    Request(String),
}

/// Language as reported by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    /// Automatically detected by the service
    Detected(String),
    /// Echoed back from the explicit language hint
    Specified(String),
}

/// A successful transcription result
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    pub language: Language,
}

#[derive(Debug, Deserialize)]
struct AutoResponse {
    text: String,
    detected_language: String,
}

#[derive(Debug, Deserialize)]
struct ExplicitResponse {
    text: String,
    specified_language: String,
}

/// Client for the STT service
pub struct SttClient {
    client: reqwest::Client,
    base_url: String,
}

impl SttClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Upload a WAV file for transcription
    ///
    /// With no language hint the service detects the language itself;
    /// with a hint the language becomes a path segment of the endpoint.
    /// Non-200 responses surface as [`SttError::Service`] with the raw body.
    pub async fn transcribe(
        &self,
        wav_path: &Path,
        language: Option<&str>,
    ) -> Result<Transcription, SttError> {
        let wav_bytes = tokio::fs::read(wav_path)
            .await
            .map_err(|e| SttError::Request(format!("failed to read {}: {}", wav_path.display(), e)))?;

        let file_part = Part::bytes(wav_bytes)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| SttError::Request(format!("mime: {}", e)))?;
        let form = Form::new().part("audio", file_part);

        let url = match language {
            Some(lang) => format!("{}/transcribe/{}", self.base_url, lang),
            None => format!("{}/transcribe", self.base_url),
        };

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    SttError::Connection(self.base_url.clone())
                } else {
                    SttError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SttError::Service {
                status: status.as_u16(),
                body,
            });
        }

        match language {
            None => {
                let parsed: AutoResponse = response
                    .json()
                    .await
                    .map_err(|e| SttError::Request(format!("invalid response body: {}", e)))?;
                Ok(Transcription {
                    text: parsed.text,
                    language: Language::Detected(parsed.detected_language),
                })
            }
            Some(_) => {
                let parsed: ExplicitResponse = response
                    .json()
                    .await
                    .map_err(|e| SttError::Request(format!("invalid response body: {}", e)))?;
                Ok(Transcription {
                    text: parsed.text,
                    language: Language::Specified(parsed.specified_language),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::TempWav;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Minimal one-shot HTTP service for exercising the client
    ///
    /// Accepts a single connection, reads the full request, and answers with
    /// the given status line and JSON body. The join handle resolves to the
    /// raw request text for assertions.
    async fn mock_service(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];

            // Read headers
            let header_end = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "client closed connection mid-request");
                request.extend_from_slice(&chunk[..n]);
                if let Some(pos) = request
                    .windows(4)
                    .position(|window| window == b"\r\n\r\n")
                {
                    break pos + 4;
                }
            };

            // Read the body per Content-Length
            let head = String::from_utf8_lossy(&request[..header_end]).to_string();
            let content_length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while request.len() < header_end + content_length {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "client closed connection mid-body");
                request.extend_from_slice(&chunk[..n]);
            }

            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();

            String::from_utf8_lossy(&request).to_string()
        });

        (base_url, handle)
    }

    fn sample_wav() -> TempWav {
        let samples: Vec<i16> = vec![0; 160];
        TempWav::write(&samples, 16000).unwrap()
    }

    #[tokio::test]
    async fn test_auto_transcription_uses_detect_endpoint() {
        let body = serde_json::json!({"text": "namaste", "detected_language": "hindi"});
        let (base_url, handle) = mock_service("200 OK", &body.to_string()).await;
        let wav = sample_wav();

        let client = SttClient::new(base_url);
        let result = client.transcribe(wav.path(), None).await.unwrap();

        assert_eq!(result.text, "namaste");
        assert_eq!(result.language, Language::Detected("hindi".to_string()));

        let request = handle.await.unwrap();
        assert!(request.starts_with("POST /transcribe HTTP/1.1"));
        assert!(request.contains("name=\"audio\""));
    }

    #[tokio::test]
    async fn test_explicit_transcription_uses_language_endpoint() {
        let body = serde_json::json!({"text": "hello", "specified_language": "hindi"});
        let (base_url, handle) = mock_service("200 OK", &body.to_string()).await;
        let wav = sample_wav();

        let client = SttClient::new(base_url);
        let result = client.transcribe(wav.path(), Some("hindi")).await.unwrap();

        assert_eq!(result.text, "hello");
        assert_eq!(result.language, Language::Specified("hindi".to_string()));

        let request = handle.await.unwrap();
        assert!(request.starts_with("POST /transcribe/hindi HTTP/1.1"));
        assert!(request.contains("name=\"audio\""));
    }

    #[tokio::test]
    async fn test_service_error_carries_status_and_body() {
        let (base_url, _handle) = mock_service("500 Internal Server Error", "internal error").await;
        let wav = sample_wav();

        let client = SttClient::new(base_url);
        let err = client.transcribe(wav.path(), None).await.unwrap_err();

        match err {
            SttError::Service { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal error");
            }
            other => panic!("expected service error, got: {}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_connection_error() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
        drop(listener);

        let wav = sample_wav();
        let wav_path = wav.path().to_path_buf();

        let client = SttClient::new(base_url.clone());
        let err = client.transcribe(wav.path(), None).await.unwrap_err();

        match err {
            SttError::Connection(url) => assert_eq!(url, base_url),
            other => panic!("expected connection error, got: {}", other),
        }

        // Cleanup still happens after a failed request
        drop(wav);
        assert!(!wav_path.exists());
    }

    #[test]
    fn test_connection_error_names_service_address() {
        let err = SttError::Connection(DEFAULT_SERVICE_URL.to_string());
        assert!(err.to_string().contains("localhost:5001"));
    }

    #[test]
    fn test_service_error_display() {
        let err = SttError::Service {
            status: 500,
            body: "internal error".to_string(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("internal error"));
    }
}
