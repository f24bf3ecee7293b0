use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config_manager::speech::{render_prompt, SpeechConfig};
use crate::retry::{retry_with_backoff, RetryError, RetryPolicy, Sleeper, TokioSleeper};
use super::interface::{SpeechError, SpeechRequest, SpeechResponse, SpeechSynthesizer};

/// Longest slice of an error body kept in `ServiceFailure`.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: VoiceSelection<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoice<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

/// HTTP client for a Gemini-style `generateContent` speech endpoint
pub struct GeminiSpeechClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
    voice: String,
    prompt_template: String,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl GeminiSpeechClient {
    pub fn new(config: &SpeechConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        info!(
            "Initialized speech client: model={}, voice={}, max_attempts={}",
            config.model,
            config.voice,
            config.retry.attempts()
        );

        Ok(Self {
            http,
            endpoint,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            voice: config.voice.clone(),
            prompt_template: config.prompt_template.clone(),
            retry: config.retry,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Swap the backoff timer, mainly so tests don't wait in real time.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// One round trip, no retries.
    async fn request_once(&self, request: &SpeechRequest) -> Result<SpeechResponse, SpeechError> {
        let prompt = render_prompt(&self.prompt_template, &request.text);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![TextPart { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["AUDIO"],
                speech_config: VoiceSelection {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoice {
                            voice_name: &request.voice_id,
                        },
                    },
                },
            },
            model: &self.model,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SpeechError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::ServiceFailure {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::NetworkFailure(e.to_string()))?;

        parse_generate_content(&bytes)
    }
}

/// Pull the first inline audio part out of a `generateContent` response body.
fn parse_generate_content(body: &[u8]) -> Result<SpeechResponse, SpeechError> {
    let parsed: GenerateContentResponse = serde_json::from_slice(body)
        .map_err(|e| SpeechError::MalformedAudioResponse(format!("invalid JSON: {}", e)))?;

    let inline = parsed
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .find_map(|part| part.inline_data)
        .ok_or_else(|| SpeechError::MalformedAudioResponse("no inline audio data".to_string()))?;

    let audio_bytes = base64::engine::general_purpose::STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| SpeechError::MalformedAudioResponse(format!("invalid base64 audio: {}", e)))?;

    if audio_bytes.is_empty() {
        return Err(SpeechError::MalformedAudioResponse(
            "inline audio data is empty".to_string(),
        ));
    }

    SpeechResponse::from_inline(audio_bytes, &inline.mime_type)
}

#[async_trait]
impl SpeechSynthesizer for GeminiSpeechClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse, SpeechError> {
        debug!("Requesting speech: text={:?}, voice={}", request.text, request.voice_id);

        let response = retry_with_backoff(
            &self.retry,
            self.sleeper.as_ref(),
            SpeechError::is_transient,
            |attempt| {
                debug!("Speech request attempt {}", attempt);
                self.request_once(request)
            },
        )
        .await
        .map_err(|err| match err {
            RetryError::Exhausted { attempts, last } => SpeechError::RetriesExhausted {
                attempts,
                last_error: last.to_string(),
            },
            RetryError::Fatal(err) => err,
        })?;

        debug!(
            "Speech received: {} bytes, {}",
            response.audio_bytes.len(),
            response.mime_type
        );
        Ok(response)
    }

    fn default_voice(&self) -> &str {
        &self.voice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::testing::RecordingSleeper;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "tts-test";

    fn config_for(server: &MockServer, max_attempts: u32) -> SpeechConfig {
        SpeechConfig {
            base_url: server.uri(),
            model: MODEL.to_string(),
            api_key: "test-key".to_string(),
            retry: RetryPolicy::new(max_attempts, Duration::from_millis(1000)),
            ..Default::default()
        }
    }

    fn client_for(config: &SpeechConfig, sleeper: Arc<RecordingSleeper>) -> GeminiSpeechClient {
        GeminiSpeechClient::new(config).unwrap().with_sleeper(sleeper)
    }

    fn audio_body(pcm: &[u8], mime: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": {
                            "mimeType": mime,
                            "data": base64::engine::general_purpose::STANDARD.encode(pcm)
                        }
                    }]
                }
            }]
        })
    }

    fn request() -> SpeechRequest {
        SpeechRequest::new("అ", "Kore").unwrap()
    }

    fn endpoint() -> String {
        format!("/models/{}:generateContent", MODEL)
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.unwrap().len()
    }

    #[tokio::test]
    async fn sends_audio_request_and_parses_inline_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(endpoint()))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [{"text": "Say clearly: అ"}]}],
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {"voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Kore"}}}
                }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(audio_body(&[1, 0, 255, 255], "audio/L16;codec=pcm;rate=24000")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_for(&config_for(&server, 5), sleeper.clone());
        let response = client.synthesize(&request()).await.unwrap();

        assert_eq!(response.audio_bytes, vec![1, 0, 255, 255]);
        assert_eq!(response.sample_rate, 24000);
        assert_eq!(response.pcm_samples().unwrap(), vec![1, -1]);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(endpoint()))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(endpoint()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(audio_body(&[0, 0], "audio/L16;rate=16000")),
            )
            .with_priority(2)
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_for(&config_for(&server, 5), sleeper.clone());
        let response = client.synthesize(&request()).await.unwrap();

        assert_eq!(response.sample_rate, 16000);
        assert_eq!(request_count(&server).await, 3);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[tokio::test]
    async fn always_failing_service_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_for(&config_for(&server, 5), sleeper.clone());
        let err = client.synthesize(&request()).await.unwrap_err();

        match err {
            SpeechError::RetriesExhausted { attempts, last_error } => {
                assert_eq!(attempts, 5);
                assert!(last_error.contains("500"));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(request_count(&server).await, 5);
        assert_eq!(sleeper.delays().len(), 4);
    }

    #[tokio::test]
    async fn missing_inline_data_is_malformed_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "I cannot say that"}]}}]
            })))
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_for(&config_for(&server, 5), sleeper.clone());
        let err = client.synthesize(&request()).await.unwrap_err();

        assert!(matches!(err, SpeechError::MalformedAudioResponse(_)));
        assert_eq!(request_count(&server).await, 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn unexpected_mime_type_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(audio_body(&[0, 0], "audio/mpeg")))
            .mount(&server)
            .await;

        let client = client_for(&config_for(&server, 3), Arc::new(RecordingSleeper::default()));
        let err = client.synthesize(&request()).await.unwrap_err();

        assert!(matches!(err, SpeechError::MalformedAudioResponse(_)));
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn non_json_success_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let client = client_for(&config_for(&server, 3), Arc::new(RecordingSleeper::default()));
        let err = client.synthesize(&request()).await.unwrap_err();

        assert!(matches!(err, SpeechError::MalformedAudioResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_failure() {
        let config = SpeechConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "test-key".to_string(),
            retry: RetryPolicy::new(2, Duration::from_millis(10)),
            ..Default::default()
        };
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_for(&config, sleeper.clone());

        let err = client.synthesize(&request()).await.unwrap_err();
        match err {
            SpeechError::RetriesExhausted { attempts, last_error } => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("network failure"));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(sleeper.delays(), vec![Duration::from_millis(10)]);
    }

    #[test]
    fn first_part_with_audio_wins() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "preamble"},
                        {"inlineData": {"mimeType": "audio/L16;rate=24000", "data": "AAABAA=="}}
                    ]
                }
            }]
        });
        let response = parse_generate_content(body.to_string().as_bytes()).unwrap();
        assert_eq!(response.audio_bytes, vec![0, 0, 1, 0]);
    }

    #[test]
    fn empty_candidates_are_malformed() {
        let err = parse_generate_content(br#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, SpeechError::MalformedAudioResponse(_)));

        let err = parse_generate_content(br#"{}"#).unwrap_err();
        assert!(matches!(err, SpeechError::MalformedAudioResponse(_)));
    }

    #[test]
    fn bad_base64_is_malformed() {
        let body = json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "audio/L16;rate=24000", "data": "not base64!"}}
            ]}}]
        });
        let err = parse_generate_content(body.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, SpeechError::MalformedAudioResponse(_)));
    }
}
