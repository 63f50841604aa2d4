use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    error::GenerationError,
    provider::{MediaRef, MediaResult, VideoPoll},
    request::GenerationRequest,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";
pub const VIDEO_RESOLUTION: &str = "720p";

#[derive(Debug, Serialize)]
pub struct GenerateContentBody {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct GenerationConfig {
    #[serde(rename = "imageConfig")]
    pub image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
pub struct ImageConfig {
    #[serde(rename = "aspectRatio")]
    pub aspect_ratio: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateVideosBody {
    pub model: String,
    pub prompt: String,
    pub config: VideoConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<VideoImage>,
}

#[derive(Debug, Serialize)]
pub struct VideoConfig {
    #[serde(rename = "numberOfVideos")]
    pub number_of_videos: u32,
    pub resolution: String,
    #[serde(rename = "aspectRatio")]
    pub aspect_ratio: String,
}

#[derive(Debug, Serialize)]
pub struct VideoImage {
    #[serde(rename = "imageBytes")]
    pub image_bytes: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
    #[serde(rename = "inlineData")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
pub struct OperationHandle {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub done: bool,
    pub error: Option<OperationError>,
    pub response: Option<VideosPayload>,
    // some proxy deployments report the payload under `result` instead
    pub result: Option<VideosPayload>,
}

#[derive(Debug, Deserialize)]
pub struct OperationError {
    pub message: String,
    pub code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct VideosPayload {
    #[serde(rename = "generatedVideos", default)]
    pub generated_videos: Vec<GeneratedVideo>,
}

#[derive(Debug, Deserialize)]
pub struct GeneratedVideo {
    pub video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
pub struct VideoRef {
    pub uri: Option<String>,
}

pub fn image_body(req: &GenerationRequest) -> GenerateContentBody {
    let mut parts = vec![];
    if let Some(reference) = &req.reference {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: reference.mime_type.clone(),
                data: BASE64.encode(&reference.data),
            },
        });
        parts.push(Part::Text {
            text: format!("Based on this reference image, generate: {}", req.prompt),
        });
    } else {
        parts.push(Part::Text {
            text: req.prompt.clone(),
        });
    }

    GenerateContentBody {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            image_config: ImageConfig {
                aspect_ratio: req.aspect_ratio.to_string(),
            },
        },
    }
}

pub fn video_body(model: &str, req: &GenerationRequest) -> GenerateVideosBody {
    GenerateVideosBody {
        model: model.to_string(),
        prompt: if req.prompt.is_empty() {
            "A cinematic video".to_string()
        } else {
            req.prompt.clone()
        },
        config: VideoConfig {
            number_of_videos: 1,
            resolution: VIDEO_RESOLUTION.to_string(),
            aspect_ratio: req.aspect_ratio.to_string(),
        },
        image: req.reference.as_ref().map(|reference| VideoImage {
            image_bytes: BASE64.encode(&reference.data),
            mime_type: reference.mime_type.clone(),
        }),
    }
}

pub fn operation_to_poll(op: Operation) -> VideoPoll {
    let media = op
        .response
        .or(op.result)
        .and_then(|payload| payload.generated_videos.into_iter().next())
        .and_then(|generated| generated.video)
        .and_then(|video| video.uri)
        .map(MediaRef::Uri);

    VideoPoll {
        done: op.done,
        error: op.error.map(|err| err.message),
        media,
    }
}

/// Requests a batch of images; each returned part with inline data becomes
/// one [`MediaResult`]. A response without inline parts yields an empty list.
pub async fn generate_images(
    client: &Client,
    base_url: &str,
    model: &str,
    key: &str,
    req: &GenerationRequest,
) -> Result<Vec<MediaResult>, GenerationError> {
    let url = format!("{base_url}/v1beta/models/{model}:generateContent?key={key}");
    let body = image_body(req);

    let resp = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(GenerationError::transport)?;

    let status = resp.status();
    let text = resp.text().await.map_err(GenerationError::transport)?;
    if !status.is_success() {
        return Err(GenerationError::http(status, text));
    }

    let parsed: GenerateContentResponse = serde_json::from_str(&text)
        .map_err(|err| GenerationError::Protocol(format!("bad generateContent response: {err}")))?;
    debug!("generateContent returned {} candidates", parsed.candidates.len());

    let mut results = vec![];
    let parts = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();
    for part in parts {
        if let Some(inline) = part.inline_data {
            let bytes = BASE64.decode(inline.data.as_bytes()).map_err(|err| {
                GenerationError::Protocol(format!("image payload is not valid base64: {err}"))
            })?;
            results.push(MediaResult {
                mime_type: inline.mime_type,
                bytes,
            });
        }
    }
    Ok(results)
}

/// Starts a video job and returns the opaque operation name to poll
pub async fn submit_video(
    client: &Client,
    base_url: &str,
    model: &str,
    key: &str,
    req: &GenerationRequest,
) -> Result<String, GenerationError> {
    let url = format!("{base_url}/v1beta/models/{model}:generateVideos?key={key}");
    let body = video_body(model, req);

    let resp = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(GenerationError::transport)?;

    let status = resp.status();
    let text = resp.text().await.map_err(GenerationError::transport)?;
    if !status.is_success() {
        return Err(GenerationError::http(status, text));
    }

    let handle: OperationHandle = serde_json::from_str(&text)
        .map_err(|err| GenerationError::Protocol(format!("bad generateVideos response: {err}")))?;
    debug!("video operation started: {}", handle.name);
    Ok(handle.name)
}

pub async fn poll_operation(
    client: &Client,
    base_url: &str,
    key: &str,
    operation: &str,
) -> Result<VideoPoll, GenerationError> {
    let url = format!("{base_url}/v1beta/{operation}?key={key}");

    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(GenerationError::transport)?;

    let status = resp.status();
    let text = resp.text().await.map_err(GenerationError::transport)?;
    if !status.is_success() {
        return Err(GenerationError::http(status, text));
    }

    let op: Operation = serde_json::from_str(&text)
        .map_err(|err| GenerationError::Protocol(format!("bad operation response: {err}")))?;
    Ok(operation_to_poll(op))
}

pub async fn fetch_bytes(
    client: &Client,
    key: &str,
    uri: &str,
) -> Result<Vec<u8>, GenerationError> {
    let separator = if uri.contains('?') { '&' } else { '?' };
    let url = format!("{uri}{separator}key={key}");

    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(GenerationError::transport)?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GenerationError::http(status, body));
    }

    let bytes = resp.bytes().await.map_err(GenerationError::transport)?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use crate::request::{AspectRatio, GenerationMode, GenerationRequest, ReferenceMedia};

    use super::*;

    fn request(prompt: &str, reference: Option<ReferenceMedia>, ratio: AspectRatio) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.into(),
            reference,
            aspect_ratio: ratio,
            mode: GenerationMode::Video,
            api_key: None,
        }
    }

    #[test]
    fn image_body_serialization() {
        let req = request("a cat", None, AspectRatio::Square);
        let expect = expect![[
            r#"{"contents":[{"parts":[{"text":"a cat"}]}],"generationConfig":{"imageConfig":{"aspectRatio":"1:1"}}}"#
        ]];
        expect.assert_eq(&serde_json::to_string(&image_body(&req)).unwrap());
    }

    #[test]
    fn image_body_with_reference_serialization() {
        let reference = ReferenceMedia {
            mime_type: "image/png".into(),
            data: b"abc".to_vec(),
        };
        let req = request("a cat", Some(reference), AspectRatio::Square);
        let expect = expect![[
            r#"{"contents":[{"parts":[{"inlineData":{"mimeType":"image/png","data":"YWJj"}},{"text":"Based on this reference image, generate: a cat"}]}],"generationConfig":{"imageConfig":{"aspectRatio":"1:1"}}}"#
        ]];
        expect.assert_eq(&serde_json::to_string(&image_body(&req)).unwrap());
    }

    #[test]
    fn video_body_serialization() {
        let req = request("a cat", None, AspectRatio::Wide);
        let expect = expect![[
            r#"{"model":"veo-3.1-fast-generate-preview","prompt":"a cat","config":{"numberOfVideos":1,"resolution":"720p","aspectRatio":"16:9"}}"#
        ]];
        expect.assert_eq(
            &serde_json::to_string(&video_body(DEFAULT_VIDEO_MODEL, &req)).unwrap(),
        );
    }

    #[test]
    fn empty_video_prompt_gets_a_default() {
        let req = request("", None, AspectRatio::Wide);
        assert_eq!(
            video_body(DEFAULT_VIDEO_MODEL, &req).prompt,
            "A cinematic video"
        );
    }

    #[test]
    fn pending_operation_maps_to_not_done() {
        let op: Operation = serde_json::from_str(r#"{"name":"op123"}"#).unwrap();
        assert_eq!(
            operation_to_poll(op),
            VideoPoll {
                done: false,
                error: None,
                media: None,
            }
        );
    }

    #[test]
    fn failed_operation_carries_the_provider_message() {
        let op: Operation = serde_json::from_str(
            r#"{"done":true,"error":{"message":"blocked by policy","code":3}}"#,
        )
        .unwrap();
        assert_eq!(
            operation_to_poll(op),
            VideoPoll {
                done: true,
                error: Some("blocked by policy".into()),
                media: None,
            }
        );
    }

    #[test]
    fn finished_operation_yields_the_video_uri() {
        let op: Operation = serde_json::from_str(
            r#"{"done":true,"response":{"generatedVideos":[{"video":{"uri":"gs://bucket/x.mp4"}}]}}"#,
        )
        .unwrap();
        assert_eq!(
            operation_to_poll(op),
            VideoPoll {
                done: true,
                error: None,
                media: Some(MediaRef::Uri("gs://bucket/x.mp4".into())),
            }
        );
    }

    #[test]
    fn proxy_result_field_is_also_accepted() {
        let op: Operation = serde_json::from_str(
            r#"{"done":true,"result":{"generatedVideos":[{"video":{"uri":"gs://bucket/y.mp4"}}]}}"#,
        )
        .unwrap();
        assert_eq!(
            operation_to_poll(op).media,
            Some(MediaRef::Uri("gs://bucket/y.mp4".into()))
        );
    }

    #[test]
    fn finished_operation_without_media_has_none() {
        let op: Operation = serde_json::from_str(r#"{"done":true,"response":{}}"#).unwrap();
        assert_eq!(
            operation_to_poll(op),
            VideoPoll {
                done: true,
                error: None,
                media: None,
            }
        );
    }
}
