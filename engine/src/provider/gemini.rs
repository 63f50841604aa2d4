use crate::{
    error::GenerationError,
    provider::{MediaProvider, MediaResult, ProviderFuture, VideoPoll},
    request::GenerationRequest,
};

pub mod gemini_api;

/// Gemini-flavored generation provider: `generateContent` for images,
/// `generateVideos` plus operation polling for video. The key passed to
/// [`new`](Self::new) is the process-wide default; requests may carry their
/// own override.
#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    image_model: String,
    video_model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: gemini_api::DEFAULT_BASE_URL.to_string(),
            image_model: gemini_api::DEFAULT_IMAGE_MODEL.to_string(),
            video_model: gemini_api::DEFAULT_VIDEO_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Deployments often sit behind a proxy, so the base URL is not fixed
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_models(
        mut self,
        image_model: impl Into<String>,
        video_model: impl Into<String>,
    ) -> Self {
        self.image_model = image_model.into();
        self.video_model = video_model.into();
        self
    }

    fn key<'a>(&'a self, override_key: Option<&'a str>) -> &'a str {
        override_key.unwrap_or(&self.api_key)
    }
}

impl MediaProvider for GeminiProvider {
    fn generate_images<'a>(
        &'a self,
        req: &'a GenerationRequest,
    ) -> ProviderFuture<'a, Vec<MediaResult>> {
        Box::pin(async move {
            let key = self.key(req.api_key.as_deref());
            gemini_api::generate_images(&self.client, &self.base_url, &self.image_model, key, req)
                .await
        })
    }

    fn submit_video<'a>(&'a self, req: &'a GenerationRequest) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            let key = self.key(req.api_key.as_deref());
            gemini_api::submit_video(&self.client, &self.base_url, &self.video_model, key, req)
                .await
        })
    }

    fn poll_video<'a>(
        &'a self,
        operation: &'a str,
        api_key: Option<&'a str>,
    ) -> ProviderFuture<'a, VideoPoll> {
        Box::pin(async move {
            gemini_api::poll_operation(&self.client, &self.base_url, self.key(api_key), operation)
                .await
        })
    }

    fn fetch_media<'a>(
        &'a self,
        uri: &'a str,
        api_key: Option<&'a str>,
    ) -> ProviderFuture<'a, Vec<u8>> {
        Box::pin(async move { gemini_api::fetch_bytes(&self.client, self.key(api_key), uri).await })
    }
}
