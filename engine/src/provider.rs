use std::{future::Future, pin::Pin};

use crate::{error::GenerationError, request::GenerationRequest};

pub mod gemini;
pub use gemini::GeminiProvider;

pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, GenerationError>> + Send + 'a>>;

pub const VIDEO_MIME: &str = "video/mp4";

/// One generated asset, fully buffered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaResult {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Where a finished job's media lives. `Uri` variants still need one more
/// fetch before the bytes can be handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    Inline { mime_type: String, data: Vec<u8> },
    Uri(String),
}

/// Snapshot of a long-running video job as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPoll {
    pub done: bool,
    pub error: Option<String>,
    pub media: Option<MediaRef>,
}

pub trait MediaProvider {
    /// Single round-trip image generation; an empty result list is valid
    fn generate_images<'a>(
        &'a self,
        req: &'a GenerationRequest,
    ) -> ProviderFuture<'a, Vec<MediaResult>>;

    /// Starts a video job and returns its opaque operation handle
    fn submit_video<'a>(&'a self, req: &'a GenerationRequest) -> ProviderFuture<'a, String>;

    /// One status check for a previously submitted job
    fn poll_video<'a>(
        &'a self,
        operation: &'a str,
        api_key: Option<&'a str>,
    ) -> ProviderFuture<'a, VideoPoll>;

    /// Downloads the raw bytes behind a media reference
    fn fetch_media<'a>(
        &'a self,
        uri: &'a str,
        api_key: Option<&'a str>,
    ) -> ProviderFuture<'a, Vec<u8>>;
}
