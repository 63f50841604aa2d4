use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::GenerationError;

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    EnumIter,
    Default,
)]
pub enum AspectRatio {
    #[strum(to_string = "1:1")]
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[strum(to_string = "3:4")]
    #[serde(rename = "3:4")]
    Portrait,
    #[strum(to_string = "4:3")]
    #[serde(rename = "4:3")]
    Landscape,
    #[strum(to_string = "16:9")]
    #[serde(rename = "16:9")]
    Wide,
    #[strum(to_string = "9:16")]
    #[serde(rename = "9:16")]
    Tall,
}

const ALL_RATIOS: [AspectRatio; 5] = [
    AspectRatio::Square,
    AspectRatio::Portrait,
    AspectRatio::Landscape,
    AspectRatio::Wide,
    AspectRatio::Tall,
];

// Video generation only supports the wide and tall formats
const VIDEO_RATIOS: [AspectRatio; 2] = [AspectRatio::Wide, AspectRatio::Tall];

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    EnumIter,
    Default,
)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    #[default]
    Image,
    Video,
    DigitalHuman,
    Motion,
}

impl GenerationMode {
    pub fn is_video(self) -> bool {
        !matches!(self, Self::Image)
    }

    pub fn allowed_ratios(self) -> &'static [AspectRatio] {
        if self.is_video() {
            &VIDEO_RATIOS
        } else {
            &ALL_RATIOS
        }
    }

    fn frame_prompt(self, prompt: &str) -> String {
        match self {
            Self::Image | Self::Video => prompt.to_string(),
            Self::DigitalHuman => format!("A photorealistic digital human character, {prompt}"),
            Self::Motion => format!("Cinematic motion video, {prompt}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StylePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt_suffix: &'static str,
}

impl StylePreset {
    pub fn by_id(id: &str) -> Option<&'static StylePreset> {
        STYLE_PRESETS.iter().find(|preset| preset.id == id)
    }
}

pub const STYLE_PRESETS: &[StylePreset] = &[
    StylePreset {
        id: "cinematic",
        name: "Cinematic",
        prompt_suffix: "cinematic lighting, 8k, highly detailed, photorealistic, movie scene, dramatic atmosphere, IMAX quality",
    },
    StylePreset {
        id: "anime",
        name: "Anime",
        prompt_suffix: "anime style, studio ghibli style, vibrant colors, detailed lines, cel shaded, makoto shinkai style",
    },
    StylePreset {
        id: "cyberpunk",
        name: "Cyberpunk",
        prompt_suffix: "cyberpunk, neon lights, futuristic city, sci-fi, dark atmosphere, glowing accents, chrome metal",
    },
    StylePreset {
        id: "3d-render",
        name: "3D Render",
        prompt_suffix: "3d render, unreal engine 5, octane render, clay material, isometric, soft lighting, pixar style",
    },
    StylePreset {
        id: "oil-painting",
        name: "Oil Painting",
        prompt_suffix: "oil painting, van gogh style, thick brushstrokes, impressionism, artistic, canvas texture",
    },
    StylePreset {
        id: "sketch",
        name: "Sketch",
        prompt_suffix: "pencil sketch, graphite, charcoal drawing, rough lines, artistic, monochrome, paper texture",
    },
    StylePreset {
        id: "polaroid",
        name: "Polaroid",
        prompt_suffix: "polaroid photo, vintage camera, film grain, noise, vignette, nostalgic, 1990s aesthetic",
    },
    StylePreset {
        id: "fantasy",
        name: "Fantasy",
        prompt_suffix: "fantasy world, ethereal, magical, dreamlike, glowing particles, mystic, concept art",
    },
];

/// Decoded reference image attached to a generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMedia {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One user-initiated generation, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub reference: Option<ReferenceMedia>,
    pub aspect_ratio: AspectRatio,
    pub mode: GenerationMode,
    pub api_key: Option<String>,
}

impl GenerationRequest {
    /// Per-request key override; without it the provider's default key is used
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Builds a [`GenerationRequest`] from raw user inputs.
///
/// `reference_b64` may carry a `data:image/...;base64,` prefix, which is
/// stripped before decoding. The decoded bytes must be png, jpeg or webp.
/// An aspect ratio outside the mode's allowed set is rejected, never
/// silently substituted.
pub fn build(
    prompt: &str,
    reference_b64: Option<&str>,
    mode: GenerationMode,
    aspect_ratio: AspectRatio,
    style: Option<&StylePreset>,
) -> Result<GenerationRequest, GenerationError> {
    if !mode.allowed_ratios().contains(&aspect_ratio) {
        return Err(GenerationError::InvalidInput(format!(
            "aspect ratio {aspect_ratio} is not available in {mode} mode"
        )));
    }

    let reference = reference_b64.map(decode_reference).transpose()?;

    let mut prompt = mode.frame_prompt(prompt);
    if let Some(style) = style {
        prompt = format!("{prompt}, {}", style.prompt_suffix);
    }

    Ok(GenerationRequest {
        prompt,
        reference,
        aspect_ratio,
        mode,
        api_key: None,
    })
}

fn decode_reference(b64: &str) -> Result<ReferenceMedia, GenerationError> {
    let payload = match b64.strip_prefix("data:") {
        Some(rest) => rest.split_once("base64,").map(|(_, data)| data).ok_or_else(|| {
            GenerationError::InvalidInput("reference data URI is not base64 encoded".into())
        })?,
        None => b64,
    };

    let data = BASE64.decode(payload.trim()).map_err(|err| {
        GenerationError::InvalidInput(format!("reference image is not valid base64: {err}"))
    })?;

    let format = image::guess_format(&data).map_err(|_| {
        GenerationError::InvalidInput("reference image format was not recognized".into())
    })?;

    match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP => Ok(ReferenceMedia {
            mime_type: format.to_mime_type().to_string(),
            data,
        }),
        other => Err(GenerationError::InvalidInput(format!(
            "unsupported reference image format: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn png_b64() -> String {
        BASE64.encode(PNG_MAGIC)
    }

    #[test]
    fn build_is_deterministic() {
        let style = StylePreset::by_id("anime").unwrap();
        let a = build(
            "a cat",
            Some(&png_b64()),
            GenerationMode::Image,
            AspectRatio::Square,
            Some(style),
        )
        .unwrap();
        let b = build(
            "a cat",
            Some(&png_b64()),
            GenerationMode::Image,
            AspectRatio::Square,
            Some(style),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn style_suffix_is_comma_appended() {
        let style = StylePreset::by_id("cinematic").unwrap();
        let req = build(
            "a cat",
            None,
            GenerationMode::Image,
            AspectRatio::Square,
            Some(style),
        )
        .unwrap();
        assert_eq!(req.prompt, format!("a cat, {}", style.prompt_suffix));
    }

    #[test]
    fn mode_framing_applies_before_style() {
        let style = StylePreset::by_id("cinematic").unwrap();
        let req = build(
            "a news anchor",
            None,
            GenerationMode::DigitalHuman,
            AspectRatio::Wide,
            Some(style),
        )
        .unwrap();
        assert_eq!(
            req.prompt,
            format!(
                "A photorealistic digital human character, a news anchor, {}",
                style.prompt_suffix
            )
        );
    }

    #[test]
    fn data_uri_prefix_is_stripped() {
        let uri = format!("data:image/png;base64,{}", png_b64());
        let req = build(
            "a cat",
            Some(&uri),
            GenerationMode::Image,
            AspectRatio::Square,
            None,
        )
        .unwrap();
        let reference = req.reference.unwrap();
        assert_eq!(reference.mime_type, "image/png");
        assert_eq!(reference.data, PNG_MAGIC);
    }

    #[test]
    fn jpeg_reference_is_accepted() {
        let b64 = BASE64.encode(b"\xff\xd8\xff\xe0\x00\x10JFIF");
        let req = build(
            "a cat",
            Some(&b64),
            GenerationMode::Image,
            AspectRatio::Square,
            None,
        )
        .unwrap();
        assert_eq!(req.reference.unwrap().mime_type, "image/jpeg");
    }

    #[test]
    fn garbage_base64_is_invalid_input() {
        let err = build(
            "a cat",
            Some("not@base64!"),
            GenerationMode::Image,
            AspectRatio::Square,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidInput(_)));
    }

    #[test]
    fn non_image_bytes_are_invalid_input() {
        let b64 = BASE64.encode(b"definitely not an image");
        let err = build(
            "a cat",
            Some(&b64),
            GenerationMode::Image,
            AspectRatio::Square,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidInput(_)));
    }

    #[test]
    fn video_mode_rejects_square_ratio() {
        let err = build(
            "a cat",
            None,
            GenerationMode::Video,
            AspectRatio::Square,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidInput(_)));
    }

    #[test]
    fn video_mode_accepts_wide_and_tall() {
        for ratio in [AspectRatio::Wide, AspectRatio::Tall] {
            assert!(build("a cat", None, GenerationMode::Video, ratio, None).is_ok());
        }
    }

    #[test]
    fn image_mode_accepts_every_ratio() {
        for ratio in AspectRatio::iter() {
            assert!(build("a cat", None, GenerationMode::Image, ratio, None).is_ok());
        }
    }

    #[test]
    fn ratio_strings_match_provider_contract() {
        let strings: Vec<String> = AspectRatio::iter().map(|r| r.to_string()).collect();
        assert_eq!(strings, ["1:1", "3:4", "4:3", "16:9", "9:16"]);
    }
}
