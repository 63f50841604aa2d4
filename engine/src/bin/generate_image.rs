use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use engine::{
    driver::JobDriver,
    provider::GeminiProvider,
    request::{self, AspectRatio, GenerationMode, StylePreset},
};

#[derive(clap::Parser)]
struct Arg {
    key: String,
    prompt: String,
    #[arg(long, default_value = "portrait")]
    ratio: AspectRatio,
    #[arg(long)]
    style: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();
    let Arg {
        key,
        prompt,
        ratio,
        style,
    } = Arg::parse();

    let style = style
        .map(|id| StylePreset::by_id(&id).ok_or_else(|| eyre!("Unknown style: {id}")))
        .transpose()?;

    let req = request::build(&prompt, None, GenerationMode::Image, ratio, style)?;
    let driver = JobDriver::new(Box::new(GeminiProvider::new(key)));

    let images = driver.generate_images(&req).await?;
    if images.is_empty() {
        println!("The model returned no images");
        return Ok(());
    }

    for (i, image) in images.iter().enumerate() {
        let path = format!("output_{i}.png");
        std::fs::write(&path, &image.bytes)?;
        println!("Saved {path}, {} bytes ({})", image.bytes.len(), image.mime_type);
    }

    Ok(())
}
