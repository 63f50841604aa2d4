use std::path::PathBuf;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use clap::Parser;
use color_eyre::Result;
use engine::{
    cancel::CancelToken,
    driver::JobDriver,
    provider::GeminiProvider,
    request::{self, AspectRatio, GenerationMode},
};

#[derive(clap::Parser)]
struct Arg {
    key: String,
    prompt: String,
    #[arg(long, default_value = "wide")]
    ratio: AspectRatio,
    /// Reference image (png/jpeg/webp) to start the video from
    #[arg(long)]
    reference: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();
    let Arg {
        key,
        prompt,
        ratio,
        reference,
    } = Arg::parse();

    let reference = reference
        .map(std::fs::read)
        .transpose()?
        .map(|bytes| BASE64.encode(bytes));

    let req = request::build(
        &prompt,
        reference.as_deref(),
        GenerationMode::Video,
        ratio,
        None,
    )?;
    let driver = JobDriver::new(Box::new(GeminiProvider::new(key)));

    let video = driver.run(&req, &CancelToken::new()).await?;
    std::fs::write("output.mp4", &video.bytes)?;
    println!("Saved output.mp4, {} bytes", video.bytes.len());

    Ok(())
}
