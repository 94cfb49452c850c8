use std::{path::PathBuf, time::Instant};

use guidescan::{crop_to_guide, CropOutcome, Size, ViewRect};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

const USAGE: &str =
    "usage: guidescan <image> <view_w> <view_h> <guide_x> <guide_y> <guide_w> <guide_h> [out]";

fn main() {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.len() < 7 {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }
    let numbers = args[1..7]
        .iter()
        .map(|it| it.parse::<f64>().expect(USAGE))
        .collect::<Vec<_>>();
    let preview = Size::new(numbers[0], numbers[1]);
    let guide = ViewRect::new(numbers[2], numbers[3], numbers[4], numbers[5]);
    let output = args
        .get(7)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("cropped.png"));

    let image = image::open(&args[0]).expect("Failed to load image");
    let start = Instant::now();
    let outcome = crop_to_guide(image, &guide, preview);
    log::debug!("{:?}", start.elapsed());
    match &outcome {
        CropOutcome::Cropped { rect, .. } => log::info!("Cropped to {rect:?}"),
        CropOutcome::Uncropped { reason, .. } => log::warn!("Keeping full image: {reason}"),
        CropOutcome::Rejected { .. } => unreachable!("no session involved"),
    }
    outcome
        .into_image()
        .save(&output)
        .expect("Failed to save image");
}
