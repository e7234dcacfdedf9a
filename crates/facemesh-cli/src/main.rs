use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use facemesh_bridge::{
    Bridge, BridgeError, ContextHandle, DefaultEngine, FaceLandmarks, FaceMeshConfig, Frame,
    GraphEngine,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "facemesh")]
#[command(about = "Detect face landmarks in images with the MediaPipe face mesh graph")]
#[command(version)]
struct Args {
    /// Directory containing the `mediapipe/` resource tree
    #[arg(short, long)]
    resource_dir: PathBuf,

    /// Face detector score threshold (0.0-1.0)
    #[arg(long, default_value = "0.5")]
    min_score: f32,

    /// Log level when RUST_LOG is unset (debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Images to process, in order
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to decode {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One output line.
#[derive(Debug, Serialize)]
struct ImageReport<'a> {
    image: &'a str,
    /// `null` when the graph produced no result for this image.
    faces: Option<Vec<FaceLandmarks>>,
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(io::stderr))
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    info!("facemesh {}", env!("CARGO_PKG_VERSION"));

    let config = FaceMeshConfig::new(&args.resource_dir).with_min_score(args.min_score);
    let bridge = Bridge::new(DefaultEngine::default());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    run(&bridge, &config, &args.images, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Process `images` on a single context, one JSON line each.
///
/// The context is destroyed before returning, on success or error.
fn run<E: GraphEngine, W: Write>(
    bridge: &Bridge<E>,
    config: &FaceMeshConfig,
    images: &[PathBuf],
    out: &mut W,
) -> Result<(), CliError> {
    let handle = bridge.create(config)?;
    let result = images
        .iter()
        .try_for_each(|path| process_image(bridge, handle, path, out));
    bridge.destroy(handle);
    result
}

fn process_image<E: GraphEngine, W: Write>(
    bridge: &Bridge<E>,
    handle: ContextHandle,
    path: &Path,
    out: &mut W,
) -> Result<(), CliError> {
    let name = path.display().to_string();
    let rgb = image::open(path)
        .map_err(|source| CliError::Image {
            path: name.clone(),
            source,
        })?
        .to_rgb8();
    let (width, height) = rgb.dimensions();

    let faces = bridge.process(handle, &Frame::srgb(rgb.as_raw(), width, height))?;
    match &faces {
        Some(faces) => debug!("{}: {} face(s)", name, faces.len()),
        None => warn!("{}: no result from the landmark graph", name),
    }

    serde_json::to_writer(
        &mut *out,
        &ImageReport {
            image: &name,
            faces,
        },
    )?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use facemesh_bridge::scripted::ScriptedEngine;
    use facemesh_bridge::types::GRAPH_ASSET_PATH;
    use facemesh_bridge::Landmark;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    use super::*;

    fn resource_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let graph = dir.path().join(GRAPH_ASSET_PATH);
        fs::create_dir_all(graph.parent().unwrap()).unwrap();
        fs::write(&graph, b"graph").unwrap();
        dir
    }

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        path
    }

    fn output_lines(out: Vec<u8>) -> Vec<serde_json::Value> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_one_line_per_image() {
        let resources = resource_dir();
        let images = tempfile::tempdir().unwrap();
        let first = write_png(images.path(), "a.png");
        let second = write_png(images.path(), "b.png");

        let bridge = Bridge::new(ScriptedEngine::new());
        bridge
            .engine()
            .push_batch(vec![vec![Landmark::new(0.25, 0.5, -0.125)]]);
        bridge.engine().push_no_result();

        let mut out = Vec::new();
        run(
            &bridge,
            &FaceMeshConfig::new(resources.path()),
            &[first.clone(), second],
            &mut out,
        )
        .unwrap();

        let lines = output_lines(out);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["image"], first.display().to_string());
        assert_eq!(
            lines[0]["faces"],
            serde_json::json!([[{"x": 0.25, "y": 0.5, "z": -0.125}]])
        );
        assert!(lines[1]["faces"].is_null());
        assert_eq!(bridge.live_contexts(), 0);
        assert_eq!(bridge.engine().frames_processed(), 2);
    }

    #[test]
    fn test_undecodable_image_destroys_context() {
        let resources = resource_dir();
        let images = tempfile::tempdir().unwrap();
        let bogus = images.path().join("bogus.png");
        fs::write(&bogus, b"not a png").unwrap();

        let bridge = Bridge::new(ScriptedEngine::new());
        let mut out = Vec::new();
        let err = run(
            &bridge,
            &FaceMeshConfig::new(resources.path()),
            &[bogus],
            &mut out,
        )
        .unwrap_err();

        assert!(matches!(err, CliError::Image { .. }));
        assert!(out.is_empty());
        assert_eq!(bridge.live_contexts(), 0);
        assert_eq!(bridge.engine().live_instances(), 0);
    }

    #[test]
    fn test_missing_resources_fail_before_decoding() {
        let resources = tempfile::tempdir().unwrap();
        let bridge = Bridge::new(ScriptedEngine::new());
        let mut out = Vec::new();

        let err = run(
            &bridge,
            &FaceMeshConfig::new(resources.path()),
            &[PathBuf::from("unused.png")],
            &mut out,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            CliError::Bridge(BridgeError::GraphAssetMissing(_))
        ));
    }
}
