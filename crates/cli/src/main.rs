use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;

use photo_intel_core::checkpoint::infrastructure::json_checkpoint_store::JsonCheckpointStore;
use photo_intel_core::cropping::domain::aspect_ratio::AspectRatio;
use photo_intel_core::detection::infrastructure::onnx_face_encoder::OnnxFaceEncoder;
use photo_intel_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use photo_intel_core::features::feature_extractor::FeatureExtractor;
use photo_intel_core::features::infrastructure::image_perceptual_hasher::ImagePerceptualHasher;
use photo_intel_core::features::infrastructure::image_probe::ImageProbe;
use photo_intel_core::features::infrastructure::onnx_scene_embedder::OnnxSceneEmbedder;
use photo_intel_core::pipeline::batch_executor::BatchExecutor;
use photo_intel_core::pipeline::file_discovery::{discover_photos, load_existing_filenames};
use photo_intel_core::pipeline::infrastructure::file_snapshot_writer::FileSnapshotWriter;
use photo_intel_core::pipeline::infrastructure::sequential_batch_executor::SequentialBatchExecutor;
use photo_intel_core::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
use photo_intel_core::pipeline::pipeline_config::PipelineConfig;
use photo_intel_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use photo_intel_core::pipeline::process_photos_use_case::{ProcessPhotosUseCase, ResumeMode};

const CONFIG_DIR_NAME: &str = "photo-intel";
const CONFIG_FILE_NAME: &str = "config.json";

/// Turns a directory of photos into per-photo feature records, crop
/// suggestions and cross-photo clusters.
#[derive(Parser, Debug)]
#[command(name = "photo-intel")]
struct Cli {
    /// Directory searched recursively for photos.
    input_dir: PathBuf,

    /// Directory receiving the checkpoint, photos.csv/json and cluster reports.
    output_dir: PathBuf,

    /// Photos processed between checkpoint writes [default: 100].
    #[arg(long)]
    batch_size: Option<usize>,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,

    /// Stop after feature extraction.
    #[arg(long)]
    skip_clustering: bool,

    /// Leave out photos whose filename is listed in --existing-filenames.
    #[arg(long)]
    skip_existing: bool,

    /// JSON array of filenames to leave out.
    #[arg(long)]
    existing_filenames: Option<PathBuf>,

    /// Continue from the checkpoint in the output directory (default).
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Delete any checkpoint and start over.
    #[arg(long)]
    fresh: bool,

    /// JSON config file. Defaults to the user config directory when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extraction threads [default: 1].
    #[arg(long)]
    workers: Option<usize>,

    /// Give up on a photo after this many seconds.
    #[arg(long)]
    photo_timeout_secs: Option<f64>,

    /// Crop targets, comma-separated (e.g. 4:5,16:9,1:1).
    #[arg(long, value_delimiter = ',')]
    aspect_ratios: Option<Vec<AspectRatio>>,

    /// Maximum hash distance for near-duplicates [default: 10].
    #[arg(long)]
    hash_threshold: Option<u32>,

    /// Minimum cosine similarity for one scene [default: 0.85].
    #[arg(long)]
    scene_similarity: Option<f64>,

    /// Maximum face embedding distance for one person [default: 0.6].
    #[arg(long)]
    face_distance: Option<f64>,

    /// YOLO face detection model (.onnx).
    #[arg(long)]
    face_model: Option<PathBuf>,

    /// YOLO COCO model (.onnx) used for person detection.
    #[arg(long)]
    person_model: Option<PathBuf>,

    /// ArcFace-style face embedding model (.onnx).
    #[arg(long)]
    face_encoder_model: Option<PathBuf>,

    /// CLIP-style image embedding model (.onnx).
    #[arg(long)]
    scene_model: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    validate(&cli)?;
    let config = load_config(&cli)?;
    config.validate()?;

    let exclude = existing_filenames(&cli);
    let photos = discover_photos(&cli.input_dir, &ImageProbe::new(), &exclude)?;
    let extractor = build_extractor(&config)?;

    let executor: Box<dyn BatchExecutor> =
        if config.workers > 1 || config.photo_timeout().is_some() {
            Box::new(ThreadedBatchExecutor::new(config.workers, config.photo_timeout()))
        } else {
            Box::new(SequentialBatchExecutor)
        };

    let mut use_case = ProcessPhotosUseCase::new(
        Arc::new(extractor),
        executor,
        Box::new(JsonCheckpointStore::in_dir(&cli.output_dir)),
        Box::new(FileSnapshotWriter::new(&cli.output_dir)),
        Box::new(StdoutPipelineLogger::default()),
        &config,
    );
    let mode = if cli.fresh {
        ResumeMode::Fresh
    } else {
        ResumeMode::Resume
    };
    let summary = use_case.execute(&photos, mode)?;

    log::info!(
        "Done: {} new, {} failed, {} total records in {}",
        summary.succeeded,
        summary.failed,
        summary.total_records,
        cli.output_dir.display()
    );
    if summary.clustered {
        log::info!(
            "Clusters: {} near-duplicate, {} scene, {} people",
            summary.near_duplicate_clusters,
            summary.scene_clusters,
            summary.people_clusters
        );
    }
    Ok(())
}

/// Config file values, then explicit flags on top.
fn load_config(cli: &Cli) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match config_path(cli) {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            PipelineConfig::from_json_file(&path)?
        }
        None => PipelineConfig::default(),
    };

    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if cli.photo_timeout_secs.is_some() {
        config.photo_timeout_secs = cli.photo_timeout_secs;
    }
    if let Some(ratios) = &cli.aspect_ratios {
        config.aspect_ratios = ratios.clone();
    }
    if cli.skip_clustering {
        config.skip_clustering = true;
    }
    if let Some(threshold) = cli.hash_threshold {
        config.clustering.hash_threshold = threshold;
    }
    if let Some(similarity) = cli.scene_similarity {
        config.clustering.scene_similarity_threshold = similarity;
    }
    if let Some(distance) = cli.face_distance {
        config.clustering.face_distance_threshold = distance;
    }
    let models = &mut config.models;
    for (flag, slot) in [
        (&cli.face_model, &mut models.face_detector),
        (&cli.person_model, &mut models.person_detector),
        (&cli.face_encoder_model, &mut models.face_encoder),
        (&cli.scene_model, &mut models.scene_embedder),
    ] {
        if flag.is_some() {
            slot.clone_from(flag);
        }
    }
    Ok(config)
}

/// Built-in image adapters plus every configured model. A model that fails
/// to load is fatal; an unset one leaves its feature empty.
fn build_extractor(
    config: &PipelineConfig,
) -> Result<FeatureExtractor, Box<dyn std::error::Error>> {
    let models = &config.models;
    let mut extractor = FeatureExtractor::new(
        Box::new(ImageProbe::new()),
        Box::new(ImagePerceptualHasher::new()),
        config.extraction_settings(),
    );
    let mut missing = Vec::new();

    match &models.face_detector {
        Some(path) => {
            let detector = OnnxYoloDetector::new(path, models.face_confidence_threshold)?;
            extractor = extractor.with_face_detector(Box::new(detector));
        }
        None => missing.push("face detection"),
    }
    match &models.person_detector {
        Some(path) => {
            let detector = OnnxYoloDetector::new(path, models.face_confidence_threshold)?;
            extractor = extractor.with_person_detector(Box::new(detector));
        }
        None => missing.push("person detection"),
    }
    match &models.face_encoder {
        Some(path) => {
            extractor = extractor.with_face_encoder(Box::new(OnnxFaceEncoder::new(path)?))
        }
        None => missing.push("face encoding"),
    }
    match &models.scene_embedder {
        Some(path) => {
            extractor = extractor.with_scene_embedder(Box::new(OnnxSceneEmbedder::new(path)?))
        }
        None => missing.push("scene embedding"),
    }

    if !missing.is_empty() {
        log::info!("No model configured for {}; left empty", missing.join(", "));
    }
    Ok(extractor)
}

fn config_path(cli: &Cli) -> Option<PathBuf> {
    if let Some(path) = &cli.config {
        return Some(path.clone());
    }
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

fn existing_filenames(cli: &Cli) -> HashSet<String> {
    if !cli.skip_existing {
        return HashSet::new();
    }
    let Some(path) = &cli.existing_filenames else {
        log::warn!("--skip-existing given without --existing-filenames; nothing excluded");
        return HashSet::new();
    };
    match load_existing_filenames(path) {
        Ok(names) => {
            log::info!("Excluding {} existing filenames", names.len());
            names
        }
        Err(e) => {
            log::warn!("{e}; nothing excluded");
            HashSet::new()
        }
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input_dir.is_dir() {
        return Err(format!("Input directory not found: {}", cli.input_dir.display()).into());
    }
    if same_dir(&cli.input_dir, &cli.output_dir) {
        return Err("Output directory must differ from the input directory".into());
    }
    if let Some(similarity) = cli.scene_similarity {
        if !(0.0..=1.0).contains(&similarity) {
            return Err(format!(
                "Scene similarity must be between 0.0 and 1.0, got {similarity}"
            )
            .into());
        }
    }
    if let Some(distance) = cli.face_distance {
        if distance < 0.0 {
            return Err(format!("Face distance must be non-negative, got {distance}").into());
        }
    }
    Ok(())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
