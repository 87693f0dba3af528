//! Run orchestration: one request in, one `RunResult` out

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bandcalc_algorithms::imagery::{
    composite, evaluate, resolve_roles, BandRoleMap, CompositeMode, FormulaSelector,
    RoleResolution, SpectralIndex,
};
use bandcalc_colormap::{preview_from_raster, PreviewOptions};
use bandcalc_core::io::{write_geotiff, BandSource, Dataset, GeoTiffOptions};
use bandcalc_core::raster::Compression;
use bandcalc_core::{ComputationResult, DataType, Error, RasterProfile, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::naming::{OutputKind, OutputNaming, OutputPaths};
use crate::report::{
    BandsReport, InfoRecord, ReportBounds, ResultSink, RunLabel, RunResult,
};

/// What a run computes
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Named index, identifier as given by the caller
    Index { algo: String },
    /// Band expression over `b1..bN`
    Expression { formula: String },
    /// RGB composite of three 1-based bands
    Composite {
        bands: [usize; 3],
        mode: String,
        output: Option<PathBuf>,
    },
}

/// Immutable description of one run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input: PathBuf,
    pub operation: Operation,
    pub naming: OutputNaming,
    /// `None` disables the preview
    pub preview: Option<PreviewOptions>,
}

impl RunRequest {
    fn label(&self) -> RunLabel {
        match &self.operation {
            Operation::Index { algo } => RunLabel::Algo(
                algo.parse::<SpectralIndex>()
                    .map(|idx| idx.name().to_string())
                    .unwrap_or_else(|_| algo.clone()),
            ),
            Operation::Expression { formula } => RunLabel::Formula(formula.clone()),
            Operation::Composite { .. } => RunLabel::Algo("RGB".to_string()),
        }
    }
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Role resolution for `input`, reading band descriptions from `opened` only
/// when no platform rule matches
fn resolve_for(input: &Path, opened: &Result<Dataset>) -> RoleResolution {
    resolve_roles(&file_name(input), || match opened {
        Ok(ds) => Ok(ds.descriptions().to_vec()),
        Err(e) => Err(Error::Metadata(e.to_string())),
    })
}

/// Execute a run, emitting its records to `sink`.
///
/// Data and formula errors become a `failed` record; only a sink failure is
/// returned as an error.
pub fn execute<S: ResultSink>(request: &RunRequest, sink: &mut S) -> anyhow::Result<RunResult> {
    let label = request.label();
    let outcome = match &request.operation {
        Operation::Index { algo } => match algo.parse::<SpectralIndex>() {
            Ok(index) => {
                let opened = Dataset::open(&request.input);
                let resolution = resolve_for(&request.input, &opened);
                info!(
                    "Detected platform: {} ({})",
                    resolution.label, resolution.map
                );
                sink.emit(
                    &InfoRecord::platform(&resolution.label, &resolution.map)
                        .with_algo(index.name()),
                )?;
                opened.and_then(|ds| run_index(request, index, &resolution.map, ds))
            }
            Err(e) => Err(e),
        },
        Operation::Expression { formula } => run_expression(request, formula),
        Operation::Composite { bands, mode, output } => {
            run_composite(request, *bands, mode, output.as_deref())
        }
    };

    let record = match outcome {
        Ok(written) => written.into_result(label),
        Err(e) => {
            warn!("Run failed: {}", e);
            RunResult::failed(e.to_string(), label)
        }
    };
    sink.emit(&record)?;
    Ok(record)
}

/// Outputs of a successful run
struct Written {
    messages: String,
    paths: OutputPaths,
    preview_png: Option<String>,
    bounds: ReportBounds,
}

impl Written {
    fn into_result(self, label: RunLabel) -> RunResult {
        RunResult::success(
            self.messages,
            label,
            self.paths.raster_name(),
            self.paths.raster.display().to_string(),
            self.preview_png,
            self.bounds,
        )
    }
}

fn run_index(
    request: &RunRequest,
    index: SpectralIndex,
    roles: &BandRoleMap,
    mut ds: Dataset,
) -> Result<Written> {
    let pb = spinner("Computing index...");
    let result = evaluate(&FormulaSelector::Index(index), roles, &mut ds);
    pb.finish_and_clear();
    let result = result?;

    let descriptions = if index == SpectralIndex::TCI {
        vec![Some("Red".into()), Some("Green".into()), Some("Blue".into())]
    } else {
        vec![Some(index.name().to_string())]
    };
    let profile = output_profile(ds.profile(), &result, DataType::F32);
    let paths = request.naming.outputs(OutputKind::Index, index.name());
    let message = format!("{} calculation successful", index.name());
    write_outputs(request, &result, &profile, descriptions, paths, message)
}

fn run_expression(request: &RunRequest, formula: &str) -> Result<Written> {
    let mut ds = Dataset::open(&request.input)?;
    let selector = FormulaSelector::Expression(formula.to_string());

    let pb = spinner("Evaluating expression...");
    let result = evaluate(&selector, &BandRoleMap::new(), &mut ds);
    pb.finish_and_clear();
    let result = result?;

    let profile = output_profile(ds.profile(), &result, DataType::F32);
    let paths = request.naming.outputs(OutputKind::Expression, formula);
    let message = format!("Calculation successful: {}", formula);
    write_outputs(request, &result, &profile, vec![Some(formula.to_string())], paths, message)
}

fn run_composite(
    request: &RunRequest,
    bands: [usize; 3],
    mode: &str,
    output: Option<&Path>,
) -> Result<Written> {
    let mode: CompositeMode = mode.parse()?;
    let mut ds = Dataset::open(&request.input)?;

    let pb = spinner("Building composite...");
    let result = composite(&mut ds, bands, mode);
    pb.finish_and_clear();
    let result = result?;

    let labels = ds.band_labels();
    let descriptions = bands
        .iter()
        .map(|&b| labels.get(b - 1).cloned())
        .collect();
    let dtype = mode.output_dtype(ds.profile().dtype);
    let profile = output_profile(ds.profile(), &result, dtype);
    let paths = match output {
        Some(path) => OutputPaths::explicit(path.to_path_buf()),
        None => request.naming.outputs(OutputKind::Composite, "RGB"),
    };
    let message = format!(
        "RGB composite ({}, {}, {}) created in {} mode",
        bands[0], bands[1], bands[2], mode
    );
    write_outputs(request, &result, &profile, descriptions, paths, message)
}

/// Source profile with the result's band count, `dtype` and LZW compression
fn output_profile(
    source: &RasterProfile,
    result: &ComputationResult,
    dtype: DataType,
) -> RasterProfile {
    source
        .clone()
        .with_band_count(result.band_count())
        .with_dtype(dtype)
        .with_compression(Compression::Lzw)
}

/// Write the raster, then derive bounds and the preview from the file on disk.
/// Bounds and preview failures only degrade the result.
fn write_outputs(
    request: &RunRequest,
    result: &ComputationResult,
    profile: &RasterProfile,
    descriptions: Vec<Option<String>>,
    paths: OutputPaths,
    mut messages: String,
) -> Result<Written> {
    if !paths.dir.as_os_str().is_empty() {
        fs::create_dir_all(&paths.dir)
            .map_err(|e| Error::Write(format!("{}: {}", paths.dir.display(), e)))?;
    }

    let pb = spinner("Writing output...");
    let written = write_geotiff(
        &paths.raster,
        result,
        profile,
        Some(GeoTiffOptions { descriptions }),
    );
    pb.finish_and_clear();
    written?;
    info!("Wrote {}", paths.raster.display());

    let bounds = match Dataset::open(&paths.raster) {
        Ok(ds) => ReportBounds::from(ds.bounds()),
        Err(e) => {
            warn!("Cannot read bounds of {}: {}", paths.raster.display(), e);
            ReportBounds::default()
        }
    };

    let preview_png = match &request.preview {
        Some(options) => match preview_from_raster(&paths.raster, &paths.preview, options) {
            Ok(image) => {
                let (w, h) = image.dimensions();
                debug!("Preview {} ({}x{})", paths.preview.display(), w, h);
                Some(paths.preview_name())
            }
            Err(e) => {
                warn!("{}", e);
                messages = format!("{}. {}", messages, e);
                None
            }
        },
        None => None,
    };

    Ok(Written {
        messages,
        paths,
        preview_png,
        bounds,
    })
}

/// Band labels of a raster for the inspection utility
pub fn inspect_bands(path: &Path) -> BandsReport {
    if !path.exists() {
        return BandsReport::failed(format!("File not found: {}", path.display()));
    }
    match Dataset::open(path) {
        Ok(ds) => {
            debug!("{}: {} bands", path.display(), ds.band_count());
            BandsReport::listed(ds.band_labels())
        }
        Err(e) => BandsReport::failed(format!("Failed to read bands: {}", e)),
    }
}

/// Role mapping of a raster without computing anything
pub fn inspect_roles(path: &Path) -> Result<InfoRecord> {
    let opened = Dataset::open(path);
    if let Err(Error::NotFound(p)) = &opened {
        return Err(Error::NotFound(p.clone()));
    }
    let resolution = resolve_for(path, &opened);
    Ok(InfoRecord::platform(&resolution.label, &resolution.map).with_roles(resolution.map))
}

/// Standalone preview of an existing raster
pub fn render_standalone(tif: &Path, png: &Path, options: &PreviewOptions) -> RunResult {
    let label = RunLabel::Algo("PREVIEW".to_string());
    let rendered = preview_from_raster(tif, png, options).and_then(|_| Dataset::open(tif));
    match rendered {
        Ok(ds) => RunResult::success(
            "Preview created",
            label,
            file_name(png),
            png.display().to_string(),
            Some(file_name(png)),
            ReportBounds::from(ds.bounds()),
        ),
        Err(e) => RunResult::failed(e.to_string(), label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{JsonLineSink, Status};
    use bandcalc_core::{GeoTransform, CRS};
    use ndarray::Array3;
    use serde_json::Value;
    use tempfile::TempDir;

    fn write_source(dir: &Path, name: &str, bands: usize) -> PathBuf {
        let path = dir.join(name);
        let data = Array3::from_shape_fn((bands, 12, 16), |(b, r, c)| {
            ((b + 1) * 100 + r * 5 + c * 3) as f32
        });
        let profile = RasterProfile::new(16, 12, bands, DataType::U16)
            .with_transform(GeoTransform::new(300_000.0, 6_000_000.0, 10.0, -10.0))
            .with_crs(Some(CRS::from_epsg(32719, false)));
        write_geotiff(&path, &ComputationResult::new(data).unwrap(), &profile, None).unwrap();
        path
    }

    fn request(dir: &Path, input: PathBuf, operation: Operation) -> RunRequest {
        RunRequest {
            input,
            operation,
            naming: OutputNaming::new(dir.join("out"), "plot").with_timestamp("250101120000"),
            preview: Some(PreviewOptions::default()),
        }
    }

    fn run(req: &RunRequest) -> (RunResult, Vec<Value>) {
        let mut sink = JsonLineSink::new(Vec::new());
        let result = execute(req, &mut sink).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let records = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (result, records)
    }

    #[test]
    fn test_index_run_writes_outputs() {
        let dir = TempDir::new().unwrap();
        let input = write_source(dir.path(), "field.tif", 5);
        let req = request(dir.path(), input, Operation::Index { algo: "ndvi".into() });

        let (result, records) = run(&req);
        assert!(result.is_success(), "{}", result.messages);
        assert_eq!(result.messages, "NDVI calculation successful");
        assert_eq!(result.filename.as_deref(), Some("plot_NDVI_250101120000.tif"));
        assert_eq!(
            result.preview_png.as_deref(),
            Some("plot_NDVI_250101120000_preview.png")
        );
        assert_eq!(result.bounds.north, Some(6_000_000.0));
        assert_eq!(result.bounds.east, Some(300_160.0));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["status"], "info");
        assert!(records[0]["messages"]
            .as_str()
            .unwrap()
            .contains("Generic (Default Mapping)"));
        assert_eq!(records[1]["algo"], "NDVI");

        let out_dir = dir.path().join("out/TRANSFORM/plot");
        let ds = Dataset::open(out_dir.join("plot_NDVI_250101120000.tif")).unwrap();
        assert_eq!(ds.profile().dtype, DataType::F32);
        assert_eq!(ds.band_count(), 1);
        assert!(out_dir.join("plot_NDVI_250101120000_preview.png").exists());
    }

    #[test]
    fn test_missing_input_fails_without_outputs() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("missing_scene.tif");
        let req = request(dir.path(), input.clone(), Operation::Index { algo: "NDVI".into() });

        let (result, records) = run(&req);
        assert_eq!(result.status, Status::Failed);
        assert!(result.messages.contains(&input.display().to_string()));
        assert!(result.path.is_none() && result.filename.is_none());
        assert_eq!(records.last().unwrap()["bounds"], serde_json::json!({}));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_unknown_algorithm_fails() {
        let dir = TempDir::new().unwrap();
        let input = write_source(dir.path(), "field.tif", 5);
        let req = request(dir.path(), input, Operation::Index { algo: "NDXI".into() });

        let (result, records) = run(&req);
        assert_eq!(result.status, Status::Failed);
        assert!(result.messages.contains("NDXI"));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_role_past_band_count_fails() {
        let dir = TempDir::new().unwrap();
        let input = write_source(dir.path(), "field.tif", 3);
        let req = request(dir.path(), input, Operation::Index { algo: "NDVI".into() });

        let (result, _) = run(&req);
        assert_eq!(result.status, Status::Failed);
        assert!(result.messages.contains('4'), "{}", result.messages);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_expression_run() {
        let dir = TempDir::new().unwrap();
        let input = write_source(dir.path(), "field.tif", 5);
        let formula = "(b5-b4)/(b5+b4)";
        let req = request(dir.path(), input, Operation::Expression { formula: formula.into() });

        let (result, records) = run(&req);
        assert!(result.is_success(), "{}", result.messages);
        assert_eq!(result.messages, format!("Calculation successful: {}", formula));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["formula"], formula);
        assert!(dir
            .path()
            .join("out/Calculator/plot/plot_custom_250101120000.tif")
            .exists());
    }

    #[test]
    fn test_unrenderable_preview_keeps_success() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("masked.tif");
        let data = Array3::from_shape_fn((2, 6, 6), |(b, r, c)| (b * 50 + r + c + 1) as f32);
        let profile = RasterProfile::new(6, 6, 2, DataType::U16).with_nodata(Some(0.0));
        write_geotiff(&input, &ComputationResult::new(data).unwrap(), &profile, None).unwrap();

        // Every output pixel equals the inherited nodata value
        let formula = "b1 * 0";
        let req = request(dir.path(), input, Operation::Expression { formula: formula.into() });
        let (result, records) = run(&req);

        assert_eq!(result.status, Status::Success);
        assert!(result.path.is_some());
        assert_eq!(result.preview_png, None);
        assert!(result
            .messages
            .starts_with("Calculation successful: b1 * 0. Failed to create preview: "));
        assert_eq!(records[0]["status"], "success");
        assert!(records[0]["preview_png"].is_null());
        assert!(!dir
            .path()
            .join("out/Calculator/plot/plot_custom_250101120000_preview.png")
            .exists());
    }

    #[test]
    fn test_bad_expression_reports_formula_error() {
        let dir = TempDir::new().unwrap();
        let input = write_source(dir.path(), "field.tif", 2);
        let req = request(dir.path(), input, Operation::Expression { formula: "b1 + b7".into() });

        let (result, _) = run(&req);
        assert_eq!(result.status, Status::Failed);
        assert!(result.messages.contains("b7"));
    }

    #[test]
    fn test_composite_run_without_preview() {
        let dir = TempDir::new().unwrap();
        let input = write_source(dir.path(), "field.tif", 4);
        let output = dir.path().join("rgb/custom.tif");
        let mut req = request(
            dir.path(),
            input,
            Operation::Composite {
                bands: [3, 2, 1],
                mode: "display".into(),
                output: Some(output.clone()),
            },
        );
        req.preview = None;

        let (result, _) = run(&req);
        assert!(result.is_success(), "{}", result.messages);
        assert_eq!(result.algo.as_deref(), Some("RGB"));
        assert!(result.preview_png.is_none());

        let ds = Dataset::open(&output).unwrap();
        assert_eq!(ds.profile().dtype, DataType::U8);
        assert_eq!(ds.band_count(), 3);
    }

    #[test]
    fn test_composite_duplicate_bands() {
        let dir = TempDir::new().unwrap();
        let input = write_source(dir.path(), "field.tif", 4);
        let req = request(
            dir.path(),
            input,
            Operation::Composite { bands: [2, 2, 1], mode: "raw".into(), output: None },
        );

        let (result, _) = run(&req);
        assert_eq!(result.messages, "R, G, and B must be different bands");
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_inspect_bands() {
        let dir = TempDir::new().unwrap();
        let input = write_source(dir.path(), "field.tif", 2);
        assert_eq!(
            inspect_bands(&input),
            BandsReport::listed(vec!["band 1".into(), "band 2".into()])
        );
        assert!(!inspect_bands(&dir.path().join("nope.tif")).is_success());
    }

    #[test]
    fn test_inspect_roles() {
        let dir = TempDir::new().unwrap();
        let input = write_source(dir.path(), "scene_LE07_stack.tif", 6);
        let info = inspect_roles(&input).unwrap();
        assert!(info.messages.contains("Landsat 7"));
        assert!(inspect_roles(&dir.path().join("nope.tif")).is_err());
    }
}
