//! Output path policy

use chrono::Local;
use std::path::{Path, PathBuf};

/// Timestamp format embedded in output names (`yymmddHHMMSS`)
pub const TIMESTAMP_FORMAT: &str = "%y%m%d%H%M%S";

/// Which family of outputs a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Named index: `TRANSFORM/<prefix>/<prefix>_<ALGO>_<ts>.tif`
    Index,
    /// Band expression: `Calculator/<prefix>/<prefix>_custom_<ts>.tif`
    Expression,
    /// RGB composite: `COMPOSITE/<prefix>/<prefix>_RGB_<ts>.tif`
    Composite,
}

impl OutputKind {
    pub fn base_dir(&self) -> &'static str {
        match self {
            Self::Index => "TRANSFORM",
            Self::Expression => "Calculator",
            Self::Composite => "COMPOSITE",
        }
    }
}

/// Root directory, name prefix and run timestamp
#[derive(Debug, Clone)]
pub struct OutputNaming {
    root: PathBuf,
    prefix: String,
    timestamp: String,
}

impl OutputNaming {
    /// Stamp with the current local time
    pub fn new<P: Into<PathBuf>>(root: P, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Paths for a run of `kind`; `tag` is the algorithm name for index runs
    pub fn outputs(&self, kind: OutputKind, tag: &str) -> OutputPaths {
        let dir = self.root.join(kind.base_dir()).join(&self.prefix);
        let tag = match kind {
            OutputKind::Index => tag,
            OutputKind::Expression => "custom",
            OutputKind::Composite => "RGB",
        };
        let stem = format!("{}_{}_{}", self.prefix, tag, self.timestamp);
        OutputPaths {
            raster: dir.join(format!("{}.tif", stem)),
            preview: dir.join(format!("{}_preview.png", stem)),
            dir,
        }
    }
}

/// Output locations of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Directory created right before the raster is written
    pub dir: PathBuf,
    pub raster: PathBuf,
    pub preview: PathBuf,
}

impl OutputPaths {
    /// An explicit raster path with its preview beside it
    pub fn explicit(raster: PathBuf) -> Self {
        let stem = raster
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let dir = raster
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            preview: dir.join(format!("{}_preview.png", stem)),
            dir,
            raster,
        }
    }

    pub fn raster_name(&self) -> String {
        file_name(&self.raster)
    }

    pub fn preview_name(&self) -> String {
        file_name(&self.preview)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Prefix derived from the input file stem when none is given
pub fn default_prefix(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "output".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming() -> OutputNaming {
        OutputNaming::new("/data/out", "farm").with_timestamp("240131235959")
    }

    #[test]
    fn test_index_paths() {
        let paths = naming().outputs(OutputKind::Index, "NDVI");
        assert_eq!(paths.dir, PathBuf::from("/data/out/TRANSFORM/farm"));
        assert_eq!(paths.raster_name(), "farm_NDVI_240131235959.tif");
        assert_eq!(paths.preview_name(), "farm_NDVI_240131235959_preview.png");
    }

    #[test]
    fn test_expression_paths() {
        let paths = naming().outputs(OutputKind::Expression, "(b5-b4)/(b5+b4)");
        assert_eq!(
            paths.raster,
            PathBuf::from("/data/out/Calculator/farm/farm_custom_240131235959.tif")
        );
    }

    #[test]
    fn test_composite_paths() {
        let paths = naming().outputs(OutputKind::Composite, "");
        assert_eq!(paths.raster_name(), "farm_RGB_240131235959.tif");
        assert!(paths.dir.ends_with("COMPOSITE/farm"));
    }

    #[test]
    fn test_explicit_path() {
        let paths = OutputPaths::explicit(PathBuf::from("/tmp/x/rgb.tif"));
        assert_eq!(paths.dir, PathBuf::from("/tmp/x"));
        assert_eq!(paths.preview, PathBuf::from("/tmp/x/rgb_preview.png"));
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = OutputNaming::new(".", "p").timestamp().to_string();
        assert_eq!(ts.len(), 12);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_default_prefix() {
        assert_eq!(default_prefix(Path::new("/a/scene_LC08.tif")), "scene_LC08");
        assert_eq!(default_prefix(Path::new("")), "output");
    }
}
