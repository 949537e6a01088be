use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Resolution bucket of an image relative to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Already meets the target
    Good,

    /// Can reach the target within the maximum upscale factor
    Upscalable,

    /// Would need more than the maximum upscale factor
    TooLow,
}

impl Category {
    /// Bucket a scale factor against the configured maximum
    pub fn from_scale(scale_needed: f64, max_factor: u32) -> Self {
        if scale_needed <= 1.0 {
            Self::Good
        } else if scale_needed <= f64::from(max_factor) {
            Self::Upscalable
        } else {
            Self::TooLow
        }
    }
}

/// One discovered image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Full path to the image file
    pub path: PathBuf,

    /// Width in pixels as probed at scan time
    pub width: u32,

    /// Height in pixels as probed at scan time
    pub height: u32,

    /// Multiplier needed to reach the target on both axes
    pub scale_needed: f64,

    /// Category derived from `scale_needed`
    pub category: Category,
}

impl ImageRecord {
    /// Record for a freshly produced file that already meets the target
    pub fn promoted(path: PathBuf, width: u32, height: u32) -> Self {
        Self {
            path,
            width,
            height,
            scale_needed: 1.0,
            category: Category::Good,
        }
    }

    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }
}

/// A file that was skipped during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub path: PathBuf,
    pub message: String,
}

/// Classified result of a directory scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    /// Successfully probed images, in traversal order
    pub records: Vec<ImageRecord>,

    /// Files that matched the filters but could not be read
    pub errors: Vec<ScanError>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn with_category(&self, category: Category) -> Vec<ImageRecord> {
        self.records
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect()
    }

    pub fn good(&self) -> Vec<ImageRecord> {
        self.with_category(Category::Good)
    }

    pub fn upscalable(&self) -> Vec<ImageRecord> {
        self.with_category(Category::Upscalable)
    }

    pub fn too_low(&self) -> Vec<ImageRecord> {
        self.with_category(Category::TooLow)
    }

    pub fn count(&self, category: Category) -> usize {
        self.records.iter().filter(|r| r.category == category).count()
    }
}

/// What the external tool is asked to do with one image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobSpec {
    /// `upscale <input> -s <scale> --output <output>`
    Upscale { scale: u32 },

    /// `convert <input> -t <name> --output <output>`
    Theme { name: String },
}

impl JobSpec {
    /// Suffix inserted before the extension of generated files
    pub fn suffix(&self) -> String {
        match self {
            Self::Upscale { .. } => "_upscaled".to_string(),
            Self::Theme { name } => format!("_{}", name),
        }
    }

    /// Deterministic output path next to `source`
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file_name = match source.extension() {
            Some(ext) => format!("{}{}.{}", stem, self.suffix(), ext.to_string_lossy()),
            None => format!("{}{}", stem, self.suffix()),
        };

        source.with_file_name(file_name)
    }

    pub fn scale(&self) -> Option<u32> {
        match self {
            Self::Upscale { scale } => Some(*scale),
            Self::Theme { .. } => None,
        }
    }
}

/// A unit of work for the external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source: PathBuf,
    pub spec: JobSpec,
}

impl Job {
    pub fn upscale(source: impl Into<PathBuf>, scale: u32) -> Self {
        Self {
            source: source.into(),
            spec: JobSpec::Upscale { scale },
        }
    }

    pub fn theme(source: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            spec: JobSpec::Theme { name: name.into() },
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.spec.output_path(&self.source)
    }

    pub fn name(&self) -> String {
        display_name(&self.source)
    }
}

/// Why a job did not produce a usable output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Tool exited with a non-zero status
    Exit,

    /// Tool exited cleanly but the output file is not there
    MissingOutput,

    /// Tool ran longer than the per-job timeout
    Timeout,

    /// Tool could not be started or waited on
    Spawn,

    /// Run was cancelled while the tool was running
    Cancelled,

    /// A produced file could not be read back for the next step
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one external tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Success { source: PathBuf, output: PathBuf },
    Failure { source: PathBuf, failure: JobFailure },
}

impl JobResult {
    pub fn failure(source: impl Into<PathBuf>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            source: source.into(),
            failure: JobFailure {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// A job that produced its output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Produced {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// A job that failed, with its diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failed {
    pub source: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

/// Successes and failures of one orchestration call, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub successes: Vec<Produced>,
    pub failures: Vec<Failed>,
}

impl BatchReport {
    pub fn push(&mut self, result: JobResult) {
        match result {
            JobResult::Success { source, output } => {
                self.successes.push(Produced { source, output })
            }
            JobResult::Failure { source, failure } => self.failures.push(Failed {
                source,
                kind: failure.kind,
                message: failure.message,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

/// File name for progress lines, falling back to the full path
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_boundaries() {
        assert_eq!(Category::from_scale(0.5, 4), Category::Good);
        assert_eq!(Category::from_scale(1.0, 4), Category::Good);
        assert_eq!(Category::from_scale(1.0001, 4), Category::Upscalable);
        assert_eq!(Category::from_scale(4.0, 4), Category::Upscalable);
        assert_eq!(Category::from_scale(4.0001, 4), Category::TooLow);
    }

    #[test]
    fn test_output_path_inserts_suffix_before_extension() {
        let source = Path::new("/walls/forest.JPG");

        assert_eq!(
            JobSpec::Upscale { scale: 2 }.output_path(source),
            PathBuf::from("/walls/forest_upscaled.JPG")
        );
        assert_eq!(
            JobSpec::Theme {
                name: "nord".to_string()
            }
            .output_path(source),
            PathBuf::from("/walls/forest_nord.JPG")
        );
    }

    #[test]
    fn test_output_path_without_extension() {
        let source = Path::new("walls/noext");
        assert_eq!(
            JobSpec::Upscale { scale: 3 }.output_path(source),
            PathBuf::from("walls/noext_upscaled")
        );
    }

    #[test]
    fn test_batch_report_partitions_results() {
        let mut report = BatchReport::default();
        report.push(JobResult::Success {
            source: PathBuf::from("a.png"),
            output: PathBuf::from("a_upscaled.png"),
        });
        report.push(JobResult::failure("b.png", FailureKind::Timeout, "Timeout (>300s)"));

        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::Timeout);
        assert_eq!(report.total(), 2);
    }

    #[test]
    fn test_promoted_record_is_good() {
        let record = ImageRecord::promoted(PathBuf::from("x_upscaled.png"), 2560, 1440);
        assert_eq!(record.category, Category::Good);
        assert_eq!(record.scale_needed, 1.0);
    }
}
