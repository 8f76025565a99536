//! Corpus store: create, append, summarize and validate one CSV text corpus.

mod locks;
pub(crate) mod paths;
pub(crate) mod record;
pub(crate) mod report;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use locks::{WriteLocks, acquire};
use paths::PathResolver;
pub use record::{COLUMNS, DEFAULT_DOMAIN, Record, RecordInput};
pub use report::{DatasetStats, DuplicatePolicy, ValidationPolicy, ValidationReport};
use report::{Table, compute_stats, validate_table};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("No data provided for 'append' action")]
    MissingData,

    #[error("Unknown action: '{0}'. Expected one of: create, append, stats, validate")]
    UnknownAction(String),

    #[error("File does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("File has no header row: {}", .0.display())]
    NoHeader(PathBuf),

    #[error("Unexpected header in {}: found [{found}], expected [{}]", .path.display(), COLUMNS.join(","))]
    HeaderMismatch { path: PathBuf, found: String },

    #[error("Dataset operation failed: {0}")]
    Io(#[from] io::Error),

    #[error("Dataset operation failed: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Append,
    Stats,
    Validate,
}

impl std::str::FromStr for Action {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "append" => Ok(Action::Append),
            "stats" => Ok(Action::Stats),
            "validate" => Ok(Action::Validate),
            other => Err(DatasetError::UnknownAction(other.to_string())),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Action::Create => "create",
            Action::Append => "append",
            Action::Stats => "stats",
            Action::Validate => "validate",
        })
    }
}

/// One call into the store.
#[derive(Debug, Clone)]
pub struct DatasetRequest {
    pub action: Action,
    pub file_path: String,
    pub data: Option<Vec<RecordInput>>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub success: bool,
    pub message: String,
    pub file_path: String,
    pub language: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct AlreadyExists {
    pub success: bool,
    pub warning: String,
    pub file_path: String,
}

#[derive(Debug)]
pub enum CreateOutcome {
    Created(Created),
    AlreadyExists(AlreadyExists),
}

#[derive(Debug, Serialize)]
pub struct Appended {
    pub success: bool,
    pub message: String,
    pub file_path: String,
    pub records_added: usize,
    /// The file was missing and this call created it.
    pub created: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsOutcome {
    pub success: bool,
    pub file_path: String,
    #[serde(flatten)]
    pub stats: DatasetStats,
}

#[derive(Debug, Serialize)]
pub struct ValidationOutcome {
    pub success: bool,
    pub file_path: String,
    #[serde(flatten)]
    pub report: ValidationReport,
}

/// Error envelope shared by every action. `action` echoes the caller's
/// value, which may not name a known action.
#[derive(Debug, Serialize)]
pub struct Failure {
    pub error: String,
    pub action: String,
    pub file_path: String,
}

/// Result of [`DatasetStore::execute`], serializable as the tool response.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Created(Created),
    AlreadyExists(AlreadyExists),
    Appended(Appended),
    Stats(StatsOutcome),
    Validated(ValidationOutcome),
    Failed(Failure),
}

impl Outcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn failed(action: impl std::fmt::Display, file_path: &str, error: DatasetError) -> Self {
        let action = action.to_string();
        warn!(action = %action, file_path, error = %error, "dataset operation failed");
        Outcome::Failed(Failure {
            error: error.to_string(),
            action,
            file_path: file_path.to_string(),
        })
    }
}

impl From<CreateOutcome> for Outcome {
    fn from(outcome: CreateOutcome) -> Self {
        match outcome {
            CreateOutcome::Created(c) => Outcome::Created(c),
            CreateOutcome::AlreadyExists(e) => Outcome::AlreadyExists(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub output_dir: PathBuf,
    pub default_domain: String,
    pub validation: ValidationPolicy,
}

/// Manages corpus files under one output directory.
///
/// Cheap to clone; clones share the per-path write locks, so appends from
/// concurrent tool calls to the same file never interleave.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    resolver: PathResolver,
    default_domain: String,
    validation: ValidationPolicy,
    locks: Arc<WriteLocks>,
}

impl DatasetStore {
    pub fn new(options: StoreOptions) -> io::Result<Self> {
        Ok(Self {
            resolver: PathResolver::new(&options.output_dir)?,
            default_domain: options.default_domain,
            validation: options.validation,
            locks: Arc::default(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        self.resolver.root()
    }

    pub fn resolve(&self, file_path: &str, language: Option<&str>) -> io::Result<PathBuf> {
        self.resolver.resolve(file_path, language)
    }

    /// Run one request. Never fails: errors come back as [`Outcome::Failed`].
    pub fn execute(&self, request: DatasetRequest) -> Outcome {
        let DatasetRequest {
            action,
            file_path,
            data,
            language,
        } = request;

        // Naming for a self-healing append follows the same tie-break as its
        // create metadata: explicit language first, then the first record's.
        let naming_language = language.clone().or_else(|| {
            data.as_ref()
                .and_then(|d| d.first())
                .and_then(|r| r.language.clone())
        });

        let path = match self.resolve(&file_path, naming_language.as_deref()) {
            Ok(p) => p,
            Err(e) => return Outcome::failed(action, &file_path, DatasetError::Io(e)),
        };

        info!(%action, path = %path.display(), "dataset:execute");

        let result = match action {
            Action::Create => self.create(&path, language.as_deref()).map(Outcome::from),
            Action::Append => match data {
                Some(records) => self
                    .append(&path, records, language.as_deref())
                    .map(Outcome::Appended),
                None => Err(DatasetError::MissingData),
            },
            Action::Stats => self.stats(&path).map(|stats| {
                Outcome::Stats(StatsOutcome {
                    success: true,
                    file_path: display(&path),
                    stats,
                })
            }),
            Action::Validate => self.validate(&path).map(|report| {
                Outcome::Validated(ValidationOutcome {
                    success: true,
                    file_path: display(&path),
                    report,
                })
            }),
        };

        result.unwrap_or_else(|e| Outcome::failed(action, &display(&path), e))
    }

    /// Write a header-only corpus file. An existing file is left untouched.
    pub fn create(&self, path: &Path, language: Option<&str>) -> Result<CreateOutcome, DatasetError> {
        let lock = self.locks.for_path(path);
        let _guard = acquire(&lock);
        self.create_locked(path, language)
    }

    fn create_locked(&self, path: &Path, language: Option<&str>) -> Result<CreateOutcome, DatasetError> {
        let file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(path = %path.display(), "dataset already exists, not creating");
                return Ok(CreateOutcome::AlreadyExists(AlreadyExists {
                    success: false,
                    warning: format!(
                        "File already exists: {}. Not creating a new file.",
                        path.display()
                    ),
                    file_path: display(path),
                }));
            }
            Err(e) => return Err(e.into()),
        };

        write_header(file)?;
        info!(path = %path.display(), language = ?language, "dataset created");

        Ok(CreateOutcome::Created(Created {
            success: true,
            message: format!("Created new dataset file: {}", path.display()),
            file_path: display(path),
            language: language.map(str::to_string),
            created_at: record::timestamp(),
        }))
    }

    /// Append records in order, creating the file first if it is missing.
    ///
    /// `language` names the file metadata on creation; without it the first
    /// record's language is used.
    pub fn append(
        &self,
        path: &Path,
        records: Vec<RecordInput>,
        language: Option<&str>,
    ) -> Result<Appended, DatasetError> {
        if records.is_empty() {
            return Err(DatasetError::MissingData);
        }

        let lock = self.locks.for_path(path);
        let _guard = acquire(&lock);

        let mut created = false;
        let mut unterminated = false;
        if !path.exists() {
            let nominal = language
                .map(str::to_string)
                .or_else(|| records[0].language.clone());
            debug!(path = %path.display(), "dataset missing, creating before append");
            created = matches!(
                self.create_locked(path, nominal.as_deref())?,
                CreateOutcome::Created(_)
            );
        } else if fs::metadata(path)?.len() == 0 {
            write_header(OpenOptions::new().append(true).open(path)?)?;
        } else {
            check_header(path)?;
            unterminated = !ends_with_newline(path)?;
        }

        let today = record::today();
        let rows: Vec<Record> = records
            .into_iter()
            .map(|r| r.complete(&today, &self.default_domain))
            .collect();

        // A last record without its terminator would swallow our first row.
        let mut buf = Vec::new();
        if unterminated {
            debug!(path = %path.display(), "terminating last record before append");
            buf.push(b'\n');
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(buf);
        for row in &rows {
            writer.serialize(row)?;
        }
        let buf = writer
            .into_inner()
            .map_err(|e| DatasetError::Io(e.into_error()))?;

        let mut file = OpenOptions::new().append(true).open(path)?;
        file.write_all(&buf)?;
        file.flush()?;

        info!(path = %path.display(), records = rows.len(), created, "dataset appended");

        Ok(Appended {
            success: true,
            message: format!(
                "Appended {} records to dataset file: {}",
                rows.len(),
                path.display()
            ),
            file_path: display(path),
            records_added: rows.len(),
            created,
        })
    }

    pub fn stats(&self, path: &Path) -> Result<DatasetStats, DatasetError> {
        let table = load(path)?;
        let stats = compute_stats(&table);
        debug!(path = %path.display(), records = stats.total_records, "dataset stats");
        Ok(stats)
    }

    pub fn validate(&self, path: &Path) -> Result<ValidationReport, DatasetError> {
        let table = load(path)?;
        let report = validate_table(&table, self.validation);
        if report.issues_found {
            info!(
                path = %path.display(),
                empty = report.empty_text_count,
                short = report.short_text_count,
                duplicates = report.duplicate_text_count,
                missing_urls = report.missing_url_count,
                "dataset has quality issues"
            );
        }
        Ok(report)
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn write_header(file: File) -> Result<(), DatasetError> {
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(COLUMNS)?;
    writer.flush()?;
    Ok(())
}

fn check_header(path: &Path) -> Result<(), DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut header = csv::StringRecord::new();
    if !reader.read_record(&mut header)? {
        return Err(DatasetError::NoHeader(path.to_path_buf()));
    }
    if header.iter().ne(COLUMNS) {
        return Err(DatasetError::HeaderMismatch {
            path: path.to_path_buf(),
            found: header.iter().collect::<Vec<_>>().join(","),
        });
    }
    Ok(())
}

fn ends_with_newline(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn load(path: &Path) -> Result<Table, DatasetError> {
    if !path.exists() {
        return Err(DatasetError::NotFound(path.to_path_buf()));
    }
    if fs::metadata(path)?.len() == 0 {
        return Err(DatasetError::NoHeader(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
    Ok(Table { headers, rows })
}
