use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};

use crate::config::{Settings, check_credentials};
use crate::dataset::{Action, CreateOutcome, DatasetRequest, DatasetStore, RecordInput};
use crate::tools::Corpus;

#[derive(Parser, Debug)]
#[command(
    name = "corpus",
    version,
    about = "Text-corpus dataset manager: an MCP dataset tool for collection agents, plus direct CSV dataset commands"
)]
pub struct Cli {
    /// Directory holding corpus files (overrides CORPUS_OUTPUT_DIR)
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the dataset tool over MCP stdio
    Serve(ServeArgs),
    /// Check credentials, prepare <language>_dataset.csv and serve it to the collection pipeline
    Collect(CollectArgs),
    /// Create a header-only dataset file (never overwrites)
    Create(FileArgs),
    /// Append records from a JSON array
    Append(AppendArgs),
    /// Print dataset statistics
    Stats(FileArgs),
    /// Print dataset quality report
    Validate(FileArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Language used when a tool call does not name one
    #[arg(long)]
    pub language: Option<String>,
    /// Domain given to records without one
    #[arg(long)]
    pub domain: Option<String>,
}

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Target language for text collection
    #[arg(long, default_value = "English")]
    pub language: String,
    /// Domain to focus on (e.g. government, business)
    #[arg(long)]
    pub domain: Option<String>,
}

#[derive(Args, Debug)]
pub struct FileArgs {
    /// Dataset file; a name is derived from --language when it is not a .csv path
    #[arg(default_value = "")]
    pub file_path: String,
    #[arg(long)]
    pub language: Option<String>,
}

#[derive(Args, Debug)]
pub struct AppendArgs {
    #[command(flatten)]
    pub file: FileArgs,
    /// JSON array of records to append, read from a file or `-` for stdin
    #[arg(long)]
    pub data: Option<PathBuf>,
}

pub async fn dispatch(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let mut settings = Settings::from_env()?;
    if let Some(dir) = cli.output_dir {
        settings.output_dir = dir;
    }

    match cli.cmd {
        Command::Serve(args) => {
            if let Some(domain) = args.domain {
                settings.default_domain = domain;
            }
            let store = DatasetStore::new(settings.store_options())?;
            serve(store, args.language).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Collect(args) => collect(settings, args).await,
        Command::Create(args) => run_once(&settings, Action::Create, args, None),
        Command::Append(args) => {
            let data = args.data.as_deref().map(read_records).transpose()?;
            run_once(&settings, Action::Append, args.file, data)
        }
        Command::Stats(args) => run_once(&settings, Action::Stats, args, None),
        Command::Validate(args) => run_once(&settings, Action::Validate, args, None),
    }
}

async fn serve(store: DatasetStore, language: Option<String>) -> Result<(), Box<dyn Error>> {
    info!(output_dir = %store.output_dir().display(), "starting corpus MCP server");

    let service = Corpus::new(store, language)
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("failed to start server: {e}"))?;

    service.waiting().await?;
    info!("server stopped");
    Ok(())
}

async fn collect(mut settings: Settings, args: CollectArgs) -> Result<ExitCode, Box<dyn Error>> {
    if let Err(e) = check_credentials() {
        eprintln!("error: {e}");
        eprintln!("Set it in the environment or in a .env file, then run collect again.");
        return Ok(ExitCode::FAILURE);
    }

    eprintln!("Starting collection of {} text data", args.language);
    if let Some(domain) = args.domain {
        eprintln!("Focusing on domain: {domain}");
        settings.default_domain = domain;
    }

    let store = DatasetStore::new(settings.store_options())?;
    let path = store.resolve("", Some(&args.language))?;
    match store.create(&path, Some(&args.language))? {
        CreateOutcome::Created(_) => info!(path = %path.display(), "dataset prepared"),
        CreateOutcome::AlreadyExists(_) => {
            info!(path = %path.display(), "continuing existing dataset")
        }
    }

    serve(store.clone(), Some(args.language)).await?;

    match store.stats(&path) {
        Ok(stats) => eprintln!(
            "Collected {} records ({} characters)",
            stats.total_records, stats.total_text_length
        ),
        Err(e) => warn!(error = %e, "could not summarize dataset"),
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    eprintln!("Collection completed successfully. Output saved to {name}");
    Ok(ExitCode::SUCCESS)
}

fn run_once(
    settings: &Settings,
    action: Action,
    args: FileArgs,
    data: Option<Vec<RecordInput>>,
) -> Result<ExitCode, Box<dyn Error>> {
    let store = DatasetStore::new(settings.store_options())?;
    let outcome = store.execute(DatasetRequest {
        action,
        file_path: args.file_path,
        data,
        language: args.language,
    });
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(if outcome.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn read_records(source: &Path) -> Result<Vec<RecordInput>, Box<dyn Error>> {
    let raw = if source.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source)
            .map_err(|e| format!("failed to read {}: {e}", source.display()))?
    };
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn collect_defaults_to_english() {
        let cli = Cli::try_parse_from(["corpus", "collect"]).unwrap();
        let Command::Collect(args) = cli.cmd else {
            panic!("expected collect");
        };
        assert_eq!(args.language, "English");
        assert!(args.domain.is_none());
    }

    #[test]
    fn global_output_dir_after_subcommand() {
        let cli =
            Cli::try_parse_from(["corpus", "stats", "x.csv", "--output-dir", "/tmp/c"]).unwrap();
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/c")));
        let Command::Stats(args) = cli.cmd else {
            panic!("expected stats");
        };
        assert_eq!(args.file_path, "x.csv");
    }

    #[test]
    fn append_reads_data_flag() {
        let cli = Cli::try_parse_from([
            "corpus", "append", "out.csv", "--language", "Hindi", "--data", "rows.json",
        ])
        .unwrap();
        let Command::Append(args) = cli.cmd else {
            panic!("expected append");
        };
        assert_eq!(args.file.language.as_deref(), Some("Hindi"));
        assert_eq!(args.data, Some(PathBuf::from("rows.json")));
    }

    #[test]
    fn read_records_from_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("rows.json");
        std::fs::write(&file, r#"[{"text": "namaste", "domain": "greetings"}, {}]"#).unwrap();
        let records = read_records(&file).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].domain.as_deref(), Some("greetings"));
    }

    #[test]
    fn read_records_rejects_non_array() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("rows.json");
        std::fs::write(&file, r#"{"text": "single"}"#).unwrap();
        assert!(read_records(&file).is_err());
    }

    #[test]
    fn run_once_reports_failure_exit_code() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings {
            output_dir: tmp.path().join("output"),
            ..Settings::default()
        };
        let args = FileArgs {
            file_path: "missing.csv".into(),
            language: None,
        };
        let code = run_once(&settings, Action::Validate, args, None).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }
}
