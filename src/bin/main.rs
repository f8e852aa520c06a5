use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{debug, error, info, warn};
use md2report::config::{self, ConfigSource};
use md2report::markdown::{parse_blocks, Block};
use md2report::{validation, ReportError, ReportRenderer};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Debug)]
enum AppError {
    FileReadError { path: String, source: std::io::Error },
    DumpError { path: String, source: std::io::Error },
    ConversionError(ReportError),
    PathError(String),
    ValidationFailed(usize),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::FileReadError { path, .. } => write!(f, "Error reading file {}", path),
            AppError::DumpError { path, .. } => write!(f, "Error writing block dump {}", path),
            AppError::ConversionError(_) => write!(f, "Conversion failed"),
            AppError::PathError(e) => write!(f, "Path error: {}", e),
            AppError::ValidationFailed(n) => write!(f, "{} validation warning(s)", n),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::FileReadError { source, .. } | AppError::DumpError { source, .. } => Some(source),
            AppError::ConversionError(e) => Some(e),
            _ => None,
        }
    }
}

/// Verbosity level for output
#[derive(Debug, Clone, Copy, PartialEq)]
enum Verbosity {
    Quiet,   // Errors only
    Normal,  // Warnings and results
    Verbose, // Pipeline details
}

impl Verbosity {
    fn from_matches(matches: &ArgMatches) -> Self {
        if matches.get_flag("quiet") {
            Verbosity::Quiet
        } else if matches.get_flag("verbose") {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    fn default_filter(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "debug",
        }
    }
}

fn get_markdown_input(matches: &ArgMatches) -> Result<String, AppError> {
    if let Some(file_path) = matches.get_one::<String>("path") {
        fs::read_to_string(file_path).map_err(|e| AppError::FileReadError {
            path: file_path.to_string(),
            source: e,
        })
    } else if let Some(markdown_string) = matches.get_one::<String>("string") {
        Ok(markdown_string.to_string())
    } else {
        Err(AppError::PathError("No input provided".to_string()))
    }
}

/// Output file: `--output`, else the input path with a `.pdf` extension, else
/// `output.pdf`.
fn get_output_path(matches: &ArgMatches) -> PathBuf {
    if let Some(output) = matches.get_one::<String>("output") {
        return PathBuf::from(output);
    }
    match matches.get_one::<String>("path") {
        Some(input) => Path::new(input).with_extension("pdf"),
        None => PathBuf::from("output.pdf"),
    }
}

/// Configuration file to load, if any.
///
/// Priority order:
/// 1. `--config FILE`
/// 2. `md2reportrc.toml` in the current directory
/// 3. `md2reportrc.toml` in the user configuration directory
fn get_config_path(matches: &ArgMatches) -> Option<String> {
    if let Some(config_file) = matches.get_one::<String>("config") {
        return Some(config_file.to_string());
    }
    config::find_config_file().map(|p| p.display().to_string())
}

fn run(matches: &ArgMatches) -> Result<(), AppError> {
    let verbosity = Verbosity::from_matches(matches);
    let dry_run = matches.get_flag("dry-run");

    let markdown = get_markdown_input(matches)?;
    let output_path = get_output_path(matches);
    let output_path_str = output_path
        .to_str()
        .ok_or_else(|| AppError::PathError("Invalid output path".to_string()))?;

    let warnings = validation::validate_conversion(&markdown, Some(output_path_str));
    for warning in &warnings {
        warn!("{}", warning);
    }
    if dry_run {
        if verbosity == Verbosity::Quiet {
            return if warnings.is_empty() {
                Ok(())
            } else {
                Err(AppError::ValidationFailed(warnings.len()))
            };
        }
        println!("Dry-run validation complete. No PDF generated.");
        if warnings.is_empty() {
            println!("No issues detected.");
        } else {
            println!("{} warning(s) found.", warnings.len());
        }
        return Ok(());
    }

    let blocks = parse_blocks(&markdown);
    debug!("Parsed {} blocks", blocks.len());

    if let Some(dump_path) = matches.get_one::<String>("dump-blocks") {
        Block::save_to_json_file(&blocks, dump_path).map_err(|e| AppError::DumpError {
            path: dump_path.to_string(),
            source: e,
        })?;
        info!("Wrote block dump to {}", dump_path);
    }

    let config_path = get_config_path(matches);
    let source = match config_path.as_deref() {
        Some(path) => {
            info!("Using configuration {}", path);
            ConfigSource::File(path)
        }
        None => ConfigSource::Default,
    };
    let mut style = config::load_config_from_source(source);
    if let Some(title) = matches.get_one::<String>("title") {
        style.header.title = title.to_string();
    }

    ReportRenderer::new(style)
        .render_to_file(&blocks, output_path_str)
        .map_err(AppError::ConversionError)?;

    if verbosity != Verbosity::Quiet {
        println!("Saved PDF to {}", output_path_str);
        if verbosity == Verbosity::Verbose {
            if let Ok(metadata) = fs::metadata(output_path_str) {
                println!("   Size: {:.1} KB", metadata.len() as f64 / 1024.0);
            }
        }
    }

    Ok(())
}

fn build_cli() -> Command {
    Command::new("md2report")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render Markdown with display math into a paginated PDF report")
        .after_help(
            "EXAMPLES:\n  \
            md2report -p report.md\n  \
            md2report -p report.md -o out/report.pdf --title \"Fleet Study\"\n  \
            md2report -s \"# Hello\" -o hello.pdf\n  \
            md2report -p report.md --dry-run\n",
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .value_name("FILE_PATH")
                .help("Path to the markdown file")
                .conflicts_with("string"),
        )
        .arg(
            Arg::new("string")
                .short('s')
                .long("string")
                .value_name("MARKDOWN_STRING")
                .help("Markdown content as a string"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_PATH")
                .help("Path to the output PDF (defaults to the input with .pdf, or ./output.pdf)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("CONFIG_FILE")
                .help("Path to configuration file (TOML). Auto-detects md2reportrc.toml if not specified"),
        )
        .arg(
            Arg::new("title")
                .long("title")
                .value_name("TEXT")
                .help("Title printed in the page header"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show pipeline details")
                .action(ArgAction::SetTrue)
                .conflicts_with("quiet"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress all output except errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Validate input without generating a PDF")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump-blocks")
                .long("dump-blocks")
                .value_name("FILE")
                .help("Write the parsed blocks as JSON"),
        )
        .arg(
            Arg::new("get-default-configuration")
                .long("get-default-configuration")
                .help("Print a default md2reportrc.toml to stdout and exit")
                .action(ArgAction::SetTrue),
        )
}

fn main() {
    let mut cmd = build_cli();
    let matches = cmd.clone().get_matches();

    let verbosity = Verbosity::from_matches(&matches);
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(verbosity.default_filter()),
    )
    .format_timestamp_millis()
    .init();

    if matches.get_flag("get-default-configuration") {
        print!("{}", config::default_config_toml());
        process::exit(0);
    }

    if !matches.contains_id("path") && !matches.contains_id("string") {
        let _ = cmd.print_help();
        println!();
        process::exit(1);
    }

    if let Err(e) = run(&matches) {
        error!("[X] {}", e);
        let mut cause = e.source();
        while let Some(inner) = cause {
            error!("    caused by: {}", inner);
            cause = inner.source();
        }
        process::exit(1);
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn parse(args: &[&str]) -> ArgMatches {
        let mut full = vec!["md2report"];
        full.extend_from_slice(args);
        build_cli().get_matches_from(full)
    }

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_output_path_defaults() {
        assert_eq!(get_output_path(&parse(&["-s", "# x"])), PathBuf::from("output.pdf"));
        assert_eq!(
            get_output_path(&parse(&["-p", "docs/report.md"])),
            PathBuf::from("docs/report.pdf")
        );
        assert_eq!(
            get_output_path(&parse(&["-p", "report.md", "-o", "final.pdf"])),
            PathBuf::from("final.pdf")
        );
    }

    #[test]
    fn test_path_and_string_conflict() {
        let result = build_cli().try_get_matches_from(["md2report", "-p", "a.md", "-s", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_config_wins() {
        let matches = parse(&["-s", "x", "--config", "custom.toml"]);
        assert_eq!(get_config_path(&matches).as_deref(), Some("custom.toml"));
    }

    #[test]
    fn test_markdown_input_from_string_and_file() {
        let s = get_markdown_input(&parse(&["-s", "# Hello"])).unwrap();
        assert!(s.contains("Hello"));

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("in.md");
        fs::write(&file, "# From file").unwrap();
        let s = get_markdown_input(&parse(&["-p", file.to_str().unwrap()])).unwrap();
        assert!(s.contains("From file"));

        let missing = dir.path().join("missing.md");
        let err = get_markdown_input(&parse(&["-p", missing.to_str().unwrap()])).unwrap_err();
        assert!(err.source().is_some());
    }

    #[test]
    fn test_verbosity_filters() {
        assert_eq!(Verbosity::from_matches(&parse(&["-q"])), Verbosity::Quiet);
        assert_eq!(Verbosity::from_matches(&parse(&["-v"])), Verbosity::Verbose);
        assert_eq!(Verbosity::from_matches(&parse(&[])).default_filter(), "warn");
    }

    #[test]
    fn test_run_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.pdf");
        let matches = parse(&["-s", "# Small", "-o", output.to_str().unwrap(), "--dry-run"]);
        assert!(run(&matches).is_ok());
        assert!(!output.exists());
    }

    #[test]
    fn test_quiet_dry_run_fails_on_warnings() {
        let matches = parse(&["-s", "$$\n\\frac{1}{", "-q", "--dry-run"]);
        assert!(matches!(run(&matches), Err(AppError::ValidationFailed(_))));
    }
}
