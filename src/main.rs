use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dex_test_parser::apk::find_test_methods_in_apk;
use dex_test_parser::parser::{test_names, TestMethod};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One test name per line
    Text,
    /// Test methods with their annotations
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "dex-test-parser")]
#[command(about = "List the JUnit3 and JUnit4 test methods compiled into an APK")]
struct Cli {
    /// Path to the APK
    #[arg(value_name = "APK")]
    apk: PathBuf,

    /// Directory to write AllTests.txt (AllTests.json with --format json) into; stdout when omitted
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Additional annotation marking test methods, e.g. com.example.MyTest
    #[arg(short = 'A', long = "annotation", value_name = "NAME")]
    annotations: Vec<String>,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let methods = find_test_methods_in_apk(&cli.apk, &cli.annotations)
        .with_context(|| format!("failed to read tests from {}", cli.apk.display()))?;
    let rendered = render(&methods, cli.format)?;

    match &cli.output_dir {
        Some(dir) => write_output(dir, cli.format, &rendered)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn render(methods: &[TestMethod], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for name in test_names(methods) {
                out.push_str(&name);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(methods)?;
            out.push('\n');
            Ok(out)
        }
    }
}

fn write_output(dir: &Path, format: OutputFormat, rendered: &str) -> Result<()> {
    let file_name = match format {
        OutputFormat::Text => "AllTests.txt",
        OutputFormat::Json => "AllTests.json",
    };
    let path = dir.join(file_name);
    fs::write(&path, rendered).with_context(|| format!("failed to write {}", path.display()))
}
