use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::dashboard::Page;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Merge two CSV data sources on a shared key and summarize them",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive dashboard: navigate pages and upload files from a prompt
    Shell(ShellArgs),
    /// Merge two uploads and write the merged table as CSV
    Merge(MergeArgs),
    /// Merge two uploads and print the summary page
    Summary(SummaryArgs),
    /// Render a single dashboard page once
    Page(PageArgs),
}

/// Options shared by every command that runs the pipeline.
#[derive(Debug, Default, Clone, Args)]
pub struct SettingsArgs {
    /// YAML file supplying defaults for the options below
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Column both uploads are merged on (default: product_id)
    #[arg(short = 'k', long = "key")]
    pub key: Option<String>,
    /// Numeric column summed on the summary page (default: value)
    #[arg(long = "value-column")]
    pub value_column: Option<String>,
    /// Rows shown in the post-merge preview (default: 5)
    #[arg(long = "preview-rows")]
    pub preview_rows: Option<usize>,
    /// Suffixes for shared non-key columns, e.g. `_x,_y`
    #[arg(long = "suffixes")]
    pub suffixes: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the uploads (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// First data source (CSV)
    #[arg(long = "first")]
    pub first: Option<PathBuf>,
    /// Second data source (CSV)
    #[arg(long = "second")]
    pub second: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ShellArgs {
    #[command(flatten)]
    pub uploads: UploadArgs,
    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// First data source (CSV)
    #[arg(long = "first")]
    pub first: PathBuf,
    /// Second data source (CSV)
    #[arg(long = "second")]
    pub second: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults to comma)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// First data source (CSV)
    #[arg(long = "first")]
    pub first: PathBuf,
    /// Second data source (CSV)
    #[arg(long = "second")]
    pub second: PathBuf,
    /// Print the summary as JSON instead of a rendered page
    #[arg(long)]
    pub json: bool,
    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Debug, Args)]
pub struct PageArgs {
    /// Page to render
    #[arg(value_enum)]
    pub page: Page,
    #[command(flatten)]
    pub uploads: UploadArgs,
    #[command(flatten)]
    pub settings: SettingsArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_delimiter_accepts_names_and_single_chars() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("pipe"), Ok(b'|'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn summary_command_reads_shared_settings() {
        let cli = Cli::try_parse_from([
            "product-dashboard",
            "summary",
            "--first",
            "a.csv",
            "--second",
            "b.csv",
            "--key",
            "sku",
            "--json",
        ])
        .unwrap();
        let Commands::Summary(args) = cli.command else {
            panic!("expected summary command");
        };
        assert!(args.json);
        assert_eq!(args.settings.key.as_deref(), Some("sku"));
    }
}
