//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "xdcc", version, about = "Download files offered over IRC XDCC")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download one or more XDCC file URLs.
    Get(GetArgs),
}

#[derive(Debug, clap::Args)]
pub struct GetArgs {
    /// XDCC URLs of the form irc://host[:port]/channel/bot/slot.
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// File containing one URL per line.
    #[arg(short = 'i', value_name = "FILE")]
    pub input_list: Option<PathBuf>,

    /// Output directory for downloaded files.
    #[arg(short = 'o', value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Only connect with verified TLS; never fall back to insecure modes.
    #[arg(long)]
    pub ssl_only: bool,

    /// SOCKS5 proxy URL (socks5://[user:pass@]host:port). Defaults to
    /// XDCC_PROXY, ALL_PROXY or all_proxy from the environment.
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Output format: cli (progress bar) or jsonl (event stream).
    #[arg(long, default_value = "cli", value_name = "FORMAT")]
    pub format: String,

    /// Map remote filenames to filesystem-safe ASCII before writing.
    #[arg(long)]
    pub sanitize_filenames: bool,
}

/// Selected output format. Unknown values fall back to the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Cli,
    Jsonl,
}

impl OutputFormat {
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "jsonl" => OutputFormat::Jsonl,
            "cli" => OutputFormat::Cli,
            other => {
                tracing::warn!(format = %other, "unknown output format, using cli");
                OutputFormat::Cli
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_falls_back_to_cli() {
        assert_eq!(OutputFormat::from_flag("cli"), OutputFormat::Cli);
        assert_eq!(OutputFormat::from_flag("jsonl"), OutputFormat::Jsonl);
        assert_eq!(OutputFormat::from_flag("yaml"), OutputFormat::Cli);
        assert_eq!(OutputFormat::from_flag(""), OutputFormat::Cli);
    }

    #[test]
    fn get_args_defaults() {
        let cli = Cli::parse_from(["xdcc", "get", "irc://host/chan/bot/1"]);
        let Command::Get(args) = cli.command;
        assert_eq!(args.urls, vec!["irc://host/chan/bot/1"]);
        assert_eq!(args.out_dir, PathBuf::from("."));
        assert_eq!(args.format, "cli");
        assert!(!args.ssl_only);
        assert!(!args.sanitize_filenames);
        assert!(args.proxy.is_none());
        assert!(args.input_list.is_none());
    }

    #[test]
    fn get_args_full_flags() {
        let cli = Cli::parse_from([
            "xdcc",
            "get",
            "irc://host/chan/bot/1",
            "irc://host/chan/bot/2",
            "-o",
            "/tmp/dl",
            "-i",
            "urls.txt",
            "--ssl-only",
            "--proxy",
            "socks5://localhost:1080",
            "--format",
            "jsonl",
            "--sanitize-filenames",
        ]);
        let Command::Get(args) = cli.command;
        assert_eq!(args.urls.len(), 2);
        assert_eq!(args.out_dir, PathBuf::from("/tmp/dl"));
        assert_eq!(args.input_list, Some(PathBuf::from("urls.txt")));
        assert!(args.ssl_only);
        assert_eq!(args.proxy.as_deref(), Some("socks5://localhost:1080"));
        assert_eq!(args.format, "jsonl");
        assert!(args.sanitize_filenames);
    }
}
