use clap::{Args, Parser, Subcommand, ValueEnum};
use jiff::{SignedDuration, Timestamp};
use std::fmt::{Display, Formatter};

pub const DATABASE_URL_ENV: &str = "DWARF_DATABASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "DWARF_STORAGE_BACKEND";
pub const BASE_URL_ENV: &str = "DWARF_BASE_URL";
pub const ALLOCATION_ATTEMPTS_ENV: &str = "DWARF_ALLOCATION_ATTEMPTS";
pub const LOG_FORMAT_ENV: &str = "DWARF_LOG_FORMAT";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://dwarf.sqlite";
pub const DEFAULT_BASE_URL: &str = "http://localhost";
pub const DEFAULT_ALLOCATION_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "sqlite")]
    Sqlite,
    #[value(name = "in-memory")]
    InMemory,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::Sqlite => write!(f, "sqlite"),
            StorageBackendArg::InMemory => write!(f, "in-memory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "dwarf", about = "Create and resolve short links")]
pub struct CLI {
    #[arg(long, global = true, env = DATABASE_URL_ENV, default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    #[arg(
        long,
        global = true,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::Sqlite
    )]
    pub storage: StorageBackendArg,

    /// Prefix used when printing created short links.
    #[arg(long, global = true, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        global = true,
        env = ALLOCATION_ATTEMPTS_ENV,
        default_value_t = DEFAULT_ALLOCATION_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub allocation_attempts: u32,

    #[arg(
        long,
        global = true,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormatArg::Text
    )]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shorten a URL and print the short link.
    Create(CreateArgs),
    /// Print the target of a short link, consuming one use.
    Resolve {
        code: String,
        #[arg(long)]
        passphrase: Option<String>,
    },
    /// Remove a short link.
    Delete { code: String },
    /// Print the stored record without consuming a use.
    Inspect { code: String },
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub url: String,

    /// Custom code made of `[a-zA-Z0-9_-]`.
    #[arg(long)]
    pub code: Option<String>,

    /// Number of resolutions before the link is deleted.
    #[arg(long)]
    pub uses: Option<u32>,

    /// Absolute expiry, e.g. `2030-01-01T00:00:00Z`.
    #[arg(long, conflicts_with = "expires_in")]
    pub expires_at: Option<Timestamp>,

    /// Relative expiry, e.g. `1h 30m` or `PT90M`.
    #[arg(long)]
    pub expires_in: Option<SignedDuration>,

    #[arg(long)]
    pub passphrase: Option<String>,
}
