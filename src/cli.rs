use std::path::PathBuf;

use clap::Parser;

/// Approximate disk usage of a directory tree on an FTP server
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(version)]
pub struct Cli {
    /// The FTP server to connect to
    pub host: String,

    /// Directory to estimate, relative to the login directory
    #[arg(default_value = ".")]
    pub path: String,

    /// User name to log in with
    #[arg(short, long, env = "FTPDU_USER", default_value = "anonymous")]
    pub user: String,

    /// Password to log in with
    #[arg(long, env = "FTPDU_PASSWORD", hide_env_values = true, default_value = "")]
    pub password: String,

    /// Control connection port
    #[arg(long, default_value_t = ftpdu::DEFAULT_FTP_PORT)]
    pub port: u16,

    /// How many directory levels to enter below PATH
    #[arg(short = 'd', long, default_value_t = ftpdu::DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Bytes credited to each directory past the depth limit
    #[arg(long, default_value_t = ftpdu::DEFAULT_UNEXPLORED_ESTIMATE)]
    pub unexplored_estimate: u64,

    /// Entry name to skip entirely (repeatable)
    #[arg(short, long = "skip", value_name = "NAME")]
    pub skip: Vec<String>,

    /// Newline-delimited file of names in PATH to estimate, instead of
    /// listing PATH on the server
    #[arg(short, long, value_name = "FILE")]
    pub listing: Option<PathBuf>,

    /// Text in the server's SIZE refusal that marks a directory
    #[arg(long, default_value = ftpdu::DEFAULT_DIRECTORY_SENTINEL)]
    pub dir_sentinel: String,

    /// Socket timeout in seconds, 0 for none
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Print the total in KB/MB/GB instead of bytes
    #[arg(short = 'H', long, default_value = "false")]
    pub human: bool,
}
