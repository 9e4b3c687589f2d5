pub use clap::Parser;

use url::Url;

#[derive(Parser, Debug)]
#[command(name = "permfs")]
#[command(about = "Per-user file namespace over a metadata store and an object store")]
#[command(version)]
pub struct Args {
    /// Address of a running daemon
    #[arg(
        long,
        global = true,
        env = "PERMFS_REMOTE",
        default_value = "http://localhost:3000"
    )]
    pub remote: Url,

    #[command(subcommand)]
    pub command: crate::Command,
}
