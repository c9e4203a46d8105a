//! `gcsfuse-mount-tool`: a diagnostic harness over the pure logic in
//! `gcsfuse-mount-core`. Parses, resolves, and conflict-checks Mount Spec
//! tokens the way the submission-side `OptionCallback` would, without ever
//! forking, dropping privileges, or touching the live `GCSFUSE_MOUNTS`
//! process environment — a read-only window onto what a real submission
//! would accept or reject.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info, LevelFilter};

use gcsfuse_mount_core::conflict;
use gcsfuse_mount_core::resolver::ResolvedMount;
use gcsfuse_mount_core::spec::MountSpec;

#[derive(Parser, Debug)]
#[command(version, about = "Inspect GCS FUSE mount spec tokens offline")]
struct Cli {
    /// Logging verbosity [OFF, ERROR, WARN, INFO, DEBUG, TRACE]
    #[arg(global = true, short, long, default_value_t = LevelFilter::Warn)]
    verbosity: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a single token and print its bucket/mount_point/flags fields.
    Parse { token: String },

    /// Parse and resolve a single token to an absolute mount point.
    Resolve {
        token: String,
        /// Directory to resolve relative mount points against; defaults to
        /// the tool's own current directory.
        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// Resolve every token in a `;`-joined list and report any conflicts,
    /// exactly as a submission-side accumulator would see them.
    Check {
        /// A single `;`-delimited mount list, as it would appear in
        /// `GCSFUSE_MOUNTS`.
        accumulator: String,
        #[arg(long)]
        cwd: Option<PathBuf>,
    },
}

fn setup_logging(verbosity: LevelFilter) {
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(verbosity)
        .init();
}

fn run(cli: &Cli) -> Result<(), anyhow::Error> {
    match &cli.command {
        Commands::Parse { token } => {
            let spec = MountSpec::parse(token)?;
            println!("bucket:      {:?}", spec.bucket);
            println!("mount_point: {}", spec.mount_point);
            println!("flags:       {:?}", spec.flags);
        }
        Commands::Resolve { token, cwd } => {
            let resolved = match cwd {
                Some(cwd) => ResolvedMount::resolve(token, cwd)?,
                None => ResolvedMount::resolve_cwd(token)?,
            };
            println!("bucket:      {:?}", resolved.bucket);
            println!("mount_point: {}", resolved.mount_point.display());
            println!("flags:       {:?}", resolved.flags);
        }
        Commands::Check { accumulator, cwd } => {
            let mut resolved = Vec::new();
            for token in accumulator.split(';') {
                if token.is_empty() {
                    continue;
                }
                resolved.push(match cwd {
                    Some(cwd) => ResolvedMount::resolve(token, cwd)?,
                    None => ResolvedMount::resolve_cwd(token)?,
                });
            }

            let conflicts = conflict::check_all(&resolved);
            if conflicts.is_empty() {
                info!("no conflicts among {} mount(s)", resolved.len());
                println!("OK: no conflicts among {} mount(s)", resolved.len());
            } else {
                for c in &conflicts {
                    println!("CONFLICT: {c}");
                }
                anyhow::bail!("{} conflict(s) found", conflicts.len());
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbosity);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("gcsfuse-mount-tool failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
