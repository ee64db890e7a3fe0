//! ls-tool CLI Application
//!
//! Builds local snapshot databases, merges spent addresses and moves
//! snapshots in and out of interchange files.

use clap::{Args, Parser, Subcommand};
use ls_tool::cli;
use ls_tool::codec::FormatVersion;
use ls_tool::config::{
    BuildConfig, ExportConfig, IngestConfig, MergeConfig, SnapshotFiles, StoreConfig,
};
use ls_tool::filter::DEFAULT_FILTER_CAPACITY;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ls-tool")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Local snapshot database and export file tool", long_about = None)]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. "debug" or "ls_tool=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SnapshotFileArgs {
    /// Path to the local snapshot meta file
    #[arg(long, default_value = "./mainnet.snapshot.meta")]
    ls_meta_file: PathBuf,

    /// Path to the local snapshot state file
    #[arg(long, default_value = "./mainnet.snapshot.state")]
    ls_state_file: PathBuf,
}

impl SnapshotFileArgs {
    fn into_files(self) -> SnapshotFiles {
        SnapshotFiles {
            meta: self.ls_meta_file,
            state: self.ls_state_file,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the local snapshot database from a node's files
    Build {
        /// Local snapshot database directory
        #[arg(long, default_value = "./localsnapshots-db")]
        ls_db_dir: PathBuf,

        /// Spent addresses database directory to ingest
        #[arg(long, default_value = "./spent-addresses-db")]
        spent_addresses_db_dir: PathBuf,

        #[command(flatten)]
        files: SnapshotFileArgs,

        /// Keys buffered between reader and writer (0 = unbuffered)
        #[arg(long, default_value = "1024")]
        channel_capacity: usize,
    },

    /// Print a summary of the plaintext snapshot files
    Info {
        #[command(flatten)]
        files: SnapshotFileArgs,
    },

    /// Merge spent addresses databases and .txt lists into one database
    Merge {
        /// Sources, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        sources: Vec<PathBuf>,

        /// Target database directory
        #[arg(long, default_value = "./merged-spent-addresses-db")]
        target: PathBuf,
    },

    /// Write an export file from the local snapshot database
    Export {
        /// Local snapshot database directory
        #[arg(long, default_value = "./localsnapshots-db")]
        ls_db_dir: PathBuf,

        /// Export file to write
        #[arg(long, default_value = "export.bin")]
        file: PathBuf,

        /// File format: gzipped (version 2) or checksummed (version 3)
        #[arg(long, default_value_t = FormatVersion::CURRENT)]
        format: FormatVersion,

        /// Leave spent addresses out of the file
        #[arg(long)]
        omit_spent_addresses: bool,

        /// Maximum spent addresses the cuckoo filter is sized for
        #[arg(long, default_value_t = DEFAULT_FILTER_CAPACITY)]
        cuckoo_filter_capacity: usize,
    },

    /// Verify an export file and print its contents
    ExportInfo {
        /// Export file to read
        #[arg(long, default_value = "export.bin")]
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Restore an export file into a local snapshot database
    Import {
        /// Export file to read
        #[arg(long, default_value = "export.bin")]
        file: PathBuf,

        /// Local snapshot database directory
        #[arg(long, default_value = "./localsnapshots-db")]
        ls_db_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger
    let env = env_logger::Env::default().default_filter_or("info");
    let mut logger = env_logger::Builder::from_env(env);
    if let Some(level) = &cli.log_level {
        logger.parse_filters(level);
    }
    logger.init();

    match cli.command {
        Commands::Build {
            ls_db_dir,
            spent_addresses_db_dir,
            files,
            channel_capacity,
        } => {
            let config = BuildConfig {
                ls_db_dir,
                spent_addresses_db_dir,
                files: files.into_files(),
                ingest: IngestConfig { channel_capacity },
                store: StoreConfig::default(),
            };
            cli::cmd_build(&config)?;
        }

        Commands::Info { files } => {
            cli::cmd_info(&files.into_files())?;
        }

        Commands::Merge { sources, target } => {
            let config = MergeConfig {
                sources,
                target,
                ..MergeConfig::default()
            };
            cli::cmd_merge(&config)?;
        }

        Commands::Export {
            ls_db_dir,
            file,
            format,
            omit_spent_addresses,
            cuckoo_filter_capacity,
        } => {
            let config = ExportConfig {
                ls_db_dir,
                file,
                format,
                omit_spent_addresses,
                filter_capacity: cuckoo_filter_capacity,
                store: StoreConfig::default(),
            };
            cli::cmd_export(&config)?;
        }

        Commands::ExportInfo { file, json } => {
            cli::cmd_export_info(&file, json)?;
        }

        Commands::Import { file, ls_db_dir } => {
            let config = ExportConfig {
                ls_db_dir,
                ..ExportConfig::default()
            };
            cli::cmd_import(&file, &config)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_defaults_parse() {
        let cli = Cli::try_parse_from(["ls-tool", "export"]).unwrap();
        match cli.command {
            Commands::Export {
                format,
                cuckoo_filter_capacity,
                omit_spent_addresses,
                ..
            } => {
                assert_eq!(format, FormatVersion::Checksummed);
                assert_eq!(cuckoo_filter_capacity, DEFAULT_FILTER_CAPACITY);
                assert!(!omit_spent_addresses);
            }
            _ => panic!("expected the export command"),
        }
    }

    #[test]
    fn test_export_format_flag() {
        let cli = Cli::try_parse_from(["ls-tool", "export", "--format", "gzipped"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Export {
                format: FormatVersion::Gzipped,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["ls-tool", "export", "--format", "zip"]).is_err());
    }

    #[test]
    fn test_merge_sources_split_on_commas() {
        let cli = Cli::try_parse_from(["ls-tool", "merge", "--sources", "a,b.txt"]).unwrap();
        match cli.command {
            Commands::Merge { sources, target } => {
                assert_eq!(sources, vec![PathBuf::from("a"), PathBuf::from("b.txt")]);
                assert_eq!(target, PathBuf::from("./merged-spent-addresses-db"));
            }
            _ => panic!("expected the merge command"),
        }
    }

    #[test]
    fn test_all_defaults_parse() {
        for args in [
            vec!["ls-tool", "build"],
            vec!["ls-tool", "info"],
            vec!["ls-tool", "export-info", "--json"],
            vec!["ls-tool", "import"],
        ] {
            assert!(Cli::try_parse_from(args).is_ok());
        }
    }
}
