use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for dicompack
#[derive(Parser, Debug)]
#[command(name = "dicompack")]
#[command(about = "Sort DICOM trees into acquisition directories and package them")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sort all DICOM files in a directory tree
    Sort {
        /// Input path of unsorted data
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Output path for sorted data
        #[arg(value_name = "SORT_PATH")]
        sort_path: PathBuf,
    },

    /// Compress a sorted directory tree of DICOM acquisitions
    Tar {
        /// Input path of sorted data
        #[arg(value_name = "SORT_PATH")]
        sort_path: PathBuf,

        /// Output path for compressed archives
        #[arg(value_name = "TAR_PATH")]
        tar_path: PathBuf,

        /// Replace existing archives
        #[arg(short, long)]
        force: bool,
    },

    /// Sort a directory tree and compress the result
    Tarsort {
        /// Input path of unsorted data
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Output path for sorted data
        #[arg(value_name = "SORT_PATH")]
        sort_path: PathBuf,

        /// Output path for compressed archives
        #[arg(value_name = "TAR_PATH")]
        tar_path: PathBuf,

        /// Replace existing archives
        #[arg(short, long)]
        force: bool,
    },

    /// Repackage existing acquisition archives with fresh metadata
    Repackage {
        /// A .tgz archive, or a directory whose .tgz archives are all
        /// repackaged
        #[arg(value_name = "TARGET")]
        target: PathBuf,

        /// Output directory, created if it does not exist
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Group name to route data into
        #[arg(short, long)]
        group: Option<String>,

        /// Project name to route data into
        #[arg(short, long)]
        project: Option<String>,

        /// Replace existing archives
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_args_parse() {
        let cli = Cli::parse_from(["dicompack", "sort", "/in", "/out"]);
        match cli.command {
            Command::Sort { path, sort_path } => {
                assert_eq!(path, PathBuf::from("/in"));
                assert_eq!(sort_path, PathBuf::from("/out"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_repackage_defaults() {
        let cli = Cli::parse_from(["dicompack", "repackage", "bundle.tgz", "-g", "neuro"]);
        match cli.command {
            Command::Repackage {
                target,
                output_dir,
                group,
                project,
                force,
            } => {
                assert_eq!(target, PathBuf::from("bundle.tgz"));
                assert_eq!(output_dir, None);
                assert_eq!(group.as_deref(), Some("neuro"));
                assert_eq!(project, None);
                assert!(!force);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
