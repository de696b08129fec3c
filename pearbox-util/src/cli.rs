use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pearbox-util")]
#[command(about = "PearPC disk image and configuration utility", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new hard-disk image
    Create {
        /// Disk size in megabytes
        #[arg(value_name = "SIZE_MB")]
        size_mb: u64,

        /// Path of the image to create (must not exist)
        #[arg(value_name = "IMAGE_FILE")]
        path: PathBuf,

        /// Create a sparse image instead of a flat one
        #[arg(short, long)]
        sparse: bool,

        /// Sparse page size in bytes
        #[arg(long, value_name = "BYTES", requires = "sparse")]
        page_size: Option<u32>,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Display information about a disk image
    Info {
        /// Path to the image file
        #[arg(value_name = "IMAGE_FILE")]
        path: PathBuf,
    },

    /// Work with PearPC configuration files
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Load a configuration file and print it with defaults filled in
    Show {
        /// Path to the configuration file
        #[arg(value_name = "CONFIG_FILE")]
        path: PathBuf,
    },

    /// Write a configuration file with default settings
    Init {
        /// Path to the configuration file
        #[arg(value_name = "CONFIG_FILE")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
