mod cli;

use clap::Parser;
use cli::{Cli, Command, ConfigCommand};
use pearbox_config::VmConfig;
use pearbox_image::{DEFAULT_PAGE_SIZE, ImageFormat, ImageInfo, SECTOR_SIZE};
use pearbox_util::{ConsoleProgress, ImageCreator, SilentProgress};
use snafu::{ResultExt, Snafu, ensure};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Top-level application errors for pearbox-util.
#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to create image '{}'", path.display()))]
    CreateImage {
        path: PathBuf,
        source: pearbox_util::CreatorError,
    },

    #[snafu(display("failed to inspect image"))]
    InspectImage {
        source: pearbox_image::InspectError,
    },

    #[snafu(display("failed to load configuration"))]
    LoadConfig { source: pearbox_config::LoadError },

    #[snafu(display("failed to save configuration"))]
    SaveConfig { source: pearbox_config::SaveError },

    #[snafu(display("'{}' already exists (use --force to overwrite)", path.display()))]
    ConfigExists { path: PathBuf },
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[snafu::report]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Create {
            size_mb,
            path,
            sparse,
            page_size,
            quiet,
        } => {
            let format = match (sparse, page_size) {
                (true, Some(page_size)) => ImageFormat::Sparse { page_size },
                _ => ImageFormat::from_sparse_flag(sparse),
            };

            cmd_create(size_mb, &path, format, quiet)
        }
        Command::Info { path } => cmd_info(&path),
        Command::Config { command } => match command {
            ConfigCommand::Show { path } => cmd_config_show(&path),
            ConfigCommand::Init { path, force } => cmd_config_init(&path, force),
        },
    }
}

fn cmd_create(size_mb: u64, path: &Path, format: ImageFormat, quiet: bool) -> Result<()> {
    // Create based on verbosity.
    let geometry = if quiet {
        let creator = ImageCreator::new(format, SilentProgress);
        creator.create(size_mb, path).context(CreateImageSnafu { path })?
    } else {
        let creator = ImageCreator::new(format, ConsoleProgress::new());
        creator.create(size_mb, path).context(CreateImageSnafu { path })?
    };

    if !quiet {
        println!(
            "Disk image '{}' created with size {} MB ({}, {}).",
            path.display(),
            size_mb,
            geometry,
            format
        );
    }

    Ok(())
}

fn cmd_info(path: &Path) -> Result<()> {
    let info = pearbox_image::inspect_image(path).context(InspectImageSnafu)?;

    println!("Image: {}", path.display());
    println!();

    match info {
        ImageInfo::Flat { size, sectors } => {
            println!("Format:          flat");
            println!("File Size:       {} bytes", size);
            println!("Sectors:         {}", sectors);
            if size % SECTOR_SIZE != 0 {
                println!("Warning:         size is not a whole number of sectors");
            }
        }
        ImageInfo::Sparse {
            header,
            allocated_pages,
            data_offset,
        } => {
            println!("Format:          sparse (version {})", header.version());
            println!("Disk Size:       {} bytes", header.disk_size());
            println!("Sectors:         {}", header.disk_size() / SECTOR_SIZE);
            println!(
                "Page Size:       {} bytes{}",
                header.page_size(),
                if header.page_size() == DEFAULT_PAGE_SIZE {
                    " (default)"
                } else {
                    ""
                }
            );
            println!("Page Count:      {}", header.page_count());
            println!("Allocated Pages: {}", allocated_pages);
            println!("Data Offset:     0x{:X}", data_offset);
        }
    }

    Ok(())
}

fn cmd_config_show(path: &Path) -> Result<()> {
    let config = VmConfig::load(path).context(LoadConfigSnafu)?;

    print!("{}", config.to_config_string());

    Ok(())
}

fn cmd_config_init(path: &Path, force: bool) -> Result<()> {
    ensure!(force || !path.exists(), ConfigExistsSnafu { path });

    VmConfig::default().save(path).context(SaveConfigSnafu)?;

    println!("Wrote default configuration to {}.", path.display());

    Ok(())
}
