//! objcdump - Objective-C header reconstruction from runtime metadata.
//!
//! Generate class-dump style headers, dump matching entities, or map
//! addresses to functions.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use objcdump::a2f::{parse_address, AddressLookup};
use objcdump::provider::collect_binaries;
use objcdump::{
    CacheDump, DependencyMode, Dumper, HeaderGenerator, HeaderOptions, ImageProvider, MachODump,
    ObjcMetadata,
};

/// Objective-C header reconstruction from runtime metadata.
#[derive(Parser, Debug)]
#[command(name = "objcdump")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate one header per class, protocol and category
    Headers {
        /// Metadata dump of the binary
        binary: PathBuf,

        /// Cache dump used for Foundation suppression and dependencies
        #[arg(short, long)]
        cache: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "headers")]
        output: PathBuf,

        /// Module name for binaries without an install name
        #[arg(short, long)]
        name: Option<String>,

        /// Also generate headers for imported private frameworks
        #[arg(short, long)]
        deps: bool,

        /// Also generate headers for every imported library
        #[arg(long, conflicts_with = "deps")]
        all_deps: bool,

        /// Verbosity level (0=quiet, 1=warnings, 2=info, 3=debug)
        #[arg(short, long, default_value = "1")]
        verbosity: u8,

        /// Number of parallel jobs (default: number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Print classes, protocols or categories matching a pattern
    Dump {
        /// Metadata dump of the binary
        binary: PathBuf,

        /// Cache dump used to resolve dependencies
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Class name pattern (regex)
        #[arg(long)]
        class: Option<String>,

        /// Protocol name pattern (regex)
        #[arg(long)]
        protocol: Option<String>,

        /// Category name pattern (regex)
        #[arg(long)]
        category: Option<String>,

        /// Include every imported library
        #[arg(short, long)]
        deps: bool,

        /// Also list protocol, class, super and selector references
        #[arg(long)]
        refs: bool,

        /// Verbosity level (0=quiet, 1=warnings, 2=info, 3=debug)
        #[arg(short, long, default_value = "1")]
        verbosity: u8,
    },

    /// Map addresses to the functions containing them
    A2f {
        /// Cache dump
        cache: PathBuf,

        /// Address to lookup (hex, e.g., 0x180000000)
        address: Option<String>,

        /// File of newline-delimited addresses
        #[arg(short, long, conflicts_with = "address")]
        input: Option<PathBuf>,

        /// Slide to subtract from every address
        #[arg(short, long)]
        slide: Option<String>,

        /// Write batch results as JSON to this file instead of stdout
        #[arg(short, long, requires = "input")]
        output: Option<PathBuf>,

        /// Verbosity level (0=quiet, 1=warnings, 2=info, 3=debug)
        #[arg(short, long, default_value = "1")]
        verbosity: u8,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Headers {
            binary,
            cache,
            output,
            name,
            deps,
            all_deps,
            verbosity,
            jobs,
        } => {
            setup_logging(verbosity);
            let mode = match (deps, all_deps) {
                (_, true) => DependencyMode::All,
                (true, false) => DependencyMode::Private,
                (false, false) => DependencyMode::None,
            };
            cmd_headers(binary, cache, output, name, mode, jobs)
        }
        Commands::Dump {
            binary,
            cache,
            class,
            protocol,
            category,
            deps,
            refs,
            verbosity,
        } => {
            setup_logging(verbosity);
            cmd_dump(binary, cache, class, protocol, category, deps, refs)
        }
        Commands::A2f {
            cache,
            address,
            input,
            slide,
            output,
            verbosity,
        } => {
            setup_logging(verbosity);
            cmd_a2f(cache, address, input, slide, output)
        }
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        _ => Level::DEBUG,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .finish();

    tracing::subscriber::set_global_default(subscriber).ok();
}

fn open_binary(path: &Path) -> Result<Arc<dyn ObjcMetadata>> {
    let dump = MachODump::open(path)
        .with_context(|| format!("Failed to open binary dump: {}", path.display()))?;
    Ok(Arc::new(dump))
}

fn open_cache(path: Option<PathBuf>) -> Result<Option<Arc<CacheDump>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let cache = CacheDump::open(&path)
        .with_context(|| format!("Failed to open cache dump: {}", path.display()))?;
    info!("Loaded {} images from {}", cache.image_count(), path.display());
    Ok(Some(Arc::new(cache)))
}

fn cmd_headers(
    binary: PathBuf,
    cache: Option<PathBuf>,
    output: PathBuf,
    name: Option<String>,
    mode: DependencyMode,
    jobs: Option<usize>,
) -> Result<()> {
    let start = Instant::now();
    let primary = open_binary(&binary)?;
    let images = open_cache(cache)?.map(|c| c as Arc<dyn ImageProvider>);

    if let Some(n) = jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .ok();
    }

    let options = HeaderOptions {
        output,
        name: name.unwrap_or_default(),
        dependencies: mode,
        parallel: true,
        ..Default::default()
    };
    let generator =
        HeaderGenerator::new(options, images).context("Failed to build Foundation index")?;
    let binaries = generator
        .binaries(primary)
        .context("Failed to collect binaries")?;

    let progress = ProgressBar::new(binaries.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        )?
        .progress_chars("#>-"),
    );

    let mut written = 0;
    for binary in &binaries {
        let report = generator
            .generate_binary(binary.as_ref())
            .with_context(|| format!("Failed to generate headers for {}", binary.path()))?;
        if let Some(report) = report {
            written += report.headers.len();
            info!("{}: {} headers", report.name, report.headers.len());
        }
        progress.inc(1);
    }
    progress.finish_with_message("Done");

    info!(
        "Wrote {} headers for {} binaries in {:.2}s",
        written,
        binaries.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn cmd_dump(
    binary: PathBuf,
    cache: Option<PathBuf>,
    class: Option<String>,
    protocol: Option<String>,
    category: Option<String>,
    deps: bool,
    refs: bool,
) -> Result<()> {
    let primary = open_binary(&binary)?;
    let cache = open_cache(cache)?;
    let mode = if deps {
        DependencyMode::All
    } else {
        DependencyMode::None
    };
    let binaries = collect_binaries(
        primary,
        cache.as_deref().map(|c| c as &dyn ImageProvider),
        mode,
    )?;
    let dumper = Dumper::new(binaries);

    let everything = class.is_none() && protocol.is_none() && category.is_none();
    let all = || Some(".*".to_string());
    let class = if everything { all() } else { class };
    let protocol = if everything { all() } else { protocol };
    let category = if everything { all() } else { category };

    let mut blocks = Vec::new();
    if let Some(pattern) = class {
        blocks.extend(dumper.classes(&pattern)?);
    }
    if let Some(pattern) = protocol {
        blocks.extend(dumper.protocols(&pattern)?);
    }
    if let Some(pattern) = category {
        blocks.extend(dumper.categories(&pattern)?);
    }
    if refs {
        blocks.extend(dumper.references()?);
    }

    if blocks.is_empty() {
        warn!("No matching entities");
    }
    for block in blocks {
        println!("{block}");
    }
    Ok(())
}

fn cmd_a2f(
    cache: PathBuf,
    address: Option<String>,
    input: Option<PathBuf>,
    slide: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let cache = CacheDump::open(&cache)
        .with_context(|| format!("Failed to open cache dump: {}", cache.display()))?;
    let slide = match slide {
        Some(s) => parse_address(&s)?,
        None => 0,
    };
    let lookup = AddressLookup::new(&cache).with_slide(slide);

    if let Some(input) = input {
        let file = File::open(&input)
            .with_context(|| format!("Failed to open address list: {}", input.display()))?;
        let found = lookup.lookup_batch(BufReader::new(file))?;
        let json = serde_json::to_string_pretty(&found)?;
        match output {
            Some(path) => {
                fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Wrote {} lookups to {}", found.len(), path.display());
            }
            None => println!("{json}"),
        }
        return Ok(());
    }

    let Some(address) = address else {
        bail!("Either an address or --input is required");
    };
    let addr = parse_address(&address)?;
    match lookup.lookup(addr)? {
        Some(found) => println!("{}", found.describe(addr)),
        None => warn!("{:#x} is not in any known function", addr),
    }
    Ok(())
}
