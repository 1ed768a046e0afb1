//! Block Device Inventory CLI
//!
//! Lists the block devices of this host from sysfs, optionally with the
//! filesystem attributes blkid reports for each.
//!
//! ```text
//! blockdev-inventory list [NAMES...] [--sort-size] [--category C] [--attributes] [--json]
//! blockdev-inventory paths [NAMES...] [--sort-size]
//! blockdev-inventory probe NAME [--json]
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use blockdev_inventory::hardware::local_hostname;
use blockdev_inventory::{
    AttributeSource, Attributes, Blkid, BlkidConfig, BlockDevice, DeviceCategory,
    DeviceRegistry, Devices, Error, InventoryReport, RegistryConfig, Result,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Block device inventory from sysfs and blkid
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sysfs block root
    #[arg(long, env = "SYSFS_BLOCK_ROOT", default_value = "/sys/block", global = true)]
    sysfs_root: PathBuf,

    /// blkid program
    #[arg(long, env = "BLKID_PATH", default_value = "blkid", global = true)]
    blkid: PathBuf,

    /// Timeout for each blkid run, in seconds
    #[arg(long, env = "PROBE_TIMEOUT_SECS", default_value = "10", global = true)]
    probe_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List devices with size and category
    List {
        /// Devices to list instead of every device (e.g. sda, /dev/md0)
        names: Vec<String>,

        /// Order by size, smallest first
        #[arg(long)]
        sort_size: bool,

        /// Only devices of this category (unknown, disk, raid, device-mapper)
        #[arg(long)]
        category: Option<DeviceCategory>,

        /// Also look up filesystem attributes with blkid
        #[arg(long)]
        attributes: bool,

        /// Print a JSON inventory report
        #[arg(long)]
        json: bool,
    },

    /// Print device node paths on one line
    Paths {
        /// Devices to print instead of every device
        names: Vec<String>,

        /// Order by size, smallest first
        #[arg(long)]
        sort_size: bool,
    },

    /// Print the filesystem attributes of one device
    Probe {
        /// Device name or path
        name: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    debug!("Version: {}", blockdev_inventory::VERSION);
    debug!("Sysfs root: {}", args.sysfs_root.display());

    let registry = DeviceRegistry::new(RegistryConfig {
        sysfs_block_root: args.sysfs_root.clone(),
    });

    let prober = Prober::new(BlkidConfig {
        program: args.blkid.clone(),
        timeout: Some(Duration::from_secs(args.probe_timeout_secs)),
    });

    match args.command {
        Commands::List {
            names,
            sort_size,
            category,
            attributes,
            json,
        } => {
            let mut devices = discover(&registry, &names)?;
            if let Some(category) = category {
                devices = devices.with_category(category);
            }
            if sort_size {
                devices.sort_by_size();
            }

            let attrs = if attributes {
                prober.lookup_all(&devices).await?
            } else {
                Vec::new()
            };

            if json {
                let report = InventoryReport::with_attributes(local_hostname(), &devices, attrs);
                print_json(&report)?;
            } else {
                print_table(&devices, attributes.then_some(attrs.as_slice()));
            }
        }

        Commands::Paths { names, sort_size } => {
            let mut devices = discover(&registry, &names)?;
            if sort_size {
                devices.sort_by_size();
            }
            println!("{}", devices);
        }

        Commands::Probe { name, json } => {
            // blkid takes any node, including ones with no /sys/block entry
            let attrs = prober.lookup(name).await?;

            if json {
                print_json(&attrs)?;
            } else {
                print_export(&attrs);
            }
        }
    }

    Ok(())
}

fn discover(registry: &DeviceRegistry, names: &[String]) -> Result<Devices> {
    let devices = if names.is_empty() {
        registry.discover_all()?
    } else {
        registry.discover_from_names(names)?
    };

    info!("Discovered {} block devices", devices.len());
    Ok(devices)
}

// =============================================================================
// Attribute Lookup
// =============================================================================

/// Runs attribute lookups on the blocking pool
///
/// The deadline is enforced by [`Blkid`], which kills a blkid that overruns
/// it, so no blocking task outlives its lookup.
#[derive(Clone)]
struct Prober {
    source: Arc<dyn AttributeSource>,
}

impl Prober {
    fn new(config: BlkidConfig) -> Self {
        Self {
            source: Arc::new(Blkid::new(config)),
        }
    }

    async fn lookup<D>(&self, device: D) -> Result<Attributes>
    where
        D: BlockDevice + Send + 'static,
    {
        let device_path = device.device_path();
        let source = self.source.clone();

        tokio::task::spawn_blocking(move || source.lookup(&device))
            .await
            .map_err(|e| {
                Error::Internal(format!("Lookup task for {} failed: {}", device_path, e))
            })?
    }

    /// Look up every device concurrently, results in collection order
    ///
    /// A device blkid cannot identify gets no attributes rather than failing
    /// the listing.
    async fn lookup_all(&self, devices: &Devices) -> Result<Vec<Option<Attributes>>> {
        let handles: Vec<_> = devices
            .iter()
            .cloned()
            .map(|device| {
                let prober = self.clone();
                tokio::spawn(async move { prober.lookup(device).await })
            })
            .collect();

        let mut attrs = Vec::with_capacity(handles.len());
        for (device, handle) in devices.iter().zip(handles) {
            let result = handle
                .await
                .map_err(|e| Error::Internal(format!("Lookup task failed: {}", e)))?;

            match result {
                Ok(a) => attrs.push(Some(a)),
                Err(e) => {
                    warn!("No attributes for {}: {}", device, e);
                    attrs.push(None);
                }
            }
        }

        Ok(attrs)
    }
}

// =============================================================================
// Output
// =============================================================================

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Internal(format!("JSON encoding failed: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn print_table(devices: &Devices, attrs: Option<&[Option<Attributes>]>) {
    let field = |v: &Option<String>| match v.as_deref() {
        Some("") | None => "-".to_string(),
        Some(v) => v.to_string(),
    };

    match attrs {
        Some(_) => println!(
            "{:<12} {:>16} {:<14} {:<38} {:<10} {}",
            "NAME", "SIZE", "CATEGORY", "UUID", "TYPE", "LABEL"
        ),
        None => println!("{:<12} {:>16} {}", "NAME", "SIZE", "CATEGORY"),
    }

    for (i, device) in devices.iter().enumerate() {
        match attrs {
            Some(attrs) => {
                let a = attrs.get(i).cloned().flatten().unwrap_or_default();
                println!(
                    "{:<12} {:>16} {:<14} {:<38} {:<10} {}",
                    device.name(),
                    device.size(),
                    device.category(),
                    field(&a.uuid),
                    field(&a.fs_type),
                    field(&a.label),
                );
            }
            None => println!(
                "{:<12} {:>16} {}",
                device.name(),
                device.size(),
                device.category()
            ),
        }
    }
}

fn print_export(attrs: &Attributes) {
    let fields = [
        ("UUID", &attrs.uuid),
        ("TYPE", &attrs.fs_type),
        ("LABEL", &attrs.label),
    ];

    for (key, value) in fields {
        if let Some(value) = value {
            println!("{}={}", key, value);
        }
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout carries the inventory, logs go to stderr
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
