//! Command-line and environment configuration for the plugin process.
//!
//! Every flag has an environment fallback so the binary can be configured
//! from a pod spec without rewriting its arguments:
//! - `CSI_ENDPOINT`: Unix socket to listen on. Defaults to `/csi/csi.sock`.
//! - `CSI_DATADIR`: parent of volumes first seen by publish. Defaults to `/csi-data-dir`.
//! - `CSI_VOLUME_ROOT`: parent of created volumes. Defaults to `/csi`.
//! - `CSI_DRIVER_NAME`: name reported to the orchestrator.
//! - `CSI_NODE_ID`: node identity. A random UUID when unset.
//! - `CSI_STRICT_PUBLISH`: set to `true` to require attach and stage before publish.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use libcsi::DriverConfig;
use libcsi::backend::hostpath::{DEFAULT_DATA_DIR, DEFAULT_DRIVER_NAME, DEFAULT_VOLUME_ROOT};

pub const DEFAULT_ENDPOINT: &str = "/csi/csi.sock";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Host-path CSI plugin.
#[derive(Parser, Debug)]
#[command(name = "rkcsi", version)]
pub struct Args {
    /// Unix socket the plugin listens on.
    #[arg(long, env = "CSI_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: PathBuf,

    #[arg(long, env = "CSI_DATADIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    #[arg(long, env = "CSI_VOLUME_ROOT", default_value = DEFAULT_VOLUME_ROOT)]
    pub volume_root: PathBuf,

    #[arg(long, env = "CSI_DRIVER_NAME", default_value = DEFAULT_DRIVER_NAME)]
    pub driver_name: String,

    /// Node identity; a random UUID is generated when omitted.
    #[arg(long, env = "CSI_NODE_ID")]
    pub node_id: Option<String>,

    #[arg(long, env = "CSI_STRICT_PUBLISH")]
    pub strict_publish: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// Build the driver configuration, generating a node id if none was given.
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            driver_name: self.driver_name.clone(),
            node_id: self
                .node_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            volume_root: self.volume_root.clone(),
            data_dir: self.data_dir.clone(),
            strict_publish: self.strict_publish,
        }
    }
}
