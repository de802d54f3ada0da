//! Server settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `KARMADA_MCP_*` environment variables, then CLI flags.
//! Nested keys use a double underscore (`KARMADA_MCP_SSE__ADDR`).

use crate::lifecycle::DEFAULT_SHUTDOWN_GRACE;
use crate::tools::DEFAULT_TOOLSETS;
use crate::transport::sse::{DEFAULT_ADDR, DEFAULT_BASE_PATH, DEFAULT_KEEP_ALIVE};
use config::{Config, ConfigError, Environment, File, FileFormat};
use kmcp_client::ClientSettings;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "KARMADA_MCP";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_toolsets")]
    pub toolsets: Vec<String>,
    pub read_only: bool,
    pub log_level: String,
    pub shutdown_grace_secs: u64,
    #[serde(default)]
    pub karmada: KarmadaSettings,
    pub sse: SseSettings,
}

fn default_toolsets() -> Vec<String> {
    DEFAULT_TOOLSETS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct KarmadaSettings {
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub skip_tls_verify: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SseSettings {
    pub addr: String,
    pub base_path: String,
    pub keep_alive_secs: u64,
}

/// Values given explicitly on the command line. `None`/`false` leaves
/// lower layers untouched.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub toolsets: Option<Vec<String>>,
    pub read_only: bool,
    pub log_level: Option<String>,
    pub shutdown_grace_secs: Option<u64>,
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub skip_tls_verify: bool,
    pub sse_addr: Option<String>,
    pub sse_base_path: Option<String>,
    pub sse_keep_alive_secs: Option<u64>,
}

impl Settings {
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::load_with_env(file, overrides, None)
    }

    /// `env` replaces the process environment; used by tests
    pub fn load_with_env(
        file: Option<&Path>,
        overrides: &Overrides,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("read_only", false)?
            .set_default("log_level", "info")?
            .set_default("shutdown_grace_secs", DEFAULT_SHUTDOWN_GRACE.as_secs())?
            .set_default("karmada.skip_tls_verify", false)?
            .set_default("sse.addr", DEFAULT_ADDR)?
            .set_default("sse.base_path", DEFAULT_BASE_PATH)?
            .set_default("sse.keep_alive_secs", DEFAULT_KEEP_ALIVE.as_secs())?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("toolsets")
                .try_parsing(true)
                .source(env),
        );

        let s = builder
            .set_override_option("toolsets", overrides.toolsets.clone())?
            .set_override_option("read_only", overrides.read_only.then_some(true))?
            .set_override_option("log_level", overrides.log_level.clone())?
            .set_override_option("shutdown_grace_secs", overrides.shutdown_grace_secs)?
            .set_override_option(
                "karmada.kubeconfig",
                overrides
                    .kubeconfig
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option("karmada.context", overrides.context.clone())?
            .set_override_option(
                "karmada.skip_tls_verify",
                overrides.skip_tls_verify.then_some(true),
            )?
            .set_override_option("sse.addr", overrides.sse_addr.clone())?
            .set_override_option("sse.base_path", overrides.sse_base_path.clone())?
            .set_override_option("sse.keep_alive_secs", overrides.sse_keep_alive_secs)?
            .build()?;
        s.try_deserialize()
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            kubeconfig: self.karmada.kubeconfig.clone(),
            context: self.karmada.context.clone(),
            skip_tls_verify: self.karmada.skip_tls_verify,
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.sse.keep_alive_secs)
    }
}
