//! The image configuration document (`application/vnd.docker.container.image.v1+json`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The "run" defaults baked into an image: entrypoint, environment, working directory.
/// Both `Config::config` and `Config::container_config` use this shape; the two differ
/// only in which point of the build they were captured at, so one type serves both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigConfig {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Env")]
    pub env: Vec<String>,
    #[serde(rename = "Cmd")]
    pub cmd: Vec<String>,
    #[serde(rename = "Entrypoint")]
    pub entrypoint: Vec<String>,
    #[serde(rename = "WorkingDir")]
    pub working_dir: String,
    #[serde(rename = "ArgsEscaped")]
    pub args_escaped: bool,
    #[serde(rename = "AttachStdin")]
    pub attach_stdin: bool,
    #[serde(rename = "AttachStdout")]
    pub attach_stdout: bool,
    #[serde(rename = "AttachStderr")]
    pub attach_stderr: bool,
    #[serde(rename = "Tty")]
    pub tty: bool,
    #[serde(rename = "OpenStdin")]
    pub open_stdin: bool,
    #[serde(rename = "StdinOnce")]
    pub stdin_once: bool,
    #[serde(rename = "Labels")]
    pub labels: HashMap<String, String>,
}

impl Default for ConfigConfig {
    fn default() -> Self {
        let mut labels = HashMap::new();
        labels.insert(
            "com.ferroxide.version".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        ConfigConfig {
            user: "0:0".to_string(),
            env: vec![
                "PATH=/opt/conda/bin:/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin"
                    .to_string(),
            ],
            cmd: vec!["/bin/sh".to_string()],
            entrypoint: vec!["/bin/sh".to_string(), "-c".to_string()],
            working_dir: "/".to_string(),
            args_escaped: true,
            attach_stdin: false,
            attach_stdout: false,
            attach_stderr: false,
            tty: false,
            open_stdin: false,
            stdin_once: false,
            labels,
        }
    }
}

/// `rootfs.diff_ids`, base-first, parallel to [`super::manifest::ManifestV2::layers`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigRootFS {
    #[serde(rename = "type")]
    pub fs_type: String,
    pub diff_ids: Vec<String>,
}

impl Default for ConfigRootFS {
    fn default() -> Self {
        ConfigRootFS {
            fs_type: "layers".to_string(),
            diff_ids: Vec::new(),
        }
    }
}

/// One entry per layer. `created_by` is left unset: the build path that produces these
/// entries has no description of what each layer's content represents, and inventing one
/// would be misleading.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigHistory {
    pub created: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// The top-level image configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub architecture: String,
    pub os: String,
    pub config: ConfigConfig,
    pub container_config: ConfigConfig,
    pub created: String,
    pub docker_version: String,
    pub history: Vec<ConfigHistory>,
    pub rootfs: ConfigRootFS,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            architecture: "amd64".to_string(),
            os: "linux".to_string(),
            config: ConfigConfig::default(),
            container_config: ConfigConfig::default(),
            created: "1970-01-01T00:00:00Z".to_string(),
            docker_version: "18.09.7".to_string(),
            history: Vec::new(),
            rootfs: ConfigRootFS::default(),
        }
    }
}
