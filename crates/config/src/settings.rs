use crate::APP_NAME;
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use imgbatch_pipeline::DEFAULT_KEY_TEMPLATE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const ENV_PREFIX: &str = "IMGBATCH_";

/// Deployment settings, as opposed to the per-batch [`crate::Input`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base directory for everything stored locally.
    pub data_dir: PathBuf,
    pub storage: StorageSettings,
    pub dataset: DatasetSettings,
    pub http: HttpSettings,
    /// upon template for output keys. `index` and `timestamp` are available.
    pub key_template: String,
    /// Upper bound on the transform and store phases of each item.
    pub phase_timeout_secs: Option<u64>,
    /// Process everything but write nothing.
    pub dry_run: bool,
}

/// Where key-value stores live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Directories under `storage.root`.
    #[default]
    Local,
    /// Prefixes of the bucket in `storage.s3`.
    S3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StoreBackend,
    /// Defaults to `{data_dir}/key_value_stores`.
    pub root: Option<PathBuf>,
    /// Required when `backend` is `s3`.
    pub s3: Option<S3Settings>,
    pub public_base_url: Option<String>,
    /// Store used when the input names no output store.
    pub default_store: String,
}

/// Bucket and credentials for S3-compatible storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Settings {
    pub bucket: String,
    #[serde(default)]
    pub prefix: Option<String>,
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub key_id: String,
    pub key_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// Defaults to `{data_dir}/datasets/{name}.sqlite`.
    pub path: Option<PathBuf>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(format!("./{APP_NAME}-data")));
        Self {
            data_dir,
            storage: StorageSettings::default(),
            dataset: DatasetSettings::default(),
            http: HttpSettings::default(),
            key_template: DEFAULT_KEY_TEMPLATE.to_string(),
            phase_timeout_secs: None,
            dry_run: false,
        }
    }
}
impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Local,
            root: None,
            s3: None,
            public_base_url: None,
            default_store: "default".to_string(),
        }
    }
}
impl Default for DatasetSettings {
    fn default() -> Self {
        Self { path: None, name: "default".to_string() }
    }
}
impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout_secs: 30, retries: 2 }
    }
}

impl Settings {
    /// Layer defaults, a config file and `IMGBATCH_*` environment variables.
    ///
    /// An explicit `config_path` must exist. Without one, the first of
    /// `imgbatch.toml`, `imgbatch.yaml` and `imgbatch.json` found in the
    /// platform config directory is used, if any. Nested keys are set from the
    /// environment with a double underscore: `IMGBATCH_HTTP__RETRIES=5`.
    pub fn figment(config_path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        match config_path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::MissingFile(path.display().to_string())),
            Some(path) => figment = merge_file(figment, path),
            None => {
                if let Some(path) = default_config_file() {
                    tracing::debug!(path = %path.display(), "Using configuration file");
                    figment = merge_file(figment, &path);
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        figment.extract().map_err(|e| ErrorKind::Invalid(e.to_string()).into())
    }

    /// Shorthand for [`Settings::figment`] then [`Settings::from_figment`].
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(config_path)?)
    }

    pub fn store_root(&self) -> PathBuf {
        match &self.storage.root {
            Some(root) => root.clone(),
            None => self.data_dir.join("key_value_stores"),
        }
    }

    /// Bucket settings, when stores are kept in S3.
    pub fn s3(&self) -> Result<Option<&S3Settings>> {
        match (self.storage.backend, &self.storage.s3) {
            (StoreBackend::Local, _) => Ok(None),
            (StoreBackend::S3, Some(s3)) => Ok(Some(s3)),
            (StoreBackend::S3, None) => {
                exn::bail!(ErrorKind::Invalid("storage.s3 is required for the s3 backend".to_string()))
            },
        }
    }

    pub fn dataset_path(&self) -> PathBuf {
        match &self.dataset.path {
            Some(path) => path.clone(),
            None => self.data_dir.join("datasets").join(format!("{}.sqlite", self.dataset.name)),
        }
    }

    pub fn public_base_url(&self) -> Result<Option<Url>> {
        let Some(raw) = self.storage.public_base_url.as_deref().filter(|raw| !raw.is_empty()) else {
            return Ok(None);
        };
        let url = Url::parse(raw).map_err(|e| ErrorKind::Invalid(format!("storage.public_base_url: {e}")))?;
        Ok(Some(url))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn phase_timeout(&self) -> Option<Duration> {
        self.phase_timeout_secs.map(Duration::from_secs)
    }
}

fn default_config_file() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", APP_NAME)?;
    ["toml", "yaml", "json"]
        .iter()
        .map(|ext| dirs.config_dir().join(format!("{APP_NAME}.{ext}")))
        .find(|path| path.is_file())
}

fn merge_file(figment: Figment, path: &Path) -> Figment {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => figment.merge(Toml::file_exact(path)),
    }
}
