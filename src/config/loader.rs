// Config loader - File discovery, table merging and environment overlay

use std::path::{Path, PathBuf};

use super::{Config, ConfigError, ConfigResult};

pub const TOKEN_VAR: &str = "HUGGINGFACE_API_TOKEN";

/// Where the effective values came from
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded, in order
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Existing config files in load order. A CLI path replaces the local `./harmonyhub.toml`.
pub fn discover_config_files(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Some(config_dir) = dirs::config_dir() {
        let user = config_dir.join("harmonyhub").join("config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    match cli_path {
        Some(path) => files.push(path.to_path_buf()),
        None => {
            let local = PathBuf::from("harmonyhub.toml");
            if local.exists() {
                files.push(local);
            }
        }
    }

    files
}

/// Merge the files over the defaults, then apply environment overrides from `env`
pub fn load_layers<F>(files: &[PathBuf], env: F) -> ConfigResult<(Config, ConfigSources)>
where
    F: Fn(&str) -> Option<String>,
{
    let mut sources = ConfigSources::default();
    let mut merged = toml::Table::new();

    for path in files {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.clone(),
            source: e,
        })?;
        let table = parse_table(&contents, path)?;
        merge_tables(&mut merged, table);
        sources.files.push(path.clone());
    }

    let mut config = toml::Value::Table(merged).try_into::<Config>().map_err(|e| ConfigError::Parse {
        path: files.last().cloned().unwrap_or_default(),
        message: e.to_string(),
    })?;

    apply_env_overrides(&mut config, &mut sources, env);
    Ok((config, sources))
}

fn parse_table(contents: &str, path: &Path) -> ConfigResult<toml::Table> {
    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Field-by-field merge; nested tables merge, everything else is replaced
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

pub fn apply_env_overrides<F>(config: &mut Config, sources: &mut ConfigSources, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut take = |name: &str| {
        let value = env(name).filter(|v| !v.trim().is_empty())?;
        sources.env_overrides.push(name.to_string());
        Some(value)
    };

    if let Some(v) = take(TOKEN_VAR) {
        config.inference.default_token = Some(v.trim().to_string());
    }
    if let Some(v) = take("HARMONYHUB_BIND") {
        config.server.bind = v;
    }
    if let Some(v) = take("HARMONYHUB_DATA_DIR") {
        config.paths.data_dir = expand_path(&v);
    }
    if let Some(v) = take("HARMONYHUB_INFERENCE_URL") {
        config.inference.base_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = take("HARMONYHUB_MODEL") {
        config.inference.model = v;
    }
    if let Some(v) = take("HARMONYHUB_LOG") {
        config.logging.level = v;
    }
}

/// Expand a leading `~/`
pub fn expand_path(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
