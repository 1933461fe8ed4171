use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;

use crate::{
    cli::Cli,
    error::{PatoError, Result},
    template::DEFAULT_PLACEHOLDER,
};

/// Layered key/value settings: defaults, then `.patorc`, then `PATO_*` env vars.
#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let vars = env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Self::load_from(&default_config_path(), vars)
    }

    pub fn load_from<I>(config_path: &Path, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = default_map();

        if config_path.exists() {
            if let Ok(file) = fs::File::open(config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(std::result::Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Environment takes precedence over the file
        for (k, v) in vars {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self {
            inner: map,
            config_path: config_path.to_path_buf(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).filter(|v| !v.is_empty()).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .parse::<u64>()
                .map(Some)
                .map_err(|e| PatoError::invalid_config(key, &v, e.to_string())),
        }
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "PATO_THREADS",
        "PATO_TIMEOUT",
        "PATO_LOG",
        "PATO_OUTPUT_DIR",
        "PATO_PLACEHOLDER",
        "PATO_COLOR",
    ];
    KEYS.contains(&k)
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("pato").join(".patorc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("PATO_THREADS".into(), "1".into());
    m.insert("PATO_LOG".into(), "false".into());
    m.insert("PATO_PLACEHOLDER".into(), DEFAULT_PLACEHOLDER.into());
    m.insert("PATO_COLOR".into(), "true".into());
    m
}

/// Everything a run needs, with CLI flags applied over the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub threads: NonZeroUsize,
    pub timeout: Option<Duration>,
    pub log: bool,
    pub output_dir: PathBuf,
    pub placeholder: String,
    pub color: bool,
}

impl RunSettings {
    /// `cwd` is the fallback output directory.
    pub fn resolve(cli: &Cli, cfg: &Config, cwd: &Path) -> Result<Self> {
        let threads = match cli.threads {
            Some(t) => t,
            None => cfg.get_u64("PATO_THREADS")?.unwrap_or(1),
        };
        let threads = usize::try_from(threads)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| PatoError::invalid_config("threads", &threads.to_string(), "must be at least 1"))?;

        let timeout_secs = match cli.timeout {
            Some(t) => Some(t),
            None => cfg.get_u64("PATO_TIMEOUT")?,
        };
        let timeout = match timeout_secs {
            Some(0) => return Err(PatoError::invalid_config("timeout", "0", "must be at least 1 second")),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let output_dir = cli
            .output_dir
            .clone()
            .or_else(|| cfg.get_path("PATO_OUTPUT_DIR"))
            .unwrap_or_else(|| cwd.to_path_buf());

        let placeholder = cli
            .placeholder
            .clone()
            .or_else(|| cfg.get("PATO_PLACEHOLDER"))
            .unwrap_or_else(|| DEFAULT_PLACEHOLDER.to_string());

        Ok(Self {
            threads,
            timeout,
            log: cli.log || cfg.get_bool("PATO_LOG"),
            output_dir,
            placeholder,
            color: !cli.no_color && cfg.get_bool("PATO_COLOR"),
        })
    }
}
