use crate::config::schema::{self, MonitoringConfig, OutputConfig, SessionConfig};
use crate::error::{Error, Result};
use crate::output::{ConsoleOutput, JsonOutput, OutputHandler};
use indicatif::MultiProgress;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SessionConfig> {
        let path = path.as_ref();
        let mut visited = HashSet::new();
        Self::load_with_inheritance(path, &mut visited, false)
    }

    fn load_with_inheritance(
        path: &Path,
        visited: &mut HashSet<PathBuf>,
        is_parent_load: bool,
    ) -> Result<SessionConfig> {
        let path = fs::canonicalize(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        if !visited.insert(path.clone()) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }

        let mut config = Self::parse(&path, &fs::read_to_string(&path)?)?;
        log::debug!("Loaded config file {}", path.display());

        if let Some(parent) = config.extends.take() {
            let dir = path.parent().ok_or_else(|| {
                Error::Config(format!("No parent directory for {}", path.display()))
            })?;
            let base = Self::load_with_inheritance(&dir.join(parent), visited, true)?;
            config = Self::merge_configs(base, config);
        }

        // Parents may be partial; only the fully merged result must be valid.
        if !is_parent_load {
            config.validate()?;
        }
        Ok(config)
    }

    fn parse(path: &Path, content: &str) -> Result<SessionConfig> {
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(content)?,
            Some("yaml" | "yml") => serde_yaml::from_str(content)?,
            Some("toml") => toml::from_str(content)?,
            _ => {
                return Err(Error::Config(format!(
                    "Unsupported file extension: {}",
                    path.display()
                )));
            }
        };
        Ok(config)
    }

    /// Child values win wherever they differ from the field's default.
    fn merge_configs(mut parent: SessionConfig, child: SessionConfig) -> SessionConfig {
        if !child.name.is_empty() {
            parent.name = child.name;
        }
        if !child.urls.is_empty() {
            parent.urls = child.urls;
        }
        if child.mode != Default::default() {
            parent.mode = child.mode;
        }
        if child.delay_ms != schema::default_delay() {
            parent.delay_ms = child.delay_ms;
        }
        if child.max_retries != schema::default_max_retries() {
            parent.max_retries = child.max_retries;
        }
        if child.timeout_secs != schema::default_timeout() {
            parent.timeout_secs = child.timeout_secs;
        }
        if child.max_concurrent != schema::default_max_concurrent() {
            parent.max_concurrent = child.max_concurrent;
        }
        if child.user_agent.is_some() {
            parent.user_agent = child.user_agent;
        }
        parent.headers.extend(child.headers);
        if child.proxy.is_some() {
            parent.proxy = child.proxy;
        }
        if child.monitoring != MonitoringConfig::default() {
            parent.monitoring = child.monitoring;
        }
        if child.output.is_some() {
            parent.output = child.output;
        }
        if child.report_path.is_some() {
            parent.report_path = child.report_path;
        }
        if child.sampler_export_path.is_some() {
            parent.sampler_export_path = child.sampler_export_path;
        }

        parent.extends = None;
        parent
    }

    pub fn create_output(
        config: &SessionConfig,
        multi: Option<MultiProgress>,
    ) -> Result<Box<dyn OutputHandler>> {
        let handler: Box<dyn OutputHandler> = match &config.output {
            Some(OutputConfig::Json { path }) => Box::new(JsonOutput::new(PathBuf::from(path))?),
            Some(OutputConfig::Console) | None => Box::new(ConsoleOutput::new(multi)),
        };
        Ok(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_yaml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "session.yaml",
            "name: docs\nurls:\n  - https://example.com/\n",
        );

        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(config.name, "docs");
        assert_eq!(config.mode, ExecutionMode::Sequential);
        assert_eq!(config.delay_ms, 1000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_concurrent, 10);
        assert_eq!(config.monitoring, MonitoringConfig::default());
    }

    #[test]
    fn loads_json_and_toml() {
        let dir = tempfile::tempdir().unwrap();
        let json = write(
            dir.path(),
            "a.json",
            r#"{"name": "j", "urls": ["https://a.example.com/"], "mode": "concurrent", "max_concurrent": 4}"#,
        );
        let toml = write(
            dir.path(),
            "b.toml",
            "name = \"t\"\nurls = [\"https://b.example.com/\"]\n\n[output]\ntype = \"json\"\npath = \"out.json\"\n",
        );

        let json = ConfigLoader::load(&json).unwrap();
        assert_eq!(json.mode, ExecutionMode::Concurrent);
        assert_eq!(json.max_concurrent, 4);

        let toml = ConfigLoader::load(&toml).unwrap();
        assert_eq!(
            toml.output,
            Some(OutputConfig::Json {
                path: "out.json".into()
            })
        );
    }

    #[test]
    fn child_overrides_parent() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "base.yaml",
            "name: base\nurls:\n  - https://base.example.com/\ndelay_ms: 250\nmax_retries: 1\nproxy: http://proxy.internal:3128\nheaders:\n  X-Team: crawl\n  X-Env: base\n",
        );
        let child = write(
            dir.path(),
            "child.yaml",
            "extends: base.yaml\nname: child\nmax_retries: 5\nheaders:\n  X-Env: child\n",
        );

        let config = ConfigLoader::load(&child).unwrap();
        assert_eq!(config.name, "child");
        assert_eq!(config.urls, vec!["https://base.example.com/".to_string()]);
        assert_eq!(config.delay_ms, 250);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.proxy.as_deref(), Some("http://proxy.internal:3128"));
        assert_eq!(config.headers.get("X-Team").map(String::as_str), Some("crawl"));
        assert_eq!(config.headers.get("X-Env").map(String::as_str), Some("child"));
        assert!(config.extends.is_none());
    }

    #[test]
    fn circular_inheritance_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yaml", "extends: b.yaml\nname: a\n");
        let b = write(dir.path(), "b.yaml", "extends: a.yaml\nname: b\n");

        let err = ConfigLoader::load(&b).unwrap_err();
        assert!(err.to_string().contains("Circular inheritance"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let no_urls = write(dir.path(), "empty.yaml", "name: nothing\n");
        assert!(matches!(
            ConfigLoader::load(&no_urls),
            Err(Error::Validation(_))
        ));

        let bad_threshold = write(
            dir.path(),
            "pct.yaml",
            "name: x\nurls: [\"https://a.example.com/\"]\nmonitoring:\n  memory_threshold_pct: 140\n",
        );
        assert!(matches!(
            ConfigLoader::load(&bad_threshold),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn unknown_extension_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "session.ini", "name=x");
        assert!(matches!(ConfigLoader::load(&path), Err(Error::Config(_))));
    }
}
