//! Suite configuration
//!
//! Loaded once at startup from a YAML file, then patched from `CONDUIT_*`
//! environment variables and validated. The result is never mutated during a
//! run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{E2eError, E2eResult};
use crate::playwright::Browser;

/// Avatar sent with registrations when neither the default user nor the
/// overrides provide one.
pub const DEFAULT_AVATAR: &str = "https://robohash.org/couchbasecapella?set=set3&size=150x150";

/// Root configuration for a test run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Root of the Conduit REST API (`/api/...` is appended)
    #[serde(default = "default_root_url")]
    pub api_url: String,

    /// Root the browser navigates relative to
    #[serde(default = "default_root_url")]
    pub base_url: String,

    /// Default test user shared by every spec
    #[serde(default)]
    pub user: TestUser,

    #[serde(default)]
    pub viewport: Viewport,

    /// Record a video of every test case
    #[serde(default = "default_true")]
    pub video: bool,

    /// Where videos land (defaults to `<output_dir>/videos`)
    #[serde(default)]
    pub video_dir: Option<PathBuf>,

    /// Glob, relative to the config file, selecting spec files
    #[serde(default = "default_spec_pattern")]
    pub spec_pattern: String,

    /// Timeout for actions and auto-retrying assertions
    #[serde(default = "default_command_timeout")]
    pub default_command_timeout_ms: u64,

    #[serde(default)]
    pub browser: Browser,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// `node_modules` directory that provides `playwright`
    #[serde(default = "default_node_modules")]
    pub node_modules: PathBuf,

    /// Dashboard project identifier, reported in results
    #[serde(default = "default_project_id")]
    pub project_id: Option<String>,

    /// Named task hooks callable from specs
    #[serde(default)]
    pub tasks: HashMap<String, TaskConfig>,

    /// Application under test, spawned by the runner when set
    #[serde(default)]
    pub server: Option<AppServerConfig>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub root_dir: PathBuf,
}

/// A Conduit user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            username: "testuser".to_string(),
            email: "tester@test.com".to_string(),
            password: "password1234".to_string(),
            image: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { width: 1000, height: 1000 }
    }
}

/// Binding of a task name to an external command; an empty command is a no-op
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppServerConfig {
    /// Program and arguments that start the application
    pub command: Vec<String>,

    /// Polled until it answers 2xx (defaults to `base_url`)
    #[serde(default)]
    pub health_url: Option<String>,

    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
}

fn default_root_url() -> String {
    "http://localhost:80".to_string()
}

fn default_true() -> bool {
    true
}

fn default_spec_pattern() -> String {
    "specs/**/*.yaml".to_string()
}

fn default_command_timeout() -> u64 {
    4000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("test-results")
}

fn default_node_modules() -> PathBuf {
    PathBuf::from("node_modules")
}

fn default_project_id() -> Option<String> {
    Some("bh5j1d".to_string())
}

fn default_startup_timeout() -> u64 {
    30
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            api_url: default_root_url(),
            base_url: default_root_url(),
            user: TestUser::default(),
            viewport: Viewport::default(),
            video: true,
            video_dir: None,
            spec_pattern: default_spec_pattern(),
            default_command_timeout_ms: default_command_timeout(),
            browser: Browser::default(),
            headless: true,
            output_dir: default_output_dir(),
            node_modules: default_node_modules(),
            project_id: default_project_id(),
            tasks: HashMap::new(),
            server: None,
            root_dir: PathBuf::from("."),
        }
    }
}

impl SuiteConfig {
    /// Parse a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| E2eError::Config(format!("invalid configuration: {}", e)))
    }

    /// Parse a configuration file; relative paths resolve against its directory
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            E2eError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_yaml(&content)?;
        config.root_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    /// Load, apply environment overrides and validate.
    ///
    /// `env` is consulted for each `CONDUIT_*` variable; pass
    /// `|k| std::env::var(k).ok()` for the process environment.
    pub fn load<F>(path: &Path, env: F) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, env: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env("CONDUIT_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = env("CONDUIT_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = env("CONDUIT_USER_EMAIL") {
            self.user.email = v;
        }
        if let Some(v) = env("CONDUIT_USER_PASSWORD") {
            self.user.password = v;
        }
        if let Some(v) = env("CONDUIT_USER_USERNAME") {
            self.user.username = v;
        }
        if let Some(v) = env("CONDUIT_VIDEO") {
            self.video = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(E2eError::Config(format!(
                        "CONDUIT_VIDEO must be true or false, got '{}'",
                        other
                    )))
                }
            };
        }
        Ok(())
    }

    /// Fail fast on missing or malformed required values
    pub fn validate(&self) -> E2eResult<()> {
        let required = [
            ("api_url", &self.api_url),
            ("base_url", &self.base_url),
            ("user.username", &self.user.username),
            ("user.email", &self.user.email),
            ("user.password", &self.user.password),
            ("spec_pattern", &self.spec_pattern),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(E2eError::Config(format!(
                    "required field `{}` is missing or empty",
                    field
                )));
            }
        }

        for (field, value) in [("api_url", &self.api_url), ("base_url", &self.base_url)] {
            reqwest::Url::parse(value).map_err(|e| {
                E2eError::Config(format!("`{}` is not a valid URL ({}): {}", field, value, e))
            })?;
        }

        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(E2eError::Config(format!(
                "viewport must be non-zero, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }

        if let Some(server) = &self.server {
            if server.command.is_empty() {
                return Err(E2eError::Config(
                    "required field `server.command` is missing or empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Resolve a configured path against the config file's directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_dir.join(path)
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    pub fn video_dir(&self) -> Option<PathBuf> {
        if !self.video {
            return None;
        }
        Some(match &self.video_dir {
            Some(dir) => self.resolve(dir),
            None => self.output_dir().join("videos"),
        })
    }
}
