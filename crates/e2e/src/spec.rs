//! Declarative YAML test specification

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};
use crate::session::{Credentials, UserOverrides};

/// A suite of test cases parsed from one YAML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this suite
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering tests
    #[serde(default)]
    pub tags: Vec<String>,

    /// Runs once before the first test case. API-side steps only.
    #[serde(default)]
    pub before: Vec<TestStep>,

    /// Prepended to every test case
    #[serde(default)]
    pub before_each: Vec<TestStep>,

    pub tests: Vec<TestCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

/// How a step locates its element.
///
/// `selector` alone is a CSS/attribute selector, `contains` alone is the
/// first element with that visible text, both together is the first element
/// matching the selector that contains the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
}

impl Target {
    pub fn css(selector: &str) -> Self {
        Self {
            selector: Some(selector.to_string()),
            contains: None,
        }
    }

    pub fn describe(&self) -> String {
        match (&self.selector, &self.contains) {
            (Some(sel), Some(text)) => format!("{}[{}]", sel, text),
            (Some(sel), None) => sel.clone(),
            (None, Some(text)) => format!("'{}'", text),
            (None, None) => "<none>".to_string(),
        }
    }

    fn is_empty(&self) -> bool {
        self.selector.is_none() && self.contains.is_none()
    }
}

/// A single step in a test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (relative to base)
    Visit { url: String },

    /// Click an element
    Click {
        #[serde(flatten)]
        target: Target,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Type text with keyboard simulation
    Type {
        #[serde(flatten)]
        target: Target,
        text: String,
        #[serde(default)]
        delay_ms: Option<u64>,
    },

    /// Fill an input field
    Fill {
        #[serde(flatten)]
        target: Target,
        value: String,
        #[serde(default)]
        clear_first: bool,
    },

    /// Press a key
    Press {
        #[serde(default)]
        selector: Option<String>,
        key: String,
    },

    /// Submit a form
    Submit {
        #[serde(flatten)]
        target: Target,
    },

    /// Wait for an element to reach a state
    Wait {
        #[serde(flatten)]
        target: Target,
        #[serde(default)]
        timeout_ms: Option<u64>,
        #[serde(default)]
        state: WaitState,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Assert something about an element
    Assert {
        #[serde(flatten)]
        target: Target,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        has_class: Option<String>,
        #[serde(default)]
        lacks_class: Option<String>,
        #[serde(default)]
        attribute: Option<AttributeAssertion>,
        #[serde(default)]
        count: Option<usize>,
    },

    /// Assert on the full current URL
    AssertUrl {
        #[serde(default)]
        contains: Option<String>,
        #[serde(default)]
        not_contains: Option<String>,
        #[serde(default)]
        equals: Option<String>,
    },

    /// Assert on the path component of the current URL
    AssertPath { equals: String },

    /// Take a screenshot
    Screenshot {
        name: String,
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        full_page: bool,
    },

    /// Reload the current page
    Reload,

    /// Log a message (for debugging)
    Log { message: String },

    /// Register a user through the API, tolerating duplicates
    RegisterUser {
        #[serde(flatten)]
        user: UserOverrides,
    },

    /// Log in through the API and seed the token into local storage
    Login {
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },

    /// Invoke a named task hook
    Task { name: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeAssertion {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub contains: Option<String>,
}

impl TestStep {
    /// Steps executed in-process against the API rather than in the browser
    pub fn is_api_side(&self) -> bool {
        matches!(
            self,
            TestStep::RegisterUser { .. } | TestStep::Login { .. } | TestStep::Task { .. }
        )
    }

    /// Short label used in logs and reports
    pub fn name(&self) -> String {
        match self {
            TestStep::Visit { url } => format!("visit:{}", url),
            TestStep::Click { target, .. } => format!("click:{}", target.describe()),
            TestStep::Type { target, .. } => format!("type:{}", target.describe()),
            TestStep::Fill { target, .. } => format!("fill:{}", target.describe()),
            TestStep::Press { key, .. } => format!("press:{}", key),
            TestStep::Submit { target } => format!("submit:{}", target.describe()),
            TestStep::Wait { target, .. } => format!("wait:{}", target.describe()),
            TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
            TestStep::Assert { target, .. } => format!("assert:{}", target.describe()),
            TestStep::AssertUrl { .. } => "assert_url".to_string(),
            TestStep::AssertPath { equals } => format!("assert_path:{}", equals),
            TestStep::Screenshot { name, .. } => format!("screenshot:{}", name),
            TestStep::Reload => "reload".to_string(),
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
            TestStep::RegisterUser { user } => format!(
                "register_user:{}",
                user.username.as_deref().unwrap_or("<default>")
            ),
            TestStep::Login { email, .. } => {
                format!("login:{}", email.as_deref().unwrap_or("<default>"))
            }
            TestStep::Task { name } => format!("task:{}", name),
        }
    }

    /// Credentials for a `login` step, or `None` for the configured user
    pub fn login_credentials(email: &Option<String>, password: &Option<String>, config: &SuiteConfig) -> Option<Credentials> {
        if email.is_none() && password.is_none() {
            return None;
        }
        Some(Credentials {
            email: email.clone().unwrap_or_else(|| config.user.email.clone()),
            password: password.clone().unwrap_or_else(|| config.user.password.clone()),
        })
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            TestStep::Click { target, .. }
            | TestStep::Type { target, .. }
            | TestStep::Fill { target, .. }
            | TestStep::Wait { target, .. }
            | TestStep::Assert { target, .. }
                if target.is_empty() =>
            {
                Err(format!("{} needs a selector or contains", self.name()))
            }
            TestStep::AssertUrl { contains: None, not_contains: None, equals: None } => {
                Err("assert_url needs contains, not_contains or equals".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Substitute `{{...}}` placeholders from the configuration
    pub fn render(&self, config: &SuiteConfig) -> E2eResult<Self> {
        let value = serde_json::to_value(self)?;
        let rendered = render_value(value, config);
        Ok(serde_json::from_value(rendered)?)
    }
}

fn render_value(value: serde_json::Value, config: &SuiteConfig) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::String(s) => Value::String(render_str(&s, config)),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| render_value(v, config)).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, render_value(v, config)))
                .collect(),
        ),
        other => other,
    }
}

/// Replace the known placeholders in `input`
pub fn render_str(input: &str, config: &SuiteConfig) -> String {
    if !input.contains("{{") {
        return input.to_string();
    }
    [
        ("{{user.email}}", config.user.email.as_str()),
        ("{{user.password}}", config.user.password.as_str()),
        ("{{user.username}}", config.user.username.as_str()),
        ("{{api_url}}", config.api_url.as_str()),
        ("{{base_url}}", config.base_url.as_str()),
    ]
    .iter()
    .fold(input.to_string(), |acc, (placeholder, value)| acc.replace(placeholder, value))
}

impl TestSpec {
    /// Parse a test spec from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a test spec from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    fn validate(&self) -> E2eResult<()> {
        if let Some(step) = self.before.iter().find(|s| !s.is_api_side()) {
            return Err(E2eError::SpecParse(format!(
                "suite '{}': `before` only accepts register_user, login and task steps, found {}",
                self.name,
                step.name()
            )));
        }

        let hooks = self.before.iter().chain(&self.before_each);
        let cases = self.tests.iter().flat_map(|t| t.steps.iter());
        for step in hooks.chain(cases) {
            step.validate()
                .map_err(|reason| E2eError::SpecParse(format!("suite '{}': {}", self.name, reason)))?;
        }

        // register_user and task run before the browser starts, so they
        // cannot follow a browser step. login seeds storage in place.
        let orders: Vec<(&str, Vec<&TestStep>)> = if self.tests.is_empty() {
            vec![("before_each", self.before_each.iter().collect())]
        } else {
            self.tests
                .iter()
                .map(|t| (t.name.as_str(), self.before_each.iter().chain(&t.steps).collect()))
                .collect()
        };
        for (case, steps) in orders {
            let mut browser_step: Option<String> = None;
            for step in steps {
                match step {
                    TestStep::RegisterUser { .. } | TestStep::Task { .. } => {
                        if let Some(prev) = &browser_step {
                            return Err(E2eError::SpecParse(format!(
                                "suite '{}', test '{}': {} must come before browser steps, found after {}",
                                self.name,
                                case,
                                step.name(),
                                prev
                            )));
                        }
                    }
                    TestStep::Login { .. } => {}
                    _ => browser_step = Some(step.name()),
                }
            }
        }
        Ok(())
    }

    /// Load every spec under `root` whose path relative to `root` matches
    /// `pattern`, in path order
    pub fn load_matching(root: &Path, pattern: &str) -> E2eResult<Vec<Self>> {
        let pattern = glob::Pattern::new(pattern)?;
        let options = glob::MatchOptions {
            require_literal_separator: true,
            ..Default::default()
        };

        let mut paths: Vec<_> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .strip_prefix(root)
                    .map(|rel| pattern.matches_path_with(rel, options))
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const LOGIN: &str = r#"
name: Conduit Login
tags: [auth]
before:
  - action: register_user
before_each:
  - action: visit
    url: /
tests:
  - name: does not work with wrong credentials
    steps:
      - action: click
        selector: li
        contains: Sign in
      - action: type
        selector: 'input[type="email"]'
        text: wrong@email.com
      - action: assert_url
        contains: /login
  - name: logs in
    steps:
      - action: type
        selector: 'input[type="email"]'
        text: '{{user.email}}'
      - action: assert
        selector: span.nav-link
        contains: Your Feed
        has_class: active
"#;

    #[test]
    fn test_parse_suite() {
        let spec = TestSpec::from_yaml(LOGIN).unwrap();
        assert_eq!(spec.name, "Conduit Login");
        assert_eq!(spec.before.len(), 1);
        assert_eq!(spec.tests.len(), 2);

        match &spec.tests[0].steps[0] {
            TestStep::Click { target, timeout_ms } => {
                assert_eq!(target.selector.as_deref(), Some("li"));
                assert_eq!(target.contains.as_deref(), Some("Sign in"));
                assert!(timeout_ms.is_none());
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert!(matches!(
            &spec.before[0],
            TestStep::RegisterUser { user } if *user == UserOverrides::default()
        ));
    }

    #[test]
    fn test_register_user_overrides() {
        let yaml = r#"
name: overrides
before:
  - action: register_user
    username: visitor
    email: visitor@email.com
tests: []
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        match &spec.before[0] {
            TestStep::RegisterUser { user } => {
                assert_eq!(user.username.as_deref(), Some("visitor"));
                assert!(user.password.is_none());
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_browser_step_in_before_is_rejected() {
        let yaml = r#"
name: bad
before:
  - action: visit
    url: /
tests: []
"#;
        let err = TestSpec::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("before"), "{}", err);
    }

    #[test_case("action: click" ; "click")]
    #[test_case("action: assert\n        visible: true" ; "assert")]
    #[test_case("action: assert_url" ; "assert url")]
    fn test_step_without_target_is_rejected(step: &str) {
        let yaml = format!(
            "name: bad\ntests:\n  - name: t\n    steps:\n      - {}\n",
            step
        );
        assert!(TestSpec::from_yaml(&yaml).is_err());
    }

    #[test_case("      - action: visit\n        url: /register\n      - action: task\n        name: clean_database\n" ; "task after visit")]
    #[test_case("      - action: click\n        selector: li\n      - action: register_user\n" ; "register after click")]
    fn test_api_step_after_browser_step_is_rejected(steps: &str) {
        let yaml = format!("name: bad\ntests:\n  - name: t\n    steps:\n{}", steps);
        let err = TestSpec::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("must come before browser steps"), "{}", err);
    }

    #[test]
    fn test_case_step_after_browser_before_each_is_rejected() {
        let yaml = r#"
name: bad
before_each:
  - action: visit
    url: /
tests:
  - name: t
    steps:
      - action: task
        name: clean_database
"#;
        assert!(TestSpec::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_login_may_follow_browser_steps() {
        let yaml = r#"
name: ok
before_each:
  - action: task
    name: clean_database
  - action: visit
    url: /
tests:
  - name: t
    steps:
      - action: login
      - action: reload
"#;
        TestSpec::from_yaml(yaml).unwrap();
    }

    #[test]
    fn test_render_placeholders() {
        let spec = TestSpec::from_yaml(LOGIN).unwrap();
        let config = SuiteConfig::default();
        let step = spec.tests[1].steps[0].render(&config).unwrap();
        match step {
            TestStep::Type { text, .. } => assert_eq!(text, "tester@test.com"),
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_step_names() {
        let spec = TestSpec::from_yaml(LOGIN).unwrap();
        assert_eq!(spec.tests[0].steps[0].name(), "click:li[Sign in]");
        assert_eq!(spec.before[0].name(), "register_user:<default>");
        assert!(spec.before[0].is_api_side());
        assert!(!spec.before_each[0].is_api_side());
    }

    #[test]
    fn test_login_credentials_fall_back_to_config() {
        let config = SuiteConfig::default();
        assert!(TestStep::login_credentials(&None, &None, &config).is_none());

        let creds =
            TestStep::login_credentials(&Some("other@test.com".to_string()), &None, &config).unwrap();
        assert_eq!(creds.email, "other@test.com");
        assert_eq!(creds.password, "password1234");
    }

    #[test]
    fn test_load_matching_uses_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let specs = dir.path().join("specs").join("auth");
        std::fs::create_dir_all(&specs).unwrap();
        std::fs::write(specs.join("login.yaml"), LOGIN).unwrap();
        std::fs::write(specs.join("notes.txt"), "not a spec").unwrap();
        std::fs::write(dir.path().join("stray.yaml"), "not: [a spec").unwrap();

        let loaded = TestSpec::load_matching(dir.path(), "specs/**/*.yaml").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(TestSpec::filter_by_tag(&loaded, "auth").len(), 1);
        assert!(TestSpec::filter_by_tag(&loaded, "smoke").is_empty());
    }
}
