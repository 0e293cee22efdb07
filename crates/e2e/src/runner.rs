//! Main test runner that orchestrates the app server, session helpers and Playwright

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};
use crate::playwright::{PlaywrightConfig, PlaywrightHandle, ScriptBuilder, StepResult};
use crate::server::ServerHandle;
use crate::session::{LocalStorage, SessionClient};
use crate::spec::{TestCase, TestSpec, TestStep};
use crate::task::TaskRegistry;

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub suite: String,
    pub name: String,
    pub success: bool,
    pub skipped: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
    pub failure_screenshot: Option<PathBuf>,
}

impl TestResult {
    fn skipped(suite: &str, name: &str, reason: &str) -> Self {
        Self {
            suite: suite.to_string(),
            name: name.to_string(),
            success: false,
            skipped: true,
            duration_ms: 0,
            steps: vec![],
            error: Some(reason.to_string()),
            failure_screenshot: None,
        }
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub project_id: Option<String>,
    pub results: Vec<TestResult>,
}

/// Narrows which suites and test cases run
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub suite: Option<String>,
    pub test: Option<String>,
    pub tag: Option<String>,
}

impl RunFilter {
    pub fn apply(&self, specs: Vec<TestSpec>) -> Vec<TestSpec> {
        specs
            .into_iter()
            .filter(|s| self.suite.as_ref().map_or(true, |name| &s.name == name))
            .filter(|s| self.tag.as_ref().map_or(true, |tag| s.tags.contains(tag)))
            .filter_map(|mut s| {
                if let Some(test) = &self.test {
                    s.tests.retain(|t| &t.name == test);
                }
                (!s.tests.is_empty()).then_some(s)
            })
            .collect()
    }
}

/// Where a step of a compiled test case ended up
#[derive(Debug, Clone)]
pub enum CaseStep {
    /// Already executed against the API
    Api(StepResult),
    /// Index into the browser script
    Browser(usize),
}

/// A test case after its API-side steps have run
#[derive(Debug, Clone, Default)]
pub struct CompiledCase {
    pub steps: Vec<CaseStep>,
    pub error: Option<String>,
}

/// Main E2E test runner
pub struct TestRunner {
    config: SuiteConfig,
    session: SessionClient,
    tasks: TaskRegistry,

    /// Running app handle (if the runner spawned one)
    server: Option<ServerHandle>,
}

impl TestRunner {
    pub fn new(config: SuiteConfig) -> E2eResult<Self> {
        let session = SessionClient::new(&config)?;
        let tasks = TaskRegistry::from_config(&config.tasks);
        Ok(Self {
            config,
            session,
            tasks,
            server: None,
        })
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    pub fn tasks_mut(&mut self) -> &mut TaskRegistry {
        &mut self.tasks
    }

    /// Playwright settings derived from the suite configuration
    pub fn playwright_config(&self) -> PlaywrightConfig {
        PlaywrightConfig {
            base_url: self.config.base_url.clone(),
            screenshot_dir: self.config.output_dir().join("screenshots"),
            video_dir: self.config.video_dir(),
            node_modules: self.config.resolve(&self.config.node_modules),
            viewport_width: self.config.viewport.width,
            viewport_height: self.config.viewport.height,
            browser: self.config.browser,
            headless: self.config.headless,
            timeout_ms: self.config.default_command_timeout_ms,
        }
    }

    /// Start the app under test, if one is configured
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(());
        }
        if let Some(server_config) = &self.config.server {
            let server = ServerHandle::spawn(server_config, &self.config.base_url).await?;
            self.server = Some(server);
        }
        Ok(())
    }

    /// Stop the app under test
    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Specs matching the configured pattern
    pub fn load_specs(&self) -> E2eResult<Vec<TestSpec>> {
        TestSpec::load_matching(&self.config.root_dir, &self.config.spec_pattern)
    }

    /// Run all tests matching `filter`
    pub async fn run(&mut self, filter: &RunFilter) -> E2eResult<TestSuiteResult> {
        let specs = filter.apply(self.load_specs()?);
        if specs.is_empty() {
            warn!("No specs matched {}", self.config.spec_pattern);
        }
        self.run_specs(&specs).await
    }

    /// Run a list of test specs
    pub async fn run_specs(&mut self, specs: &[TestSpec]) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        self.start_server().await?;
        let playwright = PlaywrightHandle::new(self.playwright_config())?;

        let total: usize = specs.iter().map(|s| s.tests.len()).sum();
        info!("Running {} test(s) from {} spec(s)...", total, specs.len());

        let mut results = Vec::new();
        for spec in specs {
            results.extend(self.run_suite(&playwright, spec).await);
        }

        let passed = results.iter().filter(|r| r.success).count();
        let skipped = results.iter().filter(|r| r.skipped).count();
        let failed = results.len() - passed - skipped;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms);

        Ok(TestSuiteResult {
            total: results.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            started_at,
            project_id: self.config.project_id.clone(),
            results,
        })
    }

    /// Run one suite: `before` once, then every test case in isolation
    pub async fn run_suite(&self, playwright: &PlaywrightHandle, spec: &TestSpec) -> Vec<TestResult> {
        info!("{}", spec.name);
        let mut results = Vec::new();

        if let Err(hook_error) = self.run_before(spec).await {
            let reason = format!("\"before all\" hook failed: {}", hook_error);
            error!("✗ {} - {}", spec.name, reason);
            results.push(TestResult {
                suite: spec.name.clone(),
                name: "\"before all\" hook".to_string(),
                success: false,
                skipped: false,
                duration_ms: 0,
                steps: vec![],
                error: Some(reason.clone()),
                failure_screenshot: None,
            });
            results.extend(spec.tests.iter().map(|t| TestResult::skipped(&spec.name, &t.name, &reason)));
            return results;
        }

        for case in &spec.tests {
            let result = self.run_case(playwright, spec, case).await;
            if result.success {
                info!("  ✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!("  ✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
            }
            results.push(result);
        }

        results
    }

    async fn run_before(&self, spec: &TestSpec) -> E2eResult<()> {
        // Tokens obtained here have no page to land in
        let mut storage: HashMap<String, String> = HashMap::new();
        for step in &spec.before {
            let step = step.render(&self.config)?;
            let result = self.run_api_step(&step, &mut storage).await;
            if !result.success {
                return Err(E2eError::StepFailed {
                    step: result.step_name,
                    reason: result.error.unwrap_or_default(),
                });
            }
        }
        Ok(())
    }

    /// Run `before_each` plus the case's steps in a fresh browser context
    pub async fn run_case(&self, playwright: &PlaywrightHandle, spec: &TestSpec, case: &TestCase) -> TestResult {
        let start = Instant::now();
        debug!("Running test: {} / {}", spec.name, case.name);

        let mut script = playwright.script(&format!("{} {}", spec.name, case.name));
        let compiled = self.compile_case(spec, case, &mut script).await;

        let mut error = compiled.error;
        let mut failure_screenshot = None;
        let mut browser_steps = Vec::new();

        if error.is_none() && script.step_count() > 0 {
            match playwright.run_script(&script).await {
                Ok(report) => {
                    if !report.success {
                        error = Some(
                            report
                                .steps
                                .iter()
                                .find(|s| !s.success)
                                .map(|s| format!("{}: {}", s.step_name, s.error.as_deref().unwrap_or("failed")))
                                .unwrap_or_else(|| "browser script failed".to_string()),
                        );
                    }
                    failure_screenshot = report.failure_screenshot;
                    browser_steps = report.steps;
                }
                Err(e) => error = Some(e.to_string()),
            }
        }

        let steps = compiled
            .steps
            .into_iter()
            .filter_map(|s| match s {
                CaseStep::Api(result) => Some(result),
                CaseStep::Browser(index) => browser_steps.get(index).cloned(),
            })
            .collect();

        TestResult {
            suite: spec.name.clone(),
            name: case.name.clone(),
            success: error.is_none(),
            skipped: false,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error,
            failure_screenshot,
        }
    }

    /// Execute API-side steps in order and queue browser steps on `script`.
    ///
    /// Spec validation guarantees register_user and task never follow a
    /// browser step, so running them here keeps step order. Stops at the
    /// first failing API-side step.
    pub async fn compile_case(&self, spec: &TestSpec, case: &TestCase, script: &mut ScriptBuilder) -> CompiledCase {
        let mut compiled = CompiledCase::default();

        for step in spec.before_each.iter().chain(&case.steps) {
            let step = match step.render(&self.config) {
                Ok(step) => step,
                Err(e) => {
                    compiled.error = Some(format!("{}: {}", step.name(), e));
                    break;
                }
            };

            if step.is_api_side() {
                let result = self.run_api_step(&step, script).await;
                let failed = !result.success;
                if failed {
                    compiled.error = Some(format!(
                        "{}: {}",
                        result.step_name,
                        result.error.as_deref().unwrap_or("failed")
                    ));
                }
                compiled.steps.push(CaseStep::Api(result));
                if failed {
                    break;
                }
            } else {
                compiled.steps.push(CaseStep::Browser(script.push_step(step)));
            }
        }

        compiled
    }

    /// Run a register_user, login or task step
    pub async fn run_api_step<S>(&self, step: &TestStep, storage: &mut S) -> StepResult
    where
        S: LocalStorage + ?Sized,
    {
        let start = Instant::now();
        let step_name = step.name();
        debug!("Executing step: {}", step_name);

        let outcome = match step {
            TestStep::RegisterUser { user } => {
                self.session.ensure_user_exists(user).await.map(|outcome| {
                    debug!("Registration outcome: {:?}", outcome);
                })
            }
            TestStep::Login { email, password } => {
                let credentials = TestStep::login_credentials(email, password, &self.config);
                self.session
                    .establish_session(credentials.as_ref(), storage)
                    .await
                    .map(|_| ())
            }
            TestStep::Task { name } => self.tasks.run(name).await.map(|value| {
                debug!("Task '{}' returned {}", name, value);
            }),
            other => Err(E2eError::StepFailed {
                step: other.name(),
                reason: "not an API-side step".to_string(),
            }),
        };

        StepResult {
            success: outcome.is_ok(),
            step_name,
            duration_ms: start.elapsed().as_millis() as u64,
            error: outcome.err().map(|e| e.to_string()),
            screenshot_path: None,
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        let output_dir = self.config.output_dir();
        std::fs::create_dir_all(&output_dir)?;

        let path = output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(yaml: &str) -> TestSpec {
        TestSpec::from_yaml(yaml).unwrap()
    }

    const SUITES: &str = r#"
name: Register
tags: [auth]
tests:
  - name: registers new user
    steps:
      - action: visit
        url: /
  - name: rejects duplicate
    steps:
      - action: visit
        url: /
"#;

    #[test]
    fn test_filter_by_test_name() {
        let filter = RunFilter {
            test: Some("rejects duplicate".to_string()),
            ..Default::default()
        };
        let specs = filter.apply(vec![spec(SUITES)]);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].tests.len(), 1);
        assert_eq!(specs[0].tests[0].name, "rejects duplicate");
    }

    #[test]
    fn test_filter_drops_unmatched_suites() {
        let by_tag = RunFilter {
            tag: Some("smoke".to_string()),
            ..Default::default()
        };
        assert!(by_tag.apply(vec![spec(SUITES)]).is_empty());

        let by_suite = RunFilter {
            suite: Some("Register".to_string()),
            ..Default::default()
        };
        assert_eq!(by_suite.apply(vec![spec(SUITES)]).len(), 1);
    }

    #[test]
    fn test_playwright_config_follows_suite_config() {
        let config = SuiteConfig {
            root_dir: PathBuf::from("/work"),
            video: false,
            ..Default::default()
        };
        let runner = TestRunner::new(config).unwrap();
        let pw = runner.playwright_config();
        assert_eq!(pw.viewport_width, 1000);
        assert_eq!(pw.timeout_ms, 4000);
        assert_eq!(pw.screenshot_dir, PathBuf::from("/work/test-results/screenshots"));
        assert_eq!(pw.node_modules, PathBuf::from("/work/node_modules"));
        assert!(pw.video_dir.is_none());
    }

    #[tokio::test]
    async fn test_task_steps_compile_without_browser() {
        let runner = TestRunner::new(SuiteConfig::default()).unwrap();
        let suite = spec(
            r#"
name: Register
before_each:
  - action: task
    name: clean_database
tests:
  - name: ok
    steps:
      - action: visit
        url: /register
  - name: broken
    steps:
      - action: task
        name: no_such_task
      - action: visit
        url: /register
"#,
        );

        let mut script = ScriptBuilder::new(runner.playwright_config(), "ok");
        let compiled = runner.compile_case(&suite, &suite.tests[0], &mut script).await;
        assert!(compiled.error.is_none());
        assert!(matches!(&compiled.steps[0], CaseStep::Api(r) if r.success));
        assert!(matches!(compiled.steps[1], CaseStep::Browser(0)));
        assert_eq!(script.step_count(), 1);

        let mut script = ScriptBuilder::new(runner.playwright_config(), "broken");
        let compiled = runner.compile_case(&suite, &suite.tests[1], &mut script).await;
        assert_eq!(compiled.steps.len(), 2);
        assert!(matches!(&compiled.steps[1], CaseStep::Api(r) if !r.success));
        assert!(compiled.error.unwrap().contains("no_such_task"));
        assert_eq!(script.step_count(), 0);
    }
}
