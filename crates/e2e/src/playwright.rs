//! Playwright browser automation
//!
//! Each test case is compiled into one Node script so the whole case runs in
//! a single browser context. The script reports progress as JSON lines
//! prefixed with [`EVENT_PREFIX`] on stdout.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};
use crate::session::LocalStorage;
use crate::spec::{AttributeAssertion, Target, TestStep};

/// Marks the lines of script output that carry step events
pub const EVENT_PREFIX: &str = "__E2E__";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

/// Result of executing a test step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

/// One line of script output
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Step {
        index: usize,
        ok: bool,
        duration_ms: u64,
        #[serde(default)]
        error: Option<String>,
    },
    Finish {
        ok: bool,
        #[serde(default)]
        failure_screenshot: Option<PathBuf>,
    },
}

/// Outcome of one script run
#[derive(Debug, Clone, Default)]
pub struct ScriptReport {
    pub steps: Vec<StepResult>,
    pub success: bool,
    pub failure_screenshot: Option<PathBuf>,
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub video_dir: Option<PathBuf>,
    pub node_modules: PathBuf,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,
    pub timeout_ms: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:80".to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            video_dir: None,
            node_modules: PathBuf::from("node_modules"),
            viewport_width: 1000,
            viewport_height: 1000,
            browser: Browser::Chromium,
            headless: true,
            timeout_ms: 4000,
        }
    }
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        std::fs::create_dir_all(&config.screenshot_dir)?;
        if let Some(dir) = &config.video_dir {
            std::fs::create_dir_all(dir)?;
        }

        Ok(Self { config })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    /// Start a script for the test case `name`
    pub fn script(&self, name: &str) -> ScriptBuilder {
        ScriptBuilder::new(self.config.clone(), name)
    }

    /// Execute the full script via Node
    pub async fn run_script(&self, script: &ScriptBuilder) -> E2eResult<ScriptReport> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("test.js");
        std::fs::write(&script_path, script.build())?;

        debug!("Running Playwright script: {}", script_path.display());

        let node_modules = std::fs::canonicalize(&self.config.node_modules)
            .unwrap_or_else(|_| self.config.node_modules.clone());

        let output = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(temp_dir.path())
            .env("NODE_PATH", &node_modules)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let events = parse_events(&stdout)?;

        if events.is_empty() {
            return Err(E2eError::Playwright(format!(
                "Script failed before reporting:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }

        let report = script.report(&events);
        if !report.success && !stderr.trim().is_empty() {
            debug!("Playwright stderr: {}", stderr.trim());
        }
        if report.success && !output.status.success() {
            warn!("Script reported success but node exited with {}", output.status);
        }
        Ok(report)
    }
}

/// Pull the events out of a script's stdout, ignoring other console output
pub fn parse_events(stdout: &str) -> E2eResult<Vec<ScriptEvent>> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix(EVENT_PREFIX))
        .map(|json| serde_json::from_str(json).map_err(E2eError::from))
        .collect()
}

/// Encode a string as a JavaScript literal
fn js(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// A JavaScript `RegExp` matching `literal` anywhere
fn js_regex_contains(literal: &str) -> String {
    format!("new RegExp({})", js(&regex::escape(literal)))
}

/// A JavaScript `RegExp` matching `class` as a whole word in a class list
fn js_regex_class(class: &str) -> String {
    format!("new RegExp({})", js(&format!(r"(^|\s){}(\s|$)", regex::escape(class))))
}

/// Single-line text for a `//` comment; JS treats U+2028/U+2029 as line breaks
fn comment(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() || c == '\u{2028}' || c == '\u{2029}' { ' ' } else { c })
        .collect()
}

/// Text filters are regexes so matching stays case-sensitive
fn locator(target: &Target) -> String {
    match (&target.selector, &target.contains) {
        (Some(sel), Some(text)) => {
            format!("page.locator({}, {{ hasText: {} }}).first()", js(sel), js_regex_contains(text))
        }
        (Some(sel), None) => format!("page.locator({})", js(sel)),
        (None, Some(text)) => format!("page.getByText({}).first()", js_regex_contains(text)),
        (None, None) => "page.locator(':root')".to_string(),
    }
}

enum ScriptOp {
    Step { index: usize, name: String, step: TestStep },
    SeedStorage { key: String, value: String },
}

/// Accumulates the browser side of one test case
pub struct ScriptBuilder {
    config: PlaywrightConfig,
    test_name: String,
    ops: Vec<ScriptOp>,
    step_names: Vec<String>,
}

impl ScriptBuilder {
    pub fn new(config: PlaywrightConfig, test_name: &str) -> Self {
        Self {
            config,
            test_name: test_name.to_string(),
            ops: Vec::new(),
            step_names: Vec::new(),
        }
    }

    /// Append a browser step; returns its index in the report
    pub fn push_step(&mut self, step: TestStep) -> usize {
        let index = self.step_names.len();
        let name = step.name();
        self.step_names.push(name.clone());
        self.ops.push(ScriptOp::Step { index, name, step });
        index
    }

    pub fn step_count(&self) -> usize {
        self.step_names.len()
    }

    fn artifact_stem(&self) -> String {
        self.test_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect()
    }

    fn failure_screenshot_path(&self) -> PathBuf {
        self.config
            .screenshot_dir
            .join(format!("{}-failed.png", self.artifact_stem()))
    }

    /// Render the Node script
    pub fn build(&self) -> String {
        let mut script = String::new();
        let video = match &self.config.video_dir {
            Some(dir) => format!(
                "\n    recordVideo: {{ dir: {}, size: {{ width: {}, height: {} }} }},",
                js(&dir.to_string_lossy()),
                self.config.viewport_width,
                self.config.viewport_height
            ),
            None => String::new(),
        };

        script.push_str(&format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const {{ expect }} = require('@playwright/test');

const emit = (event) => console.log('{prefix}' + JSON.stringify(event));

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }},{video}
  }});
  context.setDefaultTimeout({timeout});
  const page = await context.newPage();
  const baseUrl = {base_url};
  const timeout = {timeout};

  const step = async (index, body) => {{
    const started = Date.now();
    try {{
      await body();
    }} catch (error) {{
      emit({{ event: 'step', index, ok: false, duration_ms: Date.now() - started, error: error.message }});
      throw error;
    }}
    emit({{ event: 'step', index, ok: true, duration_ms: Date.now() - started }});
  }};

  let ok = true;
  let failure_screenshot = null;
  try {{
"#,
            prefix = EVENT_PREFIX,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = self.config.viewport_width,
            height = self.config.viewport_height,
            video = video,
            timeout = self.config.timeout_ms,
            base_url = js(self.config.base_url.trim_end_matches('/')),
        ));

        for op in &self.ops {
            match op {
                ScriptOp::Step { index, name, step } => {
                    script.push_str(&format!("\n    // Step {}: {}\n", index + 1, comment(name)));
                    script.push_str(&format!("    await step({}, async () => {{\n", index));
                    script.push_str(&self.step_to_js(step));
                    script.push_str("\n    });\n");
                }
                ScriptOp::SeedStorage { key, value } => {
                    script.push_str(&format!(
                        "\n    await context.addInitScript(([k, v]) => window.localStorage.setItem(k, v), [{}, {}]);\n",
                        js(key),
                        js(value)
                    ));
                }
            }
        }

        script.push_str(&format!(
            r#"
  }} catch (error) {{
    ok = false;
    failure_screenshot = {shot};
    await page.screenshot({{ path: failure_screenshot, fullPage: true }}).catch(() => {{ failure_screenshot = null; }});
    console.error(error.stack || error.message);
  }} finally {{
    await context.close();
    await browser.close();
  }}
  emit({{ event: 'finish', ok, failure_screenshot }});
  process.exit(ok ? 0 : 1);
}})();
"#,
            shot = js(&self.failure_screenshot_path().to_string_lossy()),
        ));

        script
    }

    /// Convert a step to JavaScript code
    fn step_to_js(&self, step: &TestStep) -> String {
        match step {
            TestStep::Visit { url } => {
                if url.starts_with("http://") || url.starts_with("https://") {
                    format!("      await page.goto({});", js(url))
                } else {
                    format!("      await page.goto(baseUrl + {});", js(url))
                }
            }
            TestStep::Click { target, timeout_ms } => {
                let timeout = timeout_ms
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "timeout".to_string());
                format!("      await {}.click({{ timeout: {} }});", locator(target), timeout)
            }
            TestStep::Type { target, text, delay_ms } => {
                format!(
                    "      await {}.pressSequentially({}, {{ delay: {} }});",
                    locator(target),
                    js(text),
                    delay_ms.unwrap_or(10)
                )
            }
            TestStep::Fill { target, value, clear_first } => {
                let loc = locator(target);
                if *clear_first {
                    format!("      await {loc}.clear();\n      await {loc}.fill({});", js(value))
                } else {
                    format!("      await {}.fill({});", loc, js(value))
                }
            }
            TestStep::Press { selector, key } => match selector {
                Some(sel) => format!("      await page.locator({}).press({});", js(sel), js(key)),
                None => format!("      await page.keyboard.press({});", js(key)),
            },
            TestStep::Submit { target } => {
                let target = if target.selector.is_none() && target.contains.is_none() {
                    Target::css("form")
                } else {
                    target.clone()
                };
                format!(
                    "      await {}.evaluate((form) => form.requestSubmit());",
                    locator(&target)
                )
            }
            TestStep::Wait { target, timeout_ms, state } => {
                let timeout = timeout_ms
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "timeout".to_string());
                format!(
                    "      await {}.waitFor({{ state: '{}', timeout: {} }});",
                    locator(target),
                    state.as_str(),
                    timeout
                )
            }
            TestStep::Sleep { ms } => format!("      await page.waitForTimeout({});", ms),
            TestStep::Assert { target, visible, text, text_contains, has_class, lacks_class, attribute, count } => {
                let loc = locator(target);
                let mut assertions = Vec::new();

                match visible {
                    Some(true) => assertions.push(format!("      await expect({}).toBeVisible({{ timeout }});", loc)),
                    Some(false) => assertions.push(format!("      await expect({}).toBeHidden({{ timeout }});", loc)),
                    None => {}
                }

                if let Some(t) = text {
                    assertions.push(format!("      await expect({}).toHaveText({}, {{ timeout }});", loc, js(t)));
                }

                if let Some(tc) = text_contains {
                    assertions.push(format!("      await expect({}).toContainText({}, {{ timeout }});", loc, js(tc)));
                }

                if let Some(class) = has_class {
                    assertions.push(format!(
                        "      await expect({}).toHaveClass({}, {{ timeout }});",
                        loc,
                        js_regex_class(class)
                    ));
                }

                if let Some(class) = lacks_class {
                    assertions.push(format!(
                        "      await expect({}).not.toHaveClass({}, {{ timeout }});",
                        loc,
                        js_regex_class(class)
                    ));
                }

                if let Some(attr) = attribute {
                    assertions.push(attribute_assertion(&loc, attr));
                }

                if let Some(c) = count {
                    assertions.push(format!("      await expect({}).toHaveCount({}, {{ timeout }});", loc, c));
                }

                if assertions.is_empty() {
                    assertions.push(format!("      await expect({}).toBeAttached({{ timeout }});", loc));
                }

                assertions.join("\n")
            }
            TestStep::AssertUrl { contains, not_contains, equals } => {
                let mut assertions = Vec::new();
                if let Some(s) = contains {
                    assertions.push(format!(
                        "      await expect(page).toHaveURL({}, {{ timeout }});",
                        js_regex_contains(s)
                    ));
                }
                if let Some(s) = not_contains {
                    assertions.push(format!(
                        "      await expect(page).not.toHaveURL({}, {{ timeout }});",
                        js_regex_contains(s)
                    ));
                }
                if let Some(s) = equals {
                    assertions.push(format!(
                        "      await expect(page).toHaveURL(new URL({}, baseUrl + '/').href, {{ timeout }});",
                        js(s)
                    ));
                }
                assertions.join("\n")
            }
            TestStep::AssertPath { equals } => format!(
                "      await expect.poll(() => new URL(page.url()).pathname, {{ timeout }}).toBe({});",
                js(equals)
            ),
            TestStep::Screenshot { name, selector, full_page } => {
                let path = self.config.screenshot_dir.join(format!("{}.png", name));
                let path = js(&path.to_string_lossy());
                match selector {
                    Some(sel) => format!("      await page.locator({}).screenshot({{ path: {} }});", js(sel), path),
                    None => format!("      await page.screenshot({{ path: {}, fullPage: {} }});", path, full_page),
                }
            }
            TestStep::Reload => "      await page.reload();".to_string(),
            TestStep::Log { message } => format!("      console.log('[TEST]', {});", js(message)),
            TestStep::RegisterUser { .. } | TestStep::Login { .. } | TestStep::Task { .. } => {
                format!("      // {} runs outside the browser", comment(&step.name()))
            }
        }
    }

    /// Fold script events into per-step results
    pub fn report(&self, events: &[ScriptEvent]) -> ScriptReport {
        let mut report = ScriptReport::default();
        let mut finished = false;

        for event in events {
            match event {
                ScriptEvent::Step { index, ok, duration_ms, error } => {
                    let screenshot_path = self.ops.iter().find_map(|op| match op {
                        ScriptOp::Step { index: i, step: TestStep::Screenshot { name, .. }, .. }
                            if i == index && *ok =>
                        {
                            Some(self.config.screenshot_dir.join(format!("{}.png", name)))
                        }
                        _ => None,
                    });
                    report.steps.push(StepResult {
                        success: *ok,
                        step_name: self
                            .step_names
                            .get(*index)
                            .cloned()
                            .unwrap_or_else(|| format!("step:{}", index)),
                        duration_ms: *duration_ms,
                        error: error.clone(),
                        screenshot_path,
                    });
                }
                ScriptEvent::Finish { ok, failure_screenshot } => {
                    finished = true;
                    report.success = *ok;
                    report.failure_screenshot = failure_screenshot.clone();
                }
            }
        }

        if !finished {
            report.success = false;
        }
        report.success = report.success && report.steps.iter().all(|s| s.success);
        report
    }

    pub fn screenshot_dir(&self) -> &Path {
        &self.config.screenshot_dir
    }
}

fn attribute_assertion(loc: &str, attr: &AttributeAssertion) -> String {
    match (&attr.value, &attr.contains) {
        (Some(val), _) => format!(
            "      await expect({}).toHaveAttribute({}, {}, {{ timeout }});",
            loc,
            js(&attr.name),
            js(val)
        ),
        (None, Some(part)) => format!(
            "      await expect({}).toHaveAttribute({}, {}, {{ timeout }});",
            loc,
            js(&attr.name),
            js_regex_contains(part)
        ),
        (None, None) => format!(
            "      await expect({}).toHaveAttribute({}, {{ timeout }});",
            loc,
            js(&attr.name)
        ),
    }
}

impl LocalStorage for ScriptBuilder {
    /// Installs the entry for every page load that follows in this script
    fn set_item(&mut self, key: &str, value: &str) {
        self.ops.push(ScriptOp::SeedStorage {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TOKEN_STORAGE_KEY;
    use crate::spec::TestSpec;

    fn builder() -> ScriptBuilder {
        ScriptBuilder::new(
            PlaywrightConfig {
                base_url: "http://localhost:4200/".to_string(),
                screenshot_dir: PathBuf::from("/tmp/shots"),
                ..Default::default()
            },
            "logs in",
        )
    }

    fn steps(yaml: &str) -> Vec<TestStep> {
        let spec = TestSpec::from_yaml(&format!("name: s\ntests:\n  - name: t\n    steps:\n{}", yaml)).unwrap();
        spec.tests.into_iter().next().unwrap().steps
    }

    #[test]
    fn test_script_header_uses_config() {
        let script = builder().build();
        assert!(script.contains("chromium.launch({ headless: true })"));
        assert!(script.contains("viewport: { width: 1000, height: 1000 }"));
        assert!(script.contains(r#"const baseUrl = "http://localhost:4200";"#));
        assert!(script.contains("context.setDefaultTimeout(4000)"));
        assert!(!script.contains("recordVideo"));
        assert!(script.contains("/tmp/shots/logs-in-failed.png"));
    }

    #[test]
    fn test_video_recording() {
        let mut config = builder().config;
        config.video_dir = Some(PathBuf::from("/tmp/videos"));
        let script = ScriptBuilder::new(config, "t").build();
        assert!(script.contains(r#"recordVideo: { dir: "/tmp/videos""#));
    }

    #[test]
    fn test_click_by_text() {
        let mut b = builder();
        for step in steps("      - action: click\n        selector: li\n        contains: Sign in\n") {
            b.push_step(step);
        }
        let script = b.build();
        assert!(script.contains(r#"await page.locator("li", { hasText: new RegExp("Sign in") }).first().click({ timeout: timeout });"#));
        assert!(script.contains("// Step 1: click:li[Sign in]"));
    }

    #[test]
    fn test_text_filter_is_case_sensitive_regex() {
        let mut b = builder();
        b.push_step(TestStep::Assert {
            target: Target { selector: None, contains: Some("visitor (new)".to_string()) },
            visible: Some(true),
            text: None,
            text_contains: None,
            has_class: None,
            lacks_class: None,
            attribute: None,
            count: None,
        });
        let script = b.build();
        assert!(script.contains(r#"page.getByText(new RegExp("visitor \\(new\\)")).first()"#));
        assert!(!script.contains(r#"getByText("visitor"#));
    }

    #[test]
    fn test_newlines_in_step_names_stay_in_comments() {
        let mut b = builder();
        b.push_step(TestStep::Log { message: "hi\nthrow 1".to_string() });
        b.push_step(TestStep::Click {
            target: Target { selector: Some("li".to_string()), contains: Some("a\r\nb\u{2028}c".to_string()) },
            timeout_ms: None,
        });
        b.push_step(TestStep::Task { name: "x\nprocess.exit(0)".to_string() });
        let script = b.build();

        assert!(script.lines().all(|l| l.trim() != "throw 1"));
        assert!(script.contains("// Step 1: log:hi throw 1"));
        assert!(script.contains("// Step 2: click:li[a  b c]"));
        assert!(script.contains("// task:x process.exit(0) runs outside the browser"));
        assert!(!script.contains('\u{2028}'));
    }

    #[test]
    fn test_strings_are_escaped() {
        let mut b = builder();
        b.push_step(TestStep::Type {
            target: Target::css(r#"input[formcontrolname="username"]"#),
            text: "it's \"quoted\"".to_string(),
            delay_ms: None,
        });
        let script = b.build();
        assert!(script.contains(r#"page.locator("input[formcontrolname=\"username\"]")"#));
        assert!(script.contains(r#"pressSequentially("it's \"quoted\"", { delay: 10 })"#));
    }

    #[test]
    fn test_class_and_url_assertions() {
        let mut b = builder();
        let yaml = "      - action: assert\n        selector: span.nav-link\n        contains: Global Feed\n        lacks_class: active\n      - action: assert_url\n        not_contains: /login\n      - action: assert_path\n        equals: /\n";
        for step in steps(yaml) {
            b.push_step(step);
        }
        let script = b.build();
        assert!(script.contains(r#".not.toHaveClass(new RegExp("(^|\\s)active(\\s|$)"), { timeout })"#));
        assert!(script.contains(r#"await expect(page).not.toHaveURL(new RegExp("/login"), { timeout });"#));
        assert!(script.contains(r#"expect.poll(() => new URL(page.url()).pathname, { timeout }).toBe("/")"#));
    }

    #[test]
    fn test_submit_defaults_to_form() {
        let mut b = builder();
        b.push_step(TestStep::Submit { target: Target::default() });
        assert!(b.build().contains(r#"await page.locator("form").evaluate((form) => form.requestSubmit());"#));
    }

    #[test]
    fn test_storage_seed_precedes_following_visit() {
        let mut b = builder();
        b.set_item(TOKEN_STORAGE_KEY, "token-123");
        b.push_step(TestStep::Visit { url: "/".to_string() });
        let script = b.build();

        let seed = script
            .find(r#"addInitScript(([k, v]) => window.localStorage.setItem(k, v), ["jwt", "token-123"])"#)
            .unwrap();
        let visit = script.find(r#"await page.goto(baseUrl + "/");"#).unwrap();
        assert!(seed < visit);
        assert_eq!(b.step_count(), 1);
    }

    #[test]
    fn test_parse_events_ignores_noise() {
        let stdout = format!(
            "[TEST] hello\n{p}{{\"event\":\"step\",\"index\":0,\"ok\":true,\"duration_ms\":12}}\n{p}{{\"event\":\"step\",\"index\":1,\"ok\":false,\"duration_ms\":4000,\"error\":\"Timed out\"}}\n{p}{{\"event\":\"finish\",\"ok\":false,\"failure_screenshot\":\"/tmp/shots/x.png\"}}\n",
            p = EVENT_PREFIX
        );
        let events = parse_events(&stdout).unwrap();
        assert_eq!(events.len(), 3);

        let mut b = builder();
        b.push_step(TestStep::Visit { url: "/".to_string() });
        b.push_step(TestStep::Click { target: Target::css("button"), timeout_ms: None });
        let report = b.report(&events);

        assert!(!report.success);
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.steps[1].step_name, "click:button");
        assert_eq!(report.steps[1].error.as_deref(), Some("Timed out"));
        assert_eq!(report.failure_screenshot, Some(PathBuf::from("/tmp/shots/x.png")));
    }

    #[test]
    fn test_report_without_finish_is_failure() {
        let mut b = builder();
        b.push_step(TestStep::Visit { url: "/".to_string() });
        let events = vec![ScriptEvent::Step { index: 0, ok: true, duration_ms: 5, error: None }];
        assert!(!b.report(&events).success);
    }

    #[test]
    fn test_browser_from_str() {
        assert_eq!("firefox".parse::<Browser>().unwrap(), Browser::Firefox);
        assert!("lynx".parse::<Browser>().is_err());
    }
}
