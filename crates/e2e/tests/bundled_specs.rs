//! The specs and configuration shipped with the crate must load cleanly

use std::path::{Path, PathBuf};

use conduit_e2e::spec::Target;
use conduit_e2e::{SuiteConfig, TestSpec, TestStep};

fn crate_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn load(name: &str) -> TestSpec {
    TestSpec::from_file(&crate_dir().join("specs").join(name)).unwrap()
}

#[test]
fn shipped_config_matches_defaults() {
    let config = SuiteConfig::load(&crate_dir().join("conduit-e2e.yaml"), |_| None).unwrap();
    assert_eq!(config.api_url, "http://localhost:80");
    assert_eq!(config.user.email, "tester@test.com");
    assert_eq!(config.user.username, "testuser");
    assert_eq!((config.viewport.width, config.viewport.height), (1000, 1000));
    assert!(config.video);
    assert_eq!(config.project_id.as_deref(), Some("bh5j1d"));
    assert!(config.tasks.contains_key("clean_database"));
}

#[test]
fn pattern_finds_every_bundled_spec() {
    let specs = TestSpec::load_matching(&crate_dir(), "specs/**/*.yaml").unwrap();
    let mut names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["Conduit Login", "Register", "Session"]);
}

#[test]
fn login_spec_registers_default_user_first() {
    let spec = load("login.yaml");
    assert!(matches!(&spec.before[..], [TestStep::RegisterUser { .. }]));
    assert!(matches!(&spec.before_each[..], [TestStep::Visit { url }] if url == "/"));

    let wrong = &spec.tests[0];
    assert_eq!(wrong.name, "does not work with wrong credentials");
    assert!(matches!(
        wrong.steps.last(),
        Some(TestStep::AssertUrl { contains: Some(c), .. }) if c == "/login"
    ));

    let ok = &spec.tests[1];
    let feeds: Vec<_> = ok
        .steps
        .iter()
        .filter_map(|s| match s {
            TestStep::Assert { target, has_class, lacks_class, .. } => {
                Some((target.contains.clone(), has_class.clone(), lacks_class.clone()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        feeds,
        vec![
            (Some("Your Feed".to_string()), Some("active".to_string()), None),
            (Some("Global Feed".to_string()), None, Some("active".to_string())),
        ]
    );
}

#[test]
fn login_spec_renders_configured_credentials() {
    let spec = load("login.yaml");
    let config = SuiteConfig {
        user: conduit_e2e::TestUser {
            email: "ci@test.com".to_string(),
            password: "ci-secret".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    let typed: Vec<String> = spec.tests[1]
        .steps
        .iter()
        .map(|s| s.render(&config).unwrap())
        .filter_map(|s| match s {
            TestStep::Type { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(typed, ["ci@test.com", "ci-secret"]);
}

#[test]
fn register_spec_cleans_database_and_fills_form() {
    let spec = load("register.yaml");
    assert!(matches!(&spec.before_each[0], TestStep::Task { name } if name == "clean_database"));

    let steps = &spec.tests[0].steps;
    let typed: Vec<_> = steps
        .iter()
        .filter_map(|s| match s {
            TestStep::Type { target, text, .. } => Some((target.clone(), text.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(
        typed,
        [
            (Target::css(r#"input[formcontrolname="username"]"#), "visitor"),
            (Target::css(r#"input[formcontrolname="email"]"#), "visitor@email.com"),
            (Target::css(r#"input[formcontrolname="password"]"#), "visiting"),
        ]
    );
    assert!(steps.iter().any(|s| matches!(s, TestStep::AssertPath { equals } if equals == "/")));
    assert!(matches!(
        steps.last(),
        Some(TestStep::Assert { target, visible: Some(true), .. })
            if target.selector.is_none() && target.contains.as_deref() == Some("visitor")
    ));
}

#[test]
fn session_spec_logs_in_before_visiting() {
    let spec = load("session.yaml");
    let steps = &spec.tests[0].steps;
    assert!(matches!(steps[0], TestStep::Login { email: None, password: None }));
    assert!(matches!(&steps[1], TestStep::Visit { .. }));
}

#[test]
fn missing_spec_file_is_an_error() {
    assert!(TestSpec::from_file(Path::new("specs/does-not-exist.yaml")).is_err());
}
