//! Conduit E2E Test Framework
//!
//! This crate provides a Rust-controlled E2E testing framework for the
//! Conduit blogging app that:
//! - Loads suite configuration (API root, default test user, viewport, video)
//! - Registers users and obtains tokens directly through the Conduit REST API
//! - Parses declarative YAML test specs
//! - Compiles each test case into a Playwright script and runs it with Node
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteConfig::load(path, env) -> SuiteConfig                │
//! │  SessionClient                                              │
//! │    ├── ensure_user_exists(overrides)   POST /api/users      │
//! │    ├── login_token(credentials?)       POST /api/users/login│
//! │    └── establish_session(credentials?, storage)  -> jwt     │
//! │  TestRunner                                                 │
//! │    ├── start_server() -> ServerHandle (optional)            │
//! │    ├── run_suite(spec) -> [TestResult]                      │
//! │    └── compile_case(spec, case, script) -> CompiledCase     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSpec (YAML)                                            │
//! │    ├── name, tags                                           │
//! │    ├── before: [register_user | login | task]               │
//! │    ├── before_each: [Step]                                  │
//! │    └── tests: [{ name, steps: [Step] }]                     │
//! │          ├── visit { url }                                  │
//! │          ├── click / type / fill / submit { selector?,      │
//! │          │                                  contains? }     │
//! │          ├── assert { ..., has_class?, lacks_class? }       │
//! │          ├── assert_url { contains?, not_contains? }        │
//! │          └── assert_path { equals }                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod playwright;
pub mod runner;
pub mod server;
pub mod session;
pub mod spec;
pub mod task;

pub use config::{SuiteConfig, TestUser};
pub use error::{E2eError, E2eResult};
pub use runner::{RunFilter, TestRunner};
pub use session::{Credentials, SessionClient, UserOverrides, TOKEN_STORAGE_KEY};
pub use spec::{TestSpec, TestStep};
