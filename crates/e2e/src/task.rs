//! Named task hooks invoked from specs (`action: task`)

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::TaskConfig;
use crate::error::{E2eError, E2eResult};

/// Resets the application's database between registration specs
pub const CLEAN_DATABASE: &str = "clean_database";

#[async_trait]
pub trait Task: Send + Sync {
    async fn run(&self, name: &str) -> E2eResult<serde_json::Value>;
}

/// Placeholder for hooks with no backing mechanism yet
pub struct NoopTask;

#[async_trait]
impl Task for NoopTask {
    async fn run(&self, name: &str) -> E2eResult<serde_json::Value> {
        debug!("Task '{}' has no command bound, skipping", name);
        Ok(serde_json::Value::Null)
    }
}

/// Runs an external program; its trimmed stdout is the task's value
pub struct CommandTask {
    program: String,
    args: Vec<String>,
}

impl CommandTask {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl Task for CommandTask {
    async fn run(&self, name: &str) -> E2eResult<serde_json::Value> {
        info!("Running task '{}': {} {}", name, self.program, self.args.join(" "));

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| E2eError::TaskFailed {
                name: name.to_string(),
                reason: format!("failed to spawn {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(E2eError::TaskFailed {
                name: name.to_string(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if stdout.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::Value::String(stdout)
        })
    }
}

/// Task name -> implementation
#[derive(Clone)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<dyn Task>>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        let mut registry = Self {
            tasks: HashMap::new(),
        };
        registry.register(CLEAN_DATABASE, NoopTask);
        registry
    }
}

impl TaskRegistry {
    /// Built-in tasks, with configured commands layered on top
    pub fn from_config(tasks: &HashMap<String, TaskConfig>) -> Self {
        let mut registry = Self::default();
        for (name, task) in tasks {
            match task.command.split_first() {
                Some((program, args)) => {
                    registry.register(name, CommandTask::new(program.clone(), args.to_vec()))
                }
                None => registry.register(name, NoopTask),
            }
        }
        registry
    }

    pub fn register(&mut self, name: &str, task: impl Task + 'static) {
        self.tasks.insert(name.to_string(), Arc::new(task));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub async fn run(&self, name: &str) -> E2eResult<serde_json::Value> {
        let task = self
            .tasks
            .get(name)
            .ok_or_else(|| E2eError::TaskNotFound(name.to_string()))?;
        task.run(name).await
    }
}
