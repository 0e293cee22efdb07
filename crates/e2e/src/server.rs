//! Server management - spawning and health checking the app under test

use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::AppServerConfig;
use crate::error::{E2eError, E2eResult};

/// Handle to a running application process
pub struct ServerHandle {
    child: Option<Child>,
    pub health_url: String,
}

impl ServerHandle {
    /// Spawn the application and wait until it answers health checks
    pub async fn spawn(config: &AppServerConfig, base_url: &str) -> E2eResult<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| E2eError::ServerStartup("empty server command".to_string()))?;
        let health_url = config
            .health_url
            .clone()
            .unwrap_or_else(|| base_url.to_string());

        info!("Spawning app under test: {} {}", program, args.join(" "));

        let child = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| E2eError::ServerStartup(format!("Failed to spawn {}: {}", program, e)))?;

        let mut handle = ServerHandle { child: Some(child), health_url };

        if let Err(e) = wait_for_healthy(&handle.health_url, Duration::from_secs(config.startup_timeout_secs)).await {
            handle.stop()?;
            return Err(e);
        }

        info!("App is healthy at {}", handle.health_url);
        Ok(handle)
    }

    /// Stop the application; later calls are no-ops
    pub fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        info!("Stopping app (pid: {})", child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        // Force kill if still running
        let _ = child.kill();
        let _ = child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Poll `url` every 100ms until it answers 2xx or `timeout_duration` elapses
pub async fn wait_for_healthy(url: &str, timeout_duration: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = std::time::Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout_duration {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                return Ok(());
            }
            Ok(resp) => {
                warn!("Health check returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for app to start...");
                }
                // Connection refused is expected while the app is starting
                if !e.is_connect() {
                    warn!("Health check error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(100)).await;
    }

    Err(E2eError::ServerHealthCheck(attempts))
}
