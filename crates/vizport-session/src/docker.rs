use std::path::Path;
use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;

use crate::runtime::{ProcessController, WorkloadLauncher, WorkloadSpec};

const DEFAULT_IMAGE: &str = "cellxgene";
const DEFAULT_CONTAINER_PORT: u16 = 5005;

/// Launches and stops workload containers through the Docker CLI.
///
/// The dataset's directory is mounted read-only at `/data/` and the
/// container's serving port is published on the assigned host port.
/// Containers are stopped by publish-port lookup rather than a stored
/// handle, so a restarted daemon or a recovered control process can
/// still tear sessions down.
pub struct DockerRuntime {
    image: String,
    container_port: u16,
}

impl DockerRuntime {
    pub fn new(image: impl Into<String>, container_port: u16) -> Self {
        Self {
            image: image.into(),
            container_port,
        }
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE, DEFAULT_CONTAINER_PORT)
    }
}

#[async_trait::async_trait]
impl WorkloadLauncher for DockerRuntime {
    async fn launch(&self, port: u16, workload: &WorkloadSpec) -> anyhow::Result<()> {
        let dataset = workload.dataset.as_path();
        let dir = dataset.parent().unwrap_or_else(|| Path::new("/"));
        let file = dataset
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| {
                anyhow::anyhow!("dataset path has no file name: {}", dataset.display())
            })?;

        let mut cmd = Command::new("docker");
        cmd.arg("run")
            .arg("-v")
            .arg(format!("{}:/data/:ro", dir.display()))
            .arg("-p")
            .arg(format!("{port}:{}", self.container_port))
            .arg(&self.image)
            .arg("launch")
            .arg("--host")
            .arg("0.0.0.0")
            .arg(format!("/data/{file}"))
            .arg("--disable-diffexp")
            .arg("--disable-annotations")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn docker run for port {port}"))?;
        tracing::info!(port, image = %self.image, "workload container spawned");

        // Reap the child in the background; shutdown goes through
        // `docker stop`, not this handle.
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        Ok(())
    }
}

#[async_trait::async_trait]
impl ProcessController for DockerRuntime {
    async fn stop_by_port(&self, port: u16) -> anyhow::Result<()> {
        let out = Command::new("docker")
            .args(["ps", "-q", "--filter"])
            .arg(format!("publish={port}"))
            .output()
            .await
            .context("query docker for published port")?;
        if !out.status.success() {
            anyhow::bail!(
                "docker ps failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }

        for container_id in String::from_utf8_lossy(&out.stdout)
            .lines()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            let status = Command::new("docker")
                .args(["stop", container_id])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .with_context(|| format!("run docker stop {container_id}"))?;
            if !status.success() {
                anyhow::bail!("docker stop {container_id} exited with {status}");
            }
            tracing::info!(port, container_id, "container stopped");
        }

        Ok(())
    }
}
