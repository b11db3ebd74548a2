//! Container lifecycle for remote prediction services.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::process::Command;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

/// Errors reported by a [`ContainerRuntime`].
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The runtime program could not be started.
    #[error("could not run {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The runtime ran but reported failure.
    #[error("`{command}` failed: {stderr}")]
    Command {
        /// The command line that failed.
        command: String,
        /// Captured standard error.
        stderr: String,
    },
}

/// Host-side binding of a container port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    /// Port the service listens on inside the container.
    pub container_port: String,
    /// Host address to bind.
    pub bind_address: String,
    /// Host port to bind.
    pub host_port: u16,
}

/// Something that can pull, start, stop, and remove service containers.
pub trait ContainerRuntime: fmt::Debug + Send + Sync {
    /// Fetches `image` into the local image cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be fetched.
    fn pull(&self, image: &str) -> Result<(), ProvisionError>;

    /// Starts a detached container of `image` and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    fn start(&self, image: &str, ports: &PortBinding) -> Result<String, ProvisionError>;

    /// Stops a running container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be stopped.
    fn stop(&self, container: &str) -> Result<(), ProvisionError>;

    /// Removes a stopped container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be removed.
    fn remove(&self, container: &str) -> Result<(), ProvisionError>;
}

/// [`ContainerRuntime`] backed by the `docker` command line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: OsString,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    /// Uses `program` as the docker client binary.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, ProvisionError> {
        let program = self.program.to_string_lossy().into_owned();
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| ProvisionError::Spawn {
                program: program.clone(),
                source,
            })?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(ProvisionError::Command {
                command: format!("{program} {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl ContainerRuntime for DockerCli {
    fn pull(&self, image: &str) -> Result<(), ProvisionError> {
        self.run(&["pull", image]).map(drop)
    }

    fn start(&self, image: &str, ports: &PortBinding) -> Result<String, ProvisionError> {
        let publish = format!(
            "{}:{}:{}/tcp",
            ports.bind_address, ports.host_port, ports.container_port
        );
        self.run(&["run", "-d", "-p", &publish, image])
    }

    fn stop(&self, container: &str) -> Result<(), ProvisionError> {
        self.run(&["stop", container]).map(drop)
    }

    fn remove(&self, container: &str) -> Result<(), ProvisionError> {
        self.run(&["rm", container]).map(drop)
    }
}

/// A running service container, stopped and removed exactly once when the
/// guard is released or dropped.
pub struct ProvisionedService {
    runtime: Arc<dyn ContainerRuntime>,
    container: String,
    released: bool,
}

impl fmt::Debug for ProvisionedService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionedService")
            .field("container", &self.container)
            .field("released", &self.released)
            .finish()
    }
}

impl ProvisionedService {
    /// Pulls `image` and starts it. A failed pull is logged and the start is
    /// attempted with whatever image is cached locally.
    ///
    /// # Errors
    ///
    /// Returns the runtime error if the container cannot be started.
    pub fn provision(
        runtime: Arc<dyn ContainerRuntime>,
        image: &str,
        ports: &PortBinding,
    ) -> Result<Self, ProvisionError> {
        if let Err(error) = runtime.pull(image) {
            warn!(image, %error, "could not fetch image");
        }
        let container = runtime.start(image, ports)?;
        info!(image, container = %container, host_port = ports.host_port, "service container started");
        Ok(Self {
            runtime,
            container,
            released: false,
        })
    }

    /// Returns the container id.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Stops and removes the container. Later calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        info!(container = %self.container, "stopping service container");
        if let Err(error) = self.runtime.stop(&self.container) {
            warn!(container = %self.container, %error, "could not stop container");
        }
        if let Err(error) = self.runtime.remove(&self.container) {
            warn!(container = %self.container, %error, "could not remove container");
        }
    }
}

impl Drop for ProvisionedService {
    fn drop(&mut self) {
        self.release();
    }
}
