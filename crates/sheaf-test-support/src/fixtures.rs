//! Test fixtures and environment helpers.

use std::path::Path;
use std::process::Command;

use serde_json::json;
use sheaf_core::BulkCommand;

/// Returns `true` if a Docker daemon is reachable for integration tests.
#[must_use]
pub fn docker_available() -> bool {
    docker_available_with_host(std::env::var("DOCKER_HOST").ok())
}

fn docker_available_with_host(host: Option<String>) -> bool {
    if let Some(host) = host {
        if let Some(path) = host.strip_prefix("unix://") {
            return Path::new(path).exists();
        }
        return true;
    }

    Path::new("/var/run/docker.sock").exists()
        || Command::new("docker")
            .args(["info"])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
}

/// Representative command exercising every optional field.
#[must_use]
pub fn sample_command() -> BulkCommand {
    BulkCommand::new("default")
        .with_username("Administrator")
        .with_query("SELECT * FROM Document WHERE ecm:parentId = 'workspaces'")
        .with_action("setProperties")
        .with_param("dc:description", json!("bulk updated"))
        .with_param("limit", json!(1_000))
}

/// Minimal command carrying only the mandatory repository.
#[must_use]
pub fn repository_command(repository: &str) -> BulkCommand {
    BulkCommand::new(repository)
}
