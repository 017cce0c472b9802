//! Import of credentials and workflows into the running n8n container
//!
//! Both imports follow the same three steps: write a scratch file on the host,
//! copy it into the container, run `n8n import:*` against the copy. A non-zero
//! exit stops the sequence and the captured stderr is reported.

use crate::config::DeployConfig;
use crate::credentials::Credential;
use crate::error::{DeployError, Result};
use crate::runtime::ContainerRuntime;
use crate::workflow::{patch_workflow, IdRemap};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Nothing to import; the container was not touched
    Skipped,
    /// `count` credentials, or credential references updated for workflows
    Imported { count: usize },
    CopyFailed { stderr: String },
    ImportFailed { stderr: String },
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ImportOutcome::Imported { .. })
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|e| DeployError::io(path, e))
}

/// Copy `local` to `container_path` and run `n8n <subcommand> --input=<container_path>`.
fn copy_and_import(
    local: &Path,
    container_path: &str,
    subcommand: &str,
    runtime: &dyn ContainerRuntime,
    config: &DeployConfig,
    count: usize,
) -> Result<ImportOutcome> {
    let container = &config.container.name;

    let copy = runtime.copy_into(local, container, container_path)?;
    if !copy.success {
        return Ok(ImportOutcome::CopyFailed { stderr: copy.stderr });
    }

    let input = format!("--input={}", container_path);
    let import = runtime.exec(
        container,
        &[config.container.n8n_binary.as_str(), subcommand, input.as_str()],
    )?;
    if !import.success {
        return Ok(ImportOutcome::ImportFailed { stderr: import.stderr });
    }

    Ok(ImportOutcome::Imported { count })
}

/// Serialize `credentials` and import them with `n8n import:credentials`.
pub fn import_credentials(
    credentials: &[Credential],
    runtime: &dyn ContainerRuntime,
    config: &DeployConfig,
) -> Result<ImportOutcome> {
    if credentials.is_empty() {
        tracing::warn!("No credentials to import");
        return Ok(ImportOutcome::Skipped);
    }

    let scratch = &config.paths.credentials_tmp;
    write_json(scratch, credentials)?;

    let outcome = copy_and_import(
        scratch,
        &config.container.credentials_path,
        "import:credentials",
        runtime,
        config,
        credentials.len(),
    )?;

    match &outcome {
        ImportOutcome::Imported { count } => tracing::info!("✅ Imported {} credentials", count),
        ImportOutcome::CopyFailed { stderr } => tracing::error!("❌ Copy failed: {}", stderr.trim()),
        ImportOutcome::ImportFailed { stderr } => tracing::error!("❌ Import failed: {}", stderr.trim()),
        ImportOutcome::Skipped => {}
    }
    Ok(outcome)
}

/// Patch the workflow at `path` with `remap` and import it with `n8n import:workflow`.
///
/// On success the outcome carries the number of credential references updated.
/// Unreadable or malformed JSON is an error, not an outcome.
pub fn import_workflow(
    path: &Path,
    remap: &IdRemap,
    runtime: &dyn ContainerRuntime,
    config: &DeployConfig,
) -> Result<ImportOutcome> {
    tracing::info!("Processing: {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
    let mut workflow: Value = serde_json::from_str(&content)?;
    let updates = patch_workflow(&mut workflow, remap);

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workflow.json".to_string());
    let scratch = config.paths.workflow_tmp(&file_name);
    write_json(&scratch, &workflow)?;

    let outcome = copy_and_import(
        &scratch,
        &config.container.workflow_path,
        "import:workflow",
        runtime,
        config,
        updates,
    )?;

    match &outcome {
        ImportOutcome::Imported { count } => {
            tracing::info!("  ✅ Imported with {} credential updates", count)
        }
        ImportOutcome::CopyFailed { stderr } | ImportOutcome::ImportFailed { stderr } => {
            tracing::error!("  ❌ Import failed: {}", stderr.trim())
        }
        ImportOutcome::Skipped => {}
    }
    Ok(outcome)
}
