//! Deployment orchestration
//!
//! Runs the steps strictly in order, each one finished before the next starts:
//! 1. repair the `.env` file and recover the API keys
//! 2. build credentials from the keys and secrets, import them (fatal on failure)
//! 3. patch and import each workflow file that exists, tallying successes
//!
//! Nothing is rolled back: credentials stay imported if a workflow import fails.

use sota_core::credentials::synthesize;
use sota_core::env_file::{repair_env_file, EnvSecrets};
use sota_core::error::Result;
use sota_core::{
    import_credentials, import_workflow, ContainerRuntime, DeployConfig, IdGenerator, IdRemap,
    ImportOutcome,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStatus {
    Complete,
    /// No credentials to import, or the copy/import into the container failed
    CredentialsFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub status: DeployStatus,
    pub keys_found: Vec<&'static str>,
    pub credentials_imported: usize,
    pub workflows_imported: usize,
    pub workflows_attempted: usize,
    pub service_url: String,
}

impl DeployReport {
    pub fn exit_code(&self) -> i32 {
        match self.status {
            DeployStatus::Complete => 0,
            DeployStatus::CredentialsFailed => 1,
        }
    }
}

pub struct Deployer<'a> {
    config: &'a DeployConfig,
    runtime: &'a dyn ContainerRuntime,
    ids: &'a mut dyn IdGenerator,
}

impl<'a> Deployer<'a> {
    pub fn new(
        config: &'a DeployConfig,
        runtime: &'a dyn ContainerRuntime,
        ids: &'a mut dyn IdGenerator,
    ) -> Self {
        Self {
            config,
            runtime,
            ids,
        }
    }

    pub fn run(&mut self) -> Result<DeployReport> {
        let config = self.config;
        let env_path = &config.env.path;
        let placeholder = &config.env.placeholder;

        tracing::info!("Fixing {}...", env_path.display());
        let keys = repair_env_file(env_path, placeholder)?;
        tracing::info!("Found API keys: {:?}", keys.names());

        let mut report = DeployReport {
            status: DeployStatus::CredentialsFailed,
            keys_found: keys.names(),
            credentials_imported: 0,
            workflows_imported: 0,
            workflows_attempted: 0,
            service_url: config.service.url.clone(),
        };

        tracing::info!("Creating n8n credentials...");
        let secrets = EnvSecrets::from_env_file(env_path)?;
        let set = synthesize(&keys, &secrets, &config.credentials, placeholder, self.ids);

        match import_credentials(&set.credentials, self.runtime, config)? {
            ImportOutcome::Imported { count } => report.credentials_imported = count,
            _ => return Ok(report),
        }

        // Dependencies come first in the configured list
        let remap = IdRemap::from_set(&set);
        for path in &config.workflows.files {
            if !path.exists() {
                tracing::debug!("Skipping missing workflow {}", path.display());
                continue;
            }
            report.workflows_attempted += 1;
            if import_workflow(path, &remap, self.runtime, config)?.is_success() {
                report.workflows_imported += 1;
            }
        }

        report.status = DeployStatus::Complete;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(status: DeployStatus) -> DeployReport {
        DeployReport {
            status,
            keys_found: vec![],
            credentials_imported: 0,
            workflows_imported: 0,
            workflows_attempted: 0,
            service_url: String::new(),
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(report(DeployStatus::Complete).exit_code(), 0);
        assert_eq!(report(DeployStatus::CredentialsFailed).exit_code(), 1);
    }
}
