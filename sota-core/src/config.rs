use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DeployConfig {
    pub env: EnvConfig,
    pub container: ContainerConfig,
    pub paths: TempPaths,
    pub credentials: CredentialDefaults,
    pub workflows: WorkflowsConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EnvConfig {
    pub path: PathBuf,
    /// Value that marks a key as "not configured"
    pub placeholder: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".env"),
            placeholder: "xxxxxx".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ContainerConfig {
    /// Container runtime binary (`docker`, `podman`, ...)
    pub runtime: String,
    pub name: String,
    pub credentials_path: String,
    pub workflow_path: String,
    /// Binary inside the container that performs the imports
    pub n8n_binary: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            name: "n8n".to_string(),
            credentials_path: "/tmp/creds.json".to_string(),
            workflow_path: "/tmp/import.json".to_string(),
            n8n_binary: "n8n".to_string(),
        }
    }
}

/// Host-side scratch files. Fixed paths: two concurrent runs overwrite each other.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TempPaths {
    pub credentials_tmp: PathBuf,
    pub workflow_tmp_prefix: String,
}

impl Default for TempPaths {
    fn default() -> Self {
        Self {
            credentials_tmp: PathBuf::from("/tmp/sota_creds.json"),
            workflow_tmp_prefix: "/tmp/sota_workflow_".to_string(),
        }
    }
}

impl TempPaths {
    pub fn workflow_tmp(&self, file_name: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.workflow_tmp_prefix, file_name))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CredentialDefaults {
    /// Suffix for every credential display name, e.g. "OpenAI SOTA RAG"
    pub label: String,
    pub supabase_host: String,
    pub postgres_host: String,
    pub postgres_port: u16,
    pub postgres_database: String,
    pub postgres_user: String,
}

impl Default for CredentialDefaults {
    fn default() -> Self {
        Self {
            label: "SOTA RAG".to_string(),
            supabase_host: "http://kong:8000".to_string(),
            postgres_host: "supabase-db".to_string(),
            postgres_port: 5432,
            postgres_database: "postgres".to_string(),
            postgres_user: "supabase_admin".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorkflowsConfig {
    /// Imported in order; dependencies first
    pub files: Vec<PathBuf>,
}

impl Default for WorkflowsConfig {
    fn default() -> Self {
        Self {
            files: vec![
                PathBuf::from("workflows/sota/knowledge-graph.json"),
                PathBuf::from("workflows/sota/main-sota-rag.json"),
            ],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5678".to_string(),
        }
    }
}

impl DeployConfig {
    /// Layers an optional TOML file and `SOTA_DEPLOY__SECTION__KEY` env vars over the defaults.
    ///
    /// `SOTA_DEPLOY__WORKFLOWS__FILES` takes a comma-separated list.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("SOTA_DEPLOY")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("workflows.files"),
            )
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_stack_layout() {
        let config = DeployConfig::default();
        assert_eq!(config.env.path, PathBuf::from(".env"));
        assert_eq!(config.container.name, "n8n");
        assert_eq!(config.container.runtime, "docker");
        assert_eq!(config.credentials.postgres_port, 5432);
        assert_eq!(config.workflows.files.len(), 2);
        assert!(config.workflows.files[0].ends_with("knowledge-graph.json"));
        assert_eq!(config.service.url, "http://localhost:5678");
    }

    #[test]
    fn test_workflow_tmp_uses_prefix() {
        let paths = TempPaths::default();
        assert_eq!(
            paths.workflow_tmp("main-sota-rag.json"),
            PathBuf::from("/tmp/sota_workflow_main-sota-rag.json")
        );
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = DeployConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.container.name, "n8n");
    }

    #[test]
    fn test_partial_file_overrides_only_given_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[container]\nname = \"n8n-staging\"\n\n[credentials]\npostgres_port = 6543").unwrap();
        drop(f);

        let config = DeployConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.container.name, "n8n-staging");
        assert_eq!(config.container.runtime, "docker");
        assert_eq!(config.credentials.postgres_port, 6543);
        assert_eq!(config.credentials.postgres_user, "supabase_admin");
    }

    #[test]
    fn test_env_workflow_list_is_split_on_commas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        std::env::set_var("SOTA_DEPLOY__WORKFLOWS__FILES", "a.json,b.json");
        let loaded = DeployConfig::load(path.to_str().unwrap());
        std::env::remove_var("SOTA_DEPLOY__WORKFLOWS__FILES");

        let config = loaded.unwrap();
        assert_eq!(
            config.workflows.files,
            vec![PathBuf::from("a.json"), PathBuf::from("b.json")]
        );
        assert_eq!(config.container.name, "n8n");
    }
}
