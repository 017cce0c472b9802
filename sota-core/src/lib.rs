pub mod config;
pub mod credentials;
pub mod env_file;
pub mod error;
pub mod ids;
pub mod import;
pub mod runtime;
pub mod workflow;

pub use self::config::DeployConfig;
pub use credentials::{synthesize, Credential, CredentialFamily, CredentialIds, CredentialSet};
pub use env_file::{repair_env_file, ApiKey, EnvFile, EnvSecrets, RecoveredKeys};
pub use error::DeployError;
pub use ids::{IdGenerator, RandomIds, SequenceIds};
pub use import::{import_credentials, import_workflow, ImportOutcome};
pub use runtime::{CommandOutput, ContainerRuntime, DockerCli};
pub use workflow::{patch_workflow, IdRemap, LEGACY_IDS};
