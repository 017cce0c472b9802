//! n8n credential records built from the recovered keys
//!
//! Every run draws one identifier per [`CredentialFamily`], whether or not a
//! record is produced for it, so the workflow remap table is always complete.

use crate::config::CredentialDefaults;
use crate::env_file::{ApiKey, EnvSecrets, RecoveredKeys};
use crate::ids::IdGenerator;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialFamily {
    OpenAi,
    Mistral,
    Supabase,
    Postgres,
    Cohere,
}

impl CredentialFamily {
    pub const ALL: [CredentialFamily; 5] = [
        CredentialFamily::OpenAi,
        CredentialFamily::Mistral,
        CredentialFamily::Supabase,
        CredentialFamily::Postgres,
        CredentialFamily::Cohere,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            CredentialFamily::OpenAi => "OpenAI",
            CredentialFamily::Mistral => "Mistral",
            CredentialFamily::Supabase => "Supabase",
            CredentialFamily::Postgres => "Postgres",
            CredentialFamily::Cohere => "Cohere",
        }
    }
}

/// n8n credential type names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CredentialType {
    #[serde(rename = "openAiApi")]
    OpenAiApi,
    #[serde(rename = "mistralCloudApi")]
    MistralCloudApi,
    #[serde(rename = "supabaseApi")]
    SupabaseApi,
    #[serde(rename = "postgres")]
    Postgres,
    #[serde(rename = "httpHeaderAuth")]
    HttpHeaderAuth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialCategory {
    ApiKey,
    HeaderAuth,
    Database,
}

impl CredentialType {
    pub fn category(self) -> CredentialCategory {
        match self {
            CredentialType::OpenAiApi | CredentialType::MistralCloudApi | CredentialType::SupabaseApi => {
                CredentialCategory::ApiKey
            }
            CredentialType::HttpHeaderAuth => CredentialCategory::HeaderAuth,
            CredentialType::Postgres => CredentialCategory::Database,
        }
    }
}

/// Type-specific `data` payload, serialized with n8n's field names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CredentialData {
    #[serde(rename_all = "camelCase")]
    ApiKey { api_key: String },
    #[serde(rename_all = "camelCase")]
    Supabase { host: String, service_role: String },
    Postgres {
        host: String,
        port: u16,
        database: String,
        user: String,
        password: String,
    },
    HeaderAuth { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CredentialType,
    pub data: CredentialData,
}

/// Identifiers drawn for this run, one per family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialIds {
    pub openai: String,
    pub mistral: String,
    pub supabase: String,
    pub postgres: String,
    pub cohere: String,
}

impl CredentialIds {
    /// Draws in family order: openai, mistral, supabase, postgres, cohere.
    pub fn generate(ids: &mut dyn IdGenerator) -> Self {
        Self {
            openai: ids.next_id(),
            mistral: ids.next_id(),
            supabase: ids.next_id(),
            postgres: ids.next_id(),
            cohere: ids.next_id(),
        }
    }

    pub fn get(&self, family: CredentialFamily) -> &str {
        match family {
            CredentialFamily::OpenAi => &self.openai,
            CredentialFamily::Mistral => &self.mistral,
            CredentialFamily::Supabase => &self.supabase,
            CredentialFamily::Postgres => &self.postgres,
            CredentialFamily::Cohere => &self.cohere,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CredentialSet {
    pub credentials: Vec<Credential>,
    pub ids: CredentialIds,
}

impl CredentialSet {
    pub fn contains(&self, family: CredentialFamily) -> bool {
        let id = self.ids.get(family);
        self.credentials.iter().any(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }
}

/// Build the credential records for every configured service.
pub fn synthesize(
    keys: &RecoveredKeys,
    secrets: &EnvSecrets,
    defaults: &CredentialDefaults,
    placeholder: &str,
    ids: &mut dyn IdGenerator,
) -> CredentialSet {
    let ids = CredentialIds::generate(ids);
    let mut credentials = Vec::new();

    let mut push = |family: CredentialFamily, kind: CredentialType, data: CredentialData| {
        let credential = Credential {
            id: ids.get(family).to_string(),
            name: format!("{} {}", family.display_name(), defaults.label),
            kind,
            data,
        };
        tracing::info!(
            "✓ {} credential: {} ({:?})",
            family.display_name(),
            credential.id,
            kind.category()
        );
        credentials.push(credential);
    };

    if let Some(key) = keys.get(ApiKey::OpenAi).filter(|k| !k.is_empty()) {
        push(
            CredentialFamily::OpenAi,
            CredentialType::OpenAiApi,
            CredentialData::ApiKey { api_key: key.to_string() },
        );
    }

    if let Some(key) = keys.get(ApiKey::Mistral).filter(|k| !k.is_empty()) {
        push(
            CredentialFamily::Mistral,
            CredentialType::MistralCloudApi,
            CredentialData::ApiKey { api_key: key.to_string() },
        );
    }

    if !secrets.service_role_key.is_empty() {
        push(
            CredentialFamily::Supabase,
            CredentialType::SupabaseApi,
            CredentialData::Supabase {
                host: defaults.supabase_host.clone(),
                service_role: secrets.service_role_key.clone(),
            },
        );
    }

    if !secrets.postgres_password.is_empty() {
        push(
            CredentialFamily::Postgres,
            CredentialType::Postgres,
            CredentialData::Postgres {
                host: defaults.postgres_host.clone(),
                port: defaults.postgres_port,
                database: defaults.postgres_database.clone(),
                user: defaults.postgres_user.clone(),
                password: secrets.postgres_password.clone(),
            },
        );
    }

    if let Some(key) = keys.usable(ApiKey::Cohere, placeholder) {
        push(
            CredentialFamily::Cohere,
            CredentialType::HttpHeaderAuth,
            CredentialData::HeaderAuth {
                name: "Authorization".to_string(),
                value: format!("Bearer {}", key),
            },
        );
    }

    CredentialSet { credentials, ids }
}
