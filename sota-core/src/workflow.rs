//! Credential reference remapping for exported n8n workflows
//!
//! The shipped workflow JSON files reference credentials by the identifiers
//! they had on the machine they were exported from. Those five legacy ids are
//! swapped for this run's ids before import.

use crate::credentials::{CredentialFamily, CredentialSet};
use serde_json::Value;

/// Legacy identifiers baked into the shipped workflow files
pub const LEGACY_IDS: [(&str, CredentialFamily); 5] = [
    ("MM0xMOJkVoJoWOLP", CredentialFamily::OpenAi),
    ("rmhBwssORDiWOBKN", CredentialFamily::Mistral),
    ("wwbxqbDc4H2RPQ1Y", CredentialFamily::Supabase),
    ("7aOzWLaZcz9dgeSv", CredentialFamily::Postgres),
    ("SaJzpmSGdmOFSPDn", CredentialFamily::Cohere),
];

/// Legacy id -> new id for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRemap {
    entries: Vec<(&'static str, String)>,
}

impl IdRemap {
    /// Cohere references fall back to the OpenAI credential when no Cohere
    /// credential was built.
    pub fn from_set(set: &CredentialSet) -> Self {
        let has_cohere = set.contains(CredentialFamily::Cohere);
        let entries = LEGACY_IDS
            .iter()
            .map(|(legacy, family)| {
                let family = match family {
                    CredentialFamily::Cohere if !has_cohere => CredentialFamily::OpenAi,
                    other => *other,
                };
                (*legacy, set.ids.get(family).to_string())
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, legacy: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(old, _)| *old == legacy)
            .map(|(_, new)| new.as_str())
    }
}

/// Rewrite legacy credential ids in every node; returns the number replaced.
///
/// Anything that is not `nodes[*].credentials.*.id` as a string is left untouched.
pub fn patch_workflow(workflow: &mut Value, remap: &IdRemap) -> usize {
    let Some(nodes) = workflow.get_mut("nodes").and_then(Value::as_array_mut) else {
        return 0;
    };

    let mut updates = 0;
    for node in nodes {
        let Some(credentials) = node.get_mut("credentials").and_then(Value::as_object_mut) else {
            continue;
        };
        for (cred_type, cred_info) in credentials.iter_mut() {
            let Some(id) = cred_info.get_mut("id") else {
                continue;
            };
            let Some(new_id) = id.as_str().and_then(|old| remap.get(old)) else {
                continue;
            };
            tracing::debug!("Remapping {} credential {} -> {}", cred_type, id, new_id);
            *id = Value::String(new_id.to_string());
            updates += 1;
        }
    }
    updates
}
