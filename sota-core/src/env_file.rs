//! `.env` loading and repair
//!
//! The stack's `.env` file sometimes carries an `OPENAI_API_KEY` whose value was
//! wrapped over several physical lines. Repair works on an in-memory [`EnvFile`]:
//! - `OPENAI_API_KEY` absorbs every following line until the next assignment or comment
//! - `MISTRAL_API_KEY`, `COHERE_API_KEY` and `ZEP_API_KEY` are single-line captures
//! - everything else is kept verbatim, then the captured keys are appended under
//!   a [`CORRECTED_HEADER`] section, one line each

use crate::error::{DeployError, Result};
use std::path::Path;

/// Comment line that opens the rewritten key section
pub const CORRECTED_HEADER: &str = "# SOTA RAG API Keys (Corrected)";

/// API keys the repair step captures and rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiKey {
    OpenAi,
    Mistral,
    Cohere,
    Zep,
}

impl ApiKey {
    pub const ALL: [ApiKey; 4] = [ApiKey::OpenAi, ApiKey::Mistral, ApiKey::Cohere, ApiKey::Zep];

    pub fn env_name(self) -> &'static str {
        match self {
            ApiKey::OpenAi => "OPENAI_API_KEY",
            ApiKey::Mistral => "MISTRAL_API_KEY",
            ApiKey::Cohere => "COHERE_API_KEY",
            ApiKey::Zep => "ZEP_API_KEY",
        }
    }
}

/// One physical line of an env file, kept byte-for-byte apart from its terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvLine {
    raw: String,
}

impl EnvLine {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn trimmed(&self) -> &str {
        self.raw.trim()
    }

    pub fn is_comment(&self) -> bool {
        self.trimmed().starts_with('#')
    }

    /// `(name, value)` for `NAME=value` lines whose name is an env identifier
    pub fn assignment(&self) -> Option<(&str, &str)> {
        if self.is_comment() {
            return None;
        }
        let (name, value) = self.trimmed().split_once('=')?;
        let name = name.trim();
        if !is_env_identifier(name) {
            return None;
        }
        Some((name, value))
    }
}

fn is_env_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    lines: Vec<EnvLine>,
}

impl EnvFile {
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(EnvLine::new).collect(),
        }
    }

    /// `Ok(None)` when nothing exists at `path`
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
        Ok(Some(Self::parse(&content)))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line.raw());
            out.push('\n');
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render()).map_err(|e| DeployError::io(path, e))
    }

    pub fn lines(&self) -> &[EnvLine] {
        &self.lines
    }

    /// Trimmed value of the last assignment to `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .rev()
            .filter_map(EnvLine::assignment)
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.trim())
    }
}

/// Captured keys in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveredKeys {
    entries: Vec<(ApiKey, String)>,
}

impl RecoveredKeys {
    /// A repeated key keeps its original position and takes the new value.
    pub fn insert(&mut self, key: ApiKey, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: ApiKey) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The value when it is set to something other than `placeholder`
    pub fn usable(&self, key: ApiKey, placeholder: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty() && *v != placeholder)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ApiKey, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(k, _)| k.env_name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone)]
pub struct RepairedEnv {
    pub file: EnvFile,
    pub keys: RecoveredKeys,
}

/// Recognise a handled key on `line`.
///
/// `OPENAI_API_KEY_OLD=...` is some other variable and yields `None`; a bare
/// `OPENAI_API_KEY` with no `=` is rejected.
fn captured_key(line: &EnvLine, line_no: usize) -> Result<Option<(ApiKey, &str)>> {
    let trimmed = line.trimmed();
    for key in ApiKey::ALL {
        let Some(rest) = trimmed.strip_prefix(key.env_name()) else {
            continue;
        };
        if rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
            continue;
        }
        return match rest.trim_start().strip_prefix('=') {
            Some(value) => Ok(Some((key, value.trim()))),
            None => Err(DeployError::MalformedEnv {
                line: line_no,
                reason: format!("{} has no '=' separator", key.env_name()),
            }),
        };
    }
    Ok(None)
}

/// Lines that end a wrapped `OPENAI_API_KEY` value
fn ends_continuation(line: &EnvLine) -> bool {
    let trimmed = line.trimmed();
    trimmed.starts_with(ApiKey::Mistral.env_name())
        || trimmed.starts_with(ApiKey::Cohere.env_name())
        || line.is_comment()
        || line.assignment().is_some()
}

fn check_placeholder(key: ApiKey, value: &str, placeholder: &str, line_no: usize) -> Result<()> {
    if value != placeholder && value.eq_ignore_ascii_case(placeholder) {
        return Err(DeployError::MalformedEnv {
            line: line_no,
            reason: format!(
                "{} looks like the placeholder '{}' with different casing",
                key.env_name(),
                placeholder
            ),
        });
    }
    Ok(())
}

/// Rebuild `env` with every captured key on exactly one line.
pub fn repair(env: &EnvFile, placeholder: &str) -> Result<RepairedEnv> {
    let lines = env.lines();
    let mut retained: Vec<EnvLine> = Vec::with_capacity(lines.len());
    let mut keys = RecoveredKeys::default();

    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        let line_no = i + 1;

        // Section written by an earlier repair; re-emitted below
        if line.trimmed() == CORRECTED_HEADER {
            if retained.last().is_some_and(|l| l.trimmed().is_empty()) {
                retained.pop();
            }
            i += 1;
            continue;
        }

        match captured_key(line, line_no)? {
            Some((ApiKey::OpenAi, first)) => {
                let mut value = first.to_string();
                let mut j = i + 1;
                while j < lines.len() && !ends_continuation(&lines[j]) {
                    // A bare handled key is malformed, not a fragment
                    if captured_key(&lines[j], j + 1)?.is_some() {
                        break;
                    }
                    value.push_str(lines[j].trimmed());
                    j += 1;
                }
                check_placeholder(ApiKey::OpenAi, &value, placeholder, line_no)?;
                keys.insert(ApiKey::OpenAi, value);
                i = j;
                continue;
            }
            Some((key, value)) => {
                check_placeholder(key, value, placeholder, line_no)?;
                keys.insert(key, value);
            }
            None => retained.push(line.clone()),
        }
        i += 1;
    }

    retained.push(EnvLine::new(""));
    retained.push(EnvLine::new(CORRECTED_HEADER));
    for (key, value) in keys.iter() {
        if !value.is_empty() && value != placeholder {
            retained.push(EnvLine::new(format!("{}={}", key.env_name(), value)));
        }
    }

    Ok(RepairedEnv {
        file: EnvFile { lines: retained },
        keys,
    })
}

/// Load, repair and rewrite the env file at `path`.
///
/// A missing file is not an error: nothing is written and no keys are returned.
pub fn repair_env_file(path: &Path, placeholder: &str) -> Result<RecoveredKeys> {
    let Some(env) = EnvFile::load(path)? else {
        tracing::warn!("No env file at {}; continuing without API keys", path.display());
        return Ok(RecoveredKeys::default());
    };

    let repaired = repair(&env, placeholder)?;
    repaired.file.save(path)?;
    tracing::debug!(
        "Rewrote {} ({} lines, {} keys)",
        path.display(),
        repaired.file.lines().len(),
        repaired.keys.len()
    );
    Ok(repaired.keys)
}

/// Secrets read from the repaired env file for the Supabase and Postgres credentials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSecrets {
    pub service_role_key: String,
    pub postgres_password: String,
}

impl EnvSecrets {
    pub fn from_env(env: &EnvFile) -> Self {
        Self {
            service_role_key: env.get("SERVICE_ROLE_KEY").unwrap_or_default().to_string(),
            postgres_password: env.get("POSTGRES_PASSWORD").unwrap_or_default().to_string(),
        }
    }

    /// Empty secrets when the file is absent
    pub fn from_env_file(path: &Path) -> Result<Self> {
        Ok(EnvFile::load(path)?
            .map(|env| Self::from_env(&env))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACEHOLDER: &str = "xxxxxx";

    fn repaired_lines(input: &str) -> Vec<String> {
        let repaired = repair(&EnvFile::parse(input), PLACEHOLDER).unwrap();
        repaired
            .file
            .lines()
            .iter()
            .map(|l| l.raw().to_string())
            .collect()
    }

    // ========================================================================
    // Wrapped OpenAI key is joined onto one line
    // ========================================================================
    #[test]
    fn test_split_openai_key_rejoined() {
        let lines = repaired_lines("OPENAI_API_KEY=sk-abc\ndef\nMISTRAL_API_KEY=xyz\n");

        let openai: Vec<_> = lines.iter().filter(|l| l.starts_with("OPENAI_API_KEY")).collect();
        assert_eq!(openai, vec!["OPENAI_API_KEY=sk-abcdef"]);

        let openai_pos = lines.iter().position(|l| l == "OPENAI_API_KEY=sk-abcdef").unwrap();
        let mistral_pos = lines.iter().position(|l| l == "MISTRAL_API_KEY=xyz").unwrap();
        assert!(openai_pos < mistral_pos);
        assert_eq!(lines.iter().filter(|l| l.starts_with("MISTRAL_API_KEY")).count(), 1);
        assert!(!lines.iter().any(|l| l == "def"));
    }

    #[test]
    fn test_key_split_across_many_lines() {
        let input = "# header\nOPENAI_API_KEY=sk-proj-\n  AAAA\nBBBB\n\nCCCC\n# next\nFOO=bar\n";
        let repaired = repair(&EnvFile::parse(input), PLACEHOLDER).unwrap();

        assert_eq!(repaired.keys.get(ApiKey::OpenAi), Some("sk-proj-AAAABBBBCCCC"));
        let rendered = repaired.file.render();
        assert_eq!(rendered.matches("OPENAI_API_KEY").count(), 1);
        assert!(rendered.contains("OPENAI_API_KEY=sk-proj-AAAABBBBCCCC\n"));
        assert!(rendered.starts_with("# header\n# next\nFOO=bar\n"));
    }

    #[test]
    fn test_continuation_stops_at_unrelated_assignment() {
        let input = "OPENAI_API_KEY=sk-1\n234\nPOSTGRES_PASSWORD=secret\n";
        let repaired = repair(&EnvFile::parse(input), PLACEHOLDER).unwrap();

        assert_eq!(repaired.keys.get(ApiKey::OpenAi), Some("sk-1234"));
        assert_eq!(repaired.file.get("POSTGRES_PASSWORD"), Some("secret"));
    }

    // ========================================================================
    // Placeholder values are captured but never written back
    // ========================================================================
    #[test]
    fn test_placeholder_never_written() {
        let lines = repaired_lines("OPENAI_API_KEY=sk-a\nCOHERE_API_KEY=xxxxxx\nZEP_API_KEY=z-1\n");

        assert!(!lines.iter().any(|l| l.contains("xxxxxx")));
        assert!(!lines.iter().any(|l| l.starts_with("COHERE_API_KEY")));
        assert!(lines.contains(&"ZEP_API_KEY=z-1".to_string()));
    }

    #[test]
    fn test_empty_value_not_written_but_reported() {
        let repaired = repair(&EnvFile::parse("MISTRAL_API_KEY=\n"), PLACEHOLDER).unwrap();
        assert_eq!(repaired.keys.get(ApiKey::Mistral), Some(""));
        assert!(!repaired.file.render().contains("MISTRAL_API_KEY"));
    }

    #[test]
    fn test_unhandled_lines_kept_verbatim_in_order() {
        let input = "# Supabase\nSERVICE_ROLE_KEY=\"quoted\"  \n  export X=1\nOPENAI_API_KEY_OLD=legacy\nMISTRAL_API_KEY=m\n";
        let lines = repaired_lines(input);

        assert_eq!(
            &lines[..4],
            &[
                "# Supabase".to_string(),
                "SERVICE_ROLE_KEY=\"quoted\"  ".to_string(),
                "  export X=1".to_string(),
                "OPENAI_API_KEY_OLD=legacy".to_string(),
            ]
        );
        assert_eq!(&lines[4..], &["", CORRECTED_HEADER, "MISTRAL_API_KEY=m"]);
    }

    #[test]
    fn test_repeated_key_keeps_position_takes_last_value() {
        let repaired = repair(
            &EnvFile::parse("MISTRAL_API_KEY=old\nCOHERE_API_KEY=c\nMISTRAL_API_KEY=new\n"),
            PLACEHOLDER,
        )
        .unwrap();
        assert_eq!(repaired.keys.names(), vec!["MISTRAL_API_KEY", "COHERE_API_KEY"]);
        assert_eq!(repaired.keys.get(ApiKey::Mistral), Some("new"));
    }

    #[test]
    fn test_repair_is_stable_on_rerun() {
        let first = repair(
            &EnvFile::parse("A=1\nOPENAI_API_KEY=sk-\nabc\nMISTRAL_API_KEY=m\n"),
            PLACEHOLDER,
        )
        .unwrap();
        let second = repair(&first.file, PLACEHOLDER).unwrap();

        assert_eq!(first.file.render(), second.file.render());
        assert_eq!(first.keys, second.keys);
        assert_eq!(second.file.render().matches(CORRECTED_HEADER).count(), 1);
    }

    // ========================================================================
    // Malformed input fails instead of being mis-parsed
    // ========================================================================
    #[test]
    fn test_handled_key_without_separator_rejected() {
        let err = repair(&EnvFile::parse("FOO=1\nCOHERE_API_KEY\n"), PLACEHOLDER).unwrap_err();
        match err {
            DeployError::MalformedEnv { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("COHERE_API_KEY"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bare_key_inside_wrapped_value_rejected() {
        for (input, bad_line) in [
            ("OPENAI_API_KEY=sk-abc\ndef\nOPENAI_API_KEY\nMISTRAL_API_KEY=m\n", 3),
            ("OPENAI_API_KEY=sk-abc\ndef\nZEP_API_KEY\n", 3),
        ] {
            let err = repair(&EnvFile::parse(input), PLACEHOLDER).unwrap_err();
            assert!(
                matches!(err, DeployError::MalformedEnv { line, .. } if line == bad_line),
                "unexpected result for {input:?}: {err}"
            );
        }
    }

    #[test]
    fn test_zep_assignment_ends_wrapped_value() {
        let repaired = repair(
            &EnvFile::parse("OPENAI_API_KEY=sk-abc\ndef\nZEP_API_KEY=z\n"),
            PLACEHOLDER,
        )
        .unwrap();
        assert_eq!(repaired.keys.get(ApiKey::OpenAi), Some("sk-abcdef"));
        assert_eq!(repaired.keys.get(ApiKey::Zep), Some("z"));
        assert_eq!(repaired.file.render().matches("OPENAI_API_KEY").count(), 1);
    }

    #[test]
    fn test_mixed_case_placeholder_rejected() {
        let err = repair(&EnvFile::parse("COHERE_API_KEY=XXXXXX\n"), PLACEHOLDER).unwrap_err();
        assert!(matches!(err, DeployError::MalformedEnv { line: 1, .. }));
    }

    // ========================================================================
    // File-level behaviour
    // ========================================================================
    #[test]
    fn test_missing_file_returns_no_keys_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        let keys = repair_env_file(&path, PLACEHOLDER).unwrap();
        assert!(keys.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_repair_env_file_rewrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "POSTGRES_PASSWORD=pw\nOPENAI_API_KEY=sk-\nxyz\n").unwrap();

        let keys = repair_env_file(&path, PLACEHOLDER).unwrap();
        assert_eq!(keys.get(ApiKey::OpenAi), Some("sk-xyz"));

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            format!("POSTGRES_PASSWORD=pw\n\n{}\nOPENAI_API_KEY=sk-xyz\n", CORRECTED_HEADER)
        );
    }

    #[test]
    fn test_secrets_read_last_assignment() {
        let env = EnvFile::parse("SERVICE_ROLE_KEY=first\nSERVICE_ROLE_KEY= second \n# POSTGRES_PASSWORD=no\n");
        let secrets = EnvSecrets::from_env(&env);
        assert_eq!(secrets.service_role_key, "second");
        assert_eq!(secrets.postgres_password, "");
    }

    #[test]
    fn test_secrets_from_missing_file_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let secrets = EnvSecrets::from_env_file(&dir.path().join("nope")).unwrap();
        assert_eq!(secrets, EnvSecrets::default());
    }
}
