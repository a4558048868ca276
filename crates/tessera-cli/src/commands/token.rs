//! Token commands.
//!
//! `tessera token issue` - Issue a standard or trust-scoped token.
//! `tessera token validate` - Validate a token and print its record.
//! `tessera token inspect` - Show a token's format and creation time.

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tessera_core::{TesseraConfig, parse_duration};
use tessera_token::{
    BasicExpander, InMemoryTrustStore, TokenData, TokenProvider, TrustRef,
    inspect_token_unverified, provider_from_config,
};

/// Arguments of `tessera token issue`.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub user: String,
    pub project: Option<String>,
    pub trust: Option<String>,
    pub expires: Option<String>,
    pub audit_ids: Vec<String>,
}

/// Read a token given inline or as a path to a file containing it.
fn resolve_token(token: String) -> anyhow::Result<String> {
    let path = Path::new(&token);
    if path.exists() {
        return Ok(fs::read_to_string(path)
            .with_context(|| format!("Failed to read token from {}", path.display()))?
            .trim()
            .to_string());
    }
    Ok(token.trim().to_string())
}

/// Load trusts from a YAML or JSON list.
fn load_trusts(path: Option<&Path>) -> anyhow::Result<InMemoryTrustStore> {
    let Some(path) = path else {
        return Ok(InMemoryTrustStore::new());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read trusts from {}", path.display()))?;
    let trusts: Vec<TrustRef> = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse trusts in {}", path.display()))?;
    Ok(InMemoryTrustStore::from_trusts(trusts))
}

fn build_provider(
    config: &TesseraConfig,
    trusts: InMemoryTrustStore,
) -> anyhow::Result<TokenProvider> {
    let keys = provider_from_config(&config.keys).context(
        "No keys available. Set TESSERA_KEYS or configure keys.key_repository in tessera.yaml",
    )?;
    let provider = TokenProvider::new(keys, Arc::new(trusts), Arc::new(BasicExpander));
    Ok(provider.with_methods(config.tokens.methods.clone()))
}

/// Build the token data for an issue request.
fn token_data(config: &TesseraConfig, request: &IssueRequest) -> anyhow::Result<TokenData> {
    let lifetime = match &request.expires {
        Some(expires) => parse_duration(expires)?,
        None => config.tokens.lifetime()?,
    };

    let mut data = TokenData::issue_now(lifetime);
    if !request.audit_ids.is_empty() {
        data.audit_ids = request.audit_ids.clone();
    }
    if let Some(trust) = &request.trust {
        data = data.with_trust(trust.clone());
    }
    Ok(data)
}

/// Issue a token.
pub fn issue(
    config: &TesseraConfig,
    request: IssueRequest,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let provider = build_provider(config, InMemoryTrustStore::new())?;
    let data = token_data(config, &request)?;
    let format = TokenProvider::format_for(&data);

    let token = provider
        .issue_token(&request.user, request.project.as_deref(), &data)
        .context("Failed to issue token")?;
    tracing::info!(format = %format, expires_at = %data.expires_at, "Issued token");

    if let Some(output_path) = output {
        fs::write(&output_path, &token)?;
        println!("✔ Token written to: {}", output_path.display());
        println!("  Format: {format}");
        println!("  User: {}", request.user);
        if let Some(project) = &request.project {
            println!("  Project: {project}");
        }
        if let Some(trust) = &request.trust {
            println!("  Trust: {trust}");
        }
        println!("  Expires: {}", data.expires_at);
    } else {
        println!("{token}");
    }

    Ok(())
}

/// Validate a token and return its JSON representation.
fn validate_to_json(
    config: &TesseraConfig,
    token: &str,
    trusts: Option<&Path>,
) -> anyhow::Result<serde_json::Value> {
    let provider = build_provider(config, load_trusts(trusts)?)?;
    let validated = provider.validate_token(token)?;
    Ok(serde_json::json!({
        "user_id": validated.user_id,
        "project_id": validated.project_id,
        "token": validated.record,
    }))
}

/// Validate a token and print its record.
pub fn validate(
    config: &TesseraConfig,
    token: String,
    trusts: Option<PathBuf>,
) -> anyhow::Result<()> {
    let token = resolve_token(token)?;

    match validate_to_json(config, &token, trusts.as_deref()) {
        Ok(json) => {
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }
        Err(e) => {
            println!("✖ Token validation failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Inspect a token without validating it.
pub fn inspect(token: String) -> anyhow::Result<()> {
    let token = resolve_token(token)?;
    let info = inspect_token_unverified(&token)?;

    println!("Token Information (unverified):");
    println!("  Format: {}", info.format);
    println!("  Envelope version: {:#04x}", info.header.version);
    match info.header.created_at_utc() {
        Some(created) => println!("  Created: {}", created.to_rfc3339()),
        None => println!("  Created: {} (out of range)", info.header.created_at),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tessera_token::SymmetricKey;

    const USER: &str = "3a9e6b1c22f44d0e9b1a5c7d8e9f0a1b";
    const PROJECT: &str = "c0ffee00c0ffee00c0ffee00c0ffee00";
    const TRUST: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f0";

    fn config_with_key_file(dir: &Path) -> TesseraConfig {
        let keys_file = dir.join("keys");
        fs::write(&keys_file, format!("{}\n", SymmetricKey::generate().to_base64())).unwrap();

        let mut config = TesseraConfig::default();
        config.keys.keys_env = None;
        config.keys.keys_file = Some(keys_file);
        config
    }

    fn request() -> IssueRequest {
        IssueRequest {
            user: USER.to_string(),
            project: Some(PROJECT.to_string()),
            trust: None,
            expires: Some("15m".to_string()),
            audit_ids: vec!["abc123".to_string()],
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let dir = tempdir().unwrap();
        let config = config_with_key_file(dir.path());
        let token_path = dir.path().join("token");

        issue(&config, request(), Some(token_path.clone())).unwrap();
        let token = resolve_token(token_path.display().to_string()).unwrap();
        assert!(token.starts_with("F00"));

        let json = validate_to_json(&config, &token, None).unwrap();
        assert_eq!(json["user_id"], USER);
        assert_eq!(json["project_id"], PROJECT);
        assert_eq!(json["token"]["audit_info"], "abc123");
    }

    #[test]
    fn test_issue_and_validate_trust_token() {
        let dir = tempdir().unwrap();
        let config = config_with_key_file(dir.path());
        let token_path = dir.path().join("token");
        let trusts_path = dir.path().join("trusts.yaml");
        fs::write(&trusts_path, format!("- id: {TRUST}\n  impersonation: true\n")).unwrap();

        let mut request = request();
        request.trust = Some(TRUST.to_string());
        issue(&config, request, Some(token_path.clone())).unwrap();
        let token = fs::read_to_string(&token_path).unwrap();
        assert!(token.starts_with("F01"));

        let json = validate_to_json(&config, &token, Some(&trusts_path)).unwrap();
        assert_eq!(json["token"]["OS-TRUST:trust"]["impersonation"], true);

        // Without the trust list the trust cannot be resolved.
        assert!(validate_to_json(&config, &token, None).is_err());
    }

    #[test]
    fn test_token_data_defaults() {
        let config = TesseraConfig::default();
        let mut request = request();
        request.expires = None;
        request.audit_ids.clear();

        let data = token_data(&config, &request).unwrap();
        assert_eq!(data.audit_ids.len(), 1);
        assert!(data.trust.is_none());
    }

    #[test]
    fn test_missing_keys() {
        let mut config = TesseraConfig::default();
        config.keys.keys_env = None;
        let err = issue(&config, request(), None).unwrap_err();
        assert!(err.to_string().contains("No keys available"));
    }
}
