// adapters/c2pa/engine/common.rs

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::types::{SessionConfig, TrustPolicyConfig};

pub fn build_trust_settings(
  policy: &TrustPolicyConfig,
) -> EngineResult<(Vec<serde_json::Value>, bool)> {
  let mut settings = Vec::new();
  let mut enable_trust = false;

  if let Some(anchors) = &policy.anchors {
    let pem = std::str::from_utf8(anchors)
      .map_err(|_| EngineError::Config("trust anchors must be valid UTF-8".into()))?
      .to_owned();
    settings.push(serde_json::json!({
      "trust": { "trust_anchors": pem, "trust_anchors_path": null }
    }));
    enable_trust = true;
  }

  if let Some(allowed) = &policy.allowed_list {
    let pem = std::str::from_utf8(allowed)
      .map_err(|_| EngineError::Config("allowed list must be valid UTF-8".into()))?
      .to_owned();
    settings.push(serde_json::json!({
      "trust": { "allowed_list": pem, "allowed_list_path": null }
    }));
    enable_trust = true;
  }

  if let Some(ekus) = &policy.allowed_ekus {
    settings.push(serde_json::json!({
      "trust": { "trust_config": { "ekus": ekus } }
    }));
    enable_trust = true;
  }

  Ok((settings, enable_trust))
}

/// Toolkit settings for every extraction of a session.
pub fn build_reader_settings(config: &SessionConfig) -> EngineResult<Vec<serde_json::Value>> {
  #[cfg(not(feature = "remote_manifests"))]
  {
    if config.allow_remote_manifests {
      return Err(EngineError::Feature("remote_manifests"));
    }
  }

  let mut settings = vec![serde_json::json!({
    "verify": { "fetch_remote_manifests": config.allow_remote_manifests }
  })];

  if let Some(policy) = &config.trust_policy {
    let (trust_settings, enable_trust) = build_trust_settings(policy)?;
    settings.extend(trust_settings);
    settings.push(serde_json::json!({
      "verify": { "verify_trust": enable_trust }
    }));
  }

  Ok(settings)
}
