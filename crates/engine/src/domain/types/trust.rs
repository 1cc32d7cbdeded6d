use serde::Deserialize;

/// Trust policy configuration, modeled after c2patool trust settings but
/// using raw bytes to avoid I/O in the engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrustPolicyConfig {
    /// PEM trust anchors data (concatenated PEMs)
    pub anchors: Option<Vec<u8>>,
    /// Allowed list of specific signing certificates (PEM)
    pub allowed_list: Option<Vec<u8>>,
    /// Allowed EKUs in OID dot notation
    pub allowed_ekus: Option<Vec<String>>,
}

impl TrustPolicyConfig {
    pub fn is_empty(&self) -> bool {
        self.anchors.is_none() && self.allowed_list.is_none() && self.allowed_ekus.is_none()
    }
}
