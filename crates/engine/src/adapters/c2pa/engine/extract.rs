// adapters/c2pa/engine/extract.rs

use std::io::Cursor;

use bytes::Bytes;
use c2pa::Reader;

use crate::domain::error::EngineResult;
use crate::domain::manifest::{CertInfo, FragmentManifest, ManifestStore, ValidationStatus};
use super::super::settings::with_c2pa_settings;

pub fn read_fragment(
  settings: &[serde_json::Value],
  format: &str,
  init_segment: Bytes,
  fragment: Bytes,
) -> EngineResult<FragmentManifest> {
  with_c2pa_settings(settings, || {
    into_manifest(Reader::from_fragment(format, Cursor::new(init_segment), Cursor::new(fragment)))
  })
}

pub fn read_asset(settings: &[serde_json::Value], format: &str, asset: Bytes) -> EngineResult<FragmentManifest> {
  with_c2pa_settings(settings, || {
    let mut stream = Cursor::new(asset);
    into_manifest(Reader::from_stream(format, &mut stream))
  })
}

// "No manifest here" is a result, not an extraction failure.
fn into_manifest(read: c2pa::Result<Reader>) -> EngineResult<FragmentManifest> {
  match read {
    Ok(reader) => Ok(FragmentManifest::with_store(summarize(&reader))),
    Err(c2pa::Error::JumbfNotFound) | Err(c2pa::Error::ProvenanceMissing) => Ok(FragmentManifest::without_store()),
    Err(e) => Err(e.into()),
  }
}

fn summarize(reader: &Reader) -> ManifestStore {
  let active = reader.active_manifest();

  let signature = active.and_then(|m| m.signature_info()).map(|ci| CertInfo {
    alg: ci.alg.map(|a| a.to_string()),
    issuer: ci.issuer.clone(),
    cert_serial_number: ci.cert_serial_number.clone(),
    time: ci.time.clone(),
    revocation_status: ci.revocation_status,
  });

  // Only failures are kept: an empty list means the store validated cleanly.
  let mut validation_status = Vec::new();
  if let Some(results) = reader.validation_results() {
    if let Some(active_manifest) = results.active_manifest() {
      for status in active_manifest.failure() {
        validation_status.push(ValidationStatus {
          code: status.code().to_string(),
          url: status.url().map(|u| u.to_string()),
          explanation: status.explanation().map(|e| e.to_string()),
          ingredient_uri: status.ingredient_uri().map(|i| i.to_string()),
          passed: false,
        });
      }
    }

    if let Some(ingredient_deltas) = results.ingredient_deltas() {
      for delta_result in ingredient_deltas {
        for status in delta_result.validation_deltas().failure() {
          validation_status.push(ValidationStatus {
            code: status.code().to_string(),
            url: status.url().map(|u| u.to_string()),
            explanation: status.explanation().map(|e| e.to_string()),
            ingredient_uri: status.ingredient_uri().map(|i| i.to_string()),
            passed: false,
          });
        }
      }
    }
  }

  ManifestStore {
    active_manifest: reader.active_label().map(|l| l.to_string()),
    claim_generator: active.and_then(|m| m.claim_generator()).map(|g| g.to_string()),
    title: active.and_then(|m| m.title()).map(|t| t.to_string()),
    signature,
    validation_status,
  }
}
