use std::panic::{catch_unwind, AssertUnwindSafe};

use c2pa::settings::Settings;

use crate::domain::error::{EngineError, EngineResult};
use super::constants::{C2PA_SETTINGS_LOCK, BASE_SETTINGS};

pub fn apply_settings(jsons: &[serde_json::Value]) -> EngineResult<()> {
  let _ = Settings::from_string(BASE_SETTINGS, "json")?;
  for s in jsons {
    let _ = Settings::from_string(&s.to_string(), "json")?;
  }
  Ok(())
}

pub fn with_c2pa_settings<F, T>(settings: &[serde_json::Value], f: F) -> EngineResult<T>
where
  F: FnOnce() -> EngineResult<T>,
{
  let _guard = C2PA_SETTINGS_LOCK
    .lock()
    .map_err(|_| EngineError::Panic("settings mutex poisoned".into()))?;

  apply_settings(settings)?;

  let result = catch_unwind(AssertUnwindSafe(f));

  // Always attempt to restore baseline settings
  let _ = Settings::from_string(BASE_SETTINGS, "json");

  match result {
    Ok(r) => r,
    Err(_) => Err(EngineError::Panic("c2pa adapter panicked".into())),
  }
}
