// c2pa settings are process-global; every toolkit call holds this lock while
// its settings are applied.
pub static C2PA_SETTINGS_LOCK: once_cell::sync::Lazy<std::sync::Mutex<()>> = once_cell::sync::Lazy::new(|| std::sync::Mutex::new(()));
pub static BASE_SETTINGS: &str = r#"{}"#;

// Fallback when neither the caller nor the bytes say what the segment is.
pub const DEFAULT_FRAGMENT_FORMAT: &str = "video/mp4";
