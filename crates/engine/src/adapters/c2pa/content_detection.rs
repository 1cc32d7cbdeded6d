use super::constants::DEFAULT_FRAGMENT_FORMAT;

/// MIME type of an ISO-BMFF initialization segment, from its `ftyp` major brand.
pub fn detect_bmff_content_type(data: &[u8]) -> Option<&'static str> {
  if data.len() < 12 || &data[4..8] != b"ftyp" {
    return None;
  }

  let brand = &data[8..12];
  // Audio-only MP4
  if brand == b"M4A " || brand == b"M4B " {
    return Some("audio/mp4");
  }
  // QuickTime
  if brand == b"qt  " {
    return Some("video/quicktime");
  }
  // Still-image brands are not segmented media
  if brand == b"heic" || brand == b"heif" || brand == b"avif" || brand == b"mif1" {
    return None;
  }
  // MP4, CMAF and DASH brands (iso*, mp4*, cmf*, dash, msdh, avc1, ...)
  Some("video/mp4")
}

/// Format handed to the toolkit: the caller's hint when it names one,
/// otherwise whatever the segment bytes say.
pub fn resolve_format(data: &[u8], hint: &str) -> String {
  let hint = hint.trim();
  if !hint.is_empty() && hint != "application/octet-stream" {
    return hint.to_ascii_lowercase();
  }
  detect_bmff_content_type(data)
    .unwrap_or(DEFAULT_FRAGMENT_FORMAT)
    .to_string()
}
