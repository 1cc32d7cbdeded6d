use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::EngineError;

/// Media type of an adaptive stream track. Only the types listed in
/// `SessionConfig::supported_media_types` ever reach the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MediaType {
    Video,
    Audio,
    /// Any other track type reported by the player (text, image, ...).
    Other(String),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Other(s) => s.as_str(),
        }
    }

    /// MIME type used when handing segments of this type to the toolkit.
    pub fn default_content_type(&self) -> &'static str {
        match self {
            MediaType::Audio => "audio/mp4",
            _ => "video/mp4",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EngineError::Config("media type must not be empty".into()));
        }
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "video" => MediaType::Video,
            "audio" => MediaType::Audio,
            other => MediaType::Other(other.to_string()),
        })
    }
}

// Serialized as the plain lowercase name so it can key JSON maps.
impl Serialize for MediaType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a stream (a DASH period / HLS rendition group) within a session.
    StreamId
);
string_id!(
    /// Identifier of one bitrate/quality variant of a media type.
    RepresentationId
);

/// Composite identity of one manifest stream: `(stream, media type, representation)`.
///
/// Used as a map key directly, so ids containing separators never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManifestKey {
    pub stream_id: StreamId,
    pub media_type: MediaType,
    pub representation_id: RepresentationId,
}

impl ManifestKey {
    pub fn new(
        stream_id: impl Into<StreamId>,
        media_type: MediaType,
        representation_id: impl Into<RepresentationId>,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            media_type,
            representation_id: representation_id.into(),
        }
    }
}

impl fmt::Display for ManifestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.stream_id, self.media_type, self.representation_id)
    }
}

/// Role of a delivered segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentRole {
    /// Initialization (header) segment. Cached per key, never indexed.
    Initialization,
    /// Media (data) segment. Triggers extraction and insertion.
    Media,
}
