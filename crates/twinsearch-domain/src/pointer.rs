//! JSON pointer paths into twin state.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DomainError, DomainResult};

/// A path into a JSON document, e.g. `/attributes/location`.
///
/// Segments are stored unescaped and parsed as in RFC 6901: only `""` is the
/// root, and empty segments are kept, so `/` is the single empty key and
/// `/a/` addresses key `""` under `a`. Rendering escapes `~` as `~0` and `/`
/// as `~1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JsonPointer {
    segments: Vec<String>,
}

impl JsonPointer {
    /// The pointer to the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a pointer from its rendered form.
    pub fn parse(value: &str) -> DomainResult<Self> {
        if value.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = value.strip_prefix('/') else {
            return Err(DomainError::InvalidPointer {
                value: value.to_string(),
            });
        };

        let mut segments = Vec::new();
        for raw in rest.split('/') {
            segments.push(unescape(raw).ok_or_else(|| DomainError::InvalidPointer {
                value: value.to_string(),
            })?);
        }
        Ok(Self { segments })
    }

    /// Returns a new pointer with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Returns the parent pointer, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True if `self` equals `other` or is one of its ancestors.
    pub fn is_prefix_of(&self, other: &JsonPointer) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Number of segments (0 for the root).
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root pointer.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The unescaped segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

fn unescape(segment: &str) -> Option<String> {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            f.write_str("/")?;
            f.write_str(&segment.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for JsonPointer {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
