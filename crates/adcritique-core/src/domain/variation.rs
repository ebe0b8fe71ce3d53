//! Variations and the reference material they are judged against.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::AdCritiqueError;

/// Identifier of a variation, unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariationId(pub String);

impl VariationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Positional id for the `index`-th variation of a generation batch.
    pub fn positional(index: usize) -> Self {
        Self(format!("var_{}", index + 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VariationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque handle to stored media bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(pub String);

impl MediaRef {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated ad candidate. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub id: VariationId,
    pub media: MediaRef,
    pub kind: MediaKind,
    /// Prompt the generator was given for this candidate.
    pub prompt: String,
}

impl Variation {
    pub fn new(
        id: impl Into<VariationId>,
        media: MediaRef,
        kind: MediaKind,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            media,
            kind,
            prompt: prompt.into(),
        }
    }

    /// A new variation carrying enhanced media for this one.
    ///
    /// The enhanced copy gets its own id so reports keep both candidates
    /// distinguishable.
    pub fn enhanced(&self, media: MediaRef, round: u32) -> Self {
        Self {
            id: VariationId(format!("{}-enh{}", self.id, round)),
            media,
            kind: self.kind,
            prompt: self.prompt.clone(),
        }
    }
}

/// First id that appears more than once in a batch, if any.
pub fn first_duplicate_id<'a>(
    ids: impl IntoIterator<Item = &'a VariationId>,
) -> Option<&'a VariationId> {
    let mut seen = HashSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}

impl From<String> for VariationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// 8-bit RGB colour, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Euclidean distance in RGB space.
    pub fn distance(&self, other: &Rgb) -> f32 {
        let dr = f32::from(self.r) - f32::from(other.r);
        let dg = f32::from(self.g) - f32::from(other.g);
        let db = f32::from(self.b) - f32::from(other.b);
        (dr * dr + dg * dg + db * db).sqrt()
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = AdCritiqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || AdCritiqueError::InvalidInput(format!("invalid colour: {s:?}"));
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = AdCritiqueError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_hex()
    }
}

/// Brand material extracted before generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceBundle {
    /// Brand palette, most dominant first.
    #[serde(default)]
    pub brand_colors: Vec<Rgb>,
    #[serde(default)]
    pub logo: Option<MediaRef>,
    #[serde(default)]
    pub product: Option<MediaRef>,
    #[serde(default)]
    pub brand_name: Option<String>,
}

/// Everything an evaluator may consult besides the variation itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceContext {
    pub bundle: ReferenceBundle,
    /// The user's original ad brief.
    pub user_prompt: String,
}

impl ReferenceContext {
    pub fn new(bundle: ReferenceBundle, user_prompt: impl Into<String>) -> Self {
        Self {
            bundle,
            user_prompt: user_prompt.into(),
        }
    }
}
