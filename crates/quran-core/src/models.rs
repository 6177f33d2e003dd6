//! Records persisted by [`crate::storage::QuranStorage`].
//!
//! Field names are camelCase on the wire so stored blobs stay readable by the
//! mobile front end that shares the same key-value layout.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ts_rs::TS;

/// Smallest Arabic font size the settings slider allows.
pub const MIN_ARABIC_FONT_SIZE: u32 = 18;
/// Largest Arabic font size the settings slider allows.
pub const MAX_ARABIC_FONT_SIZE: u32 = 36;
/// Smallest translation font size.
pub const MIN_TRANSLATION_FONT_SIZE: u32 = 12;
/// Largest translation font size.
pub const MAX_TRANSLATION_FONT_SIZE: u32 = 28;

/// A user-saved chapter + verse reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Bookmark {
    pub id: String,
    pub surah_index: String,
    pub surah_title: String,
    pub surah_title_ar: String,
    pub ayah_number: u32,
    pub ayah_text: String,
    #[ts(type = "number")]
    pub created_at: i64,
}

impl Bookmark {
    pub fn matches(&self, surah_index: &str, ayah_number: u32) -> bool {
        self.surah_index == surah_index && self.ayah_number == ayah_number
    }
}

/// Bookmark candidate before the store assigns `id` and `createdAt`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBookmark {
    pub surah_index: String,
    pub surah_title: String,
    pub surah_title_ar: String,
    pub ayah_number: u32,
    pub ayah_text: String,
}

/// Fixed set of recitation rates, cycled in this order by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
    Faster,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 4] = [
        PlaybackSpeed::Slow,
        PlaybackSpeed::Normal,
        PlaybackSpeed::Fast,
        PlaybackSpeed::Faster,
    ];

    pub fn multiplier(self) -> f32 {
        match self {
            PlaybackSpeed::Slow => 0.75,
            PlaybackSpeed::Normal => 1.0,
            PlaybackSpeed::Fast => 1.25,
            PlaybackSpeed::Faster => 1.5,
        }
    }

    /// Exact lookup; stored values outside the set are rejected.
    pub fn from_multiplier(value: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|speed| (f64::from(speed.multiplier()) - value).abs() < 1e-6)
    }

    /// The rate after this one, wrapping from the fastest back to the slowest.
    pub fn next(self) -> Self {
        let idx = Self::ALL
            .iter()
            .position(|speed| *speed == self)
            .unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

impl Serialize for PlaybackSpeed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(f64::from(self.multiplier()))
    }
}

impl<'de> Deserialize<'de> for PlaybackSpeed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        PlaybackSpeed::from_multiplier(value).ok_or_else(|| {
            serde::de::Error::custom(format!("unsupported playback speed {value}"))
        })
    }
}

/// Reading and audio preferences. Always complete once read from the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Settings {
    pub arabic_font_size: u32,
    pub translation_font_size: u32,
    pub show_translation: bool,
    #[ts(type = "number")]
    pub playback_speed: PlaybackSpeed,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            arabic_font_size: 24,
            translation_font_size: 16,
            show_translation: true,
            playback_speed: PlaybackSpeed::Normal,
        }
    }
}

impl Settings {
    /// Overlay `patch` on `self`. Font sizes are normalized to what the
    /// settings sliders can show: the Arabic size is clamped to 18..=36 and
    /// rounded down to an even step, the translation size clamped to 12..=28.
    /// Every other field is taken as supplied.
    pub fn merged(mut self, patch: &SettingsPatch) -> Self {
        if let Some(size) = patch.arabic_font_size {
            self.arabic_font_size = clamp_arabic_font_size(size);
        }
        if let Some(size) = patch.translation_font_size {
            self.translation_font_size =
                size.clamp(MIN_TRANSLATION_FONT_SIZE, MAX_TRANSLATION_FONT_SIZE);
        }
        if let Some(show) = patch.show_translation {
            self.show_translation = show;
        }
        if let Some(speed) = patch.playback_speed {
            self.playback_speed = speed;
        }
        self
    }
}

/// Partial settings update; also the shape stored blobs are decoded as, so
/// fields missing on disk fall back to defaults. Each field is decoded on its
/// own: an unreadable value drops only that field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SettingsPatch {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub arabic_font_size: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub translation_font_size: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub show_translation: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    #[ts(type = "number | null")]
    pub playback_speed: Option<PlaybackSpeed>,
}

impl SettingsPatch {
    pub fn show_translation(show: bool) -> Self {
        Self {
            show_translation: Some(show),
            ..Self::default()
        }
    }

    pub fn playback_speed(speed: PlaybackSpeed) -> Self {
        Self {
            playback_speed: Some(speed),
            ..Self::default()
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Slider semantics: 18..=36 in steps of two.
fn clamp_arabic_font_size(size: u32) -> u32 {
    let clamped = size.clamp(MIN_ARABIC_FONT_SIZE, MAX_ARABIC_FONT_SIZE);
    clamped - (clamped % 2)
}

/// The most recently opened reading position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LastRead {
    pub surah_index: String,
    pub ayah_number: u32,
    #[ts(type = "number")]
    pub timestamp: i64,
}
