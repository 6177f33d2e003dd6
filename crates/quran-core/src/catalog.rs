//! Static chapter catalog: metadata and verse text by chapter index.
//!
//! The catalog is read-only reference data shipped alongside the app as a
//! JSON array. Verse maps use `verse_<n>` keys.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

static VERSE_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^verse_(\d+)$").unwrap());

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Place {
    Mecca,
    Medina,
}

impl std::fmt::Display for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Place::Mecca => "Meccan",
            Place::Medina => "Medinan",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChapter {
    index: String,
    title: String,
    title_ar: String,
    place: Place,
    count: u32,
    #[serde(default)]
    verse: HashMap<String, String>,
    #[serde(default)]
    translation: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verse {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Chapter {
    pub index: String,
    pub title: String,
    pub title_ar: String,
    pub place: Place,
    pub verse_count: u32,
    verses: BTreeMap<u32, String>,
    translations: BTreeMap<u32, String>,
}

impl Chapter {
    /// Numeric chapter number parsed from the index (`"002"` → 2).
    pub fn number(&self) -> u32 {
        self.index.trim().parse().unwrap_or(0)
    }

    /// Every chapter except the first and ninth opens with the basmala line.
    pub fn shows_bismillah(&self) -> bool {
        !matches!(self.number(), 1 | 9)
    }

    pub fn verses(&self) -> Vec<Verse> {
        self.verses
            .iter()
            .map(|(number, text)| Verse {
                number: *number,
                text: text.clone(),
            })
            .collect()
    }

    pub fn verse_text(&self, number: u32) -> Option<&str> {
        self.verses.get(&number).map(String::as_str)
    }

    pub fn translation(&self, number: u32) -> Option<&str> {
        self.translations.get(&number).map(String::as_str)
    }
}

impl From<RawChapter> for Chapter {
    fn from(raw: RawChapter) -> Self {
        let verses = parse_verse_map(&raw.index, raw.verse);
        let translations = parse_verse_map(&raw.index, raw.translation);
        Chapter {
            index: raw.index,
            title: raw.title,
            title_ar: raw.title_ar,
            place: raw.place,
            verse_count: raw.count,
            verses,
            translations,
        }
    }
}

fn parse_verse_map(index: &str, raw: HashMap<String, String>) -> BTreeMap<u32, String> {
    raw.into_iter()
        .filter_map(|(key, text)| {
            let number = VERSE_KEY
                .captures(&key)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok());
            if number.is_none() {
                warn!(chapter = index, key = %key, "Skipping malformed verse key");
            }
            number.map(|n| (n, text))
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    chapters: Vec<Chapter>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: Vec<RawChapter> = serde_json::from_str(json)?;
        let chapters: Vec<Chapter> = raw.into_iter().map(Chapter::from).collect();
        debug!(chapters = chapters.len(), "Parsed chapter catalog");
        Ok(Self { chapters })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&data)?;
        info!(
            path = %path.display(),
            chapters = catalog.chapters.len(),
            "Loaded chapter catalog"
        );
        Ok(catalog)
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn lookup(&self, index: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|chapter| chapter.index == index)
    }

    /// Linear filter: case-insensitive on the latin title, exact substring on
    /// the Arabic title, substring on the index. A blank query keeps everything.
    pub fn search(&self, query: &str) -> Vec<&Chapter> {
        if query.trim().is_empty() {
            return self.chapters.iter().collect();
        }
        let lowered = query.to_lowercase();
        self.chapters
            .iter()
            .filter(|chapter| {
                chapter.title.to_lowercase().contains(&lowered)
                    || chapter.title_ar.contains(query)
                    || chapter.index.contains(&lowered)
            })
            .collect()
    }
}

/// Recitation URL for a chapter number under `base`.
pub fn audio_url(base: &str, chapter_number: u32) -> String {
    format!("{}/{}.mp3", base.trim_end_matches('/'), chapter_number)
}

#[cfg(test)]
pub(crate) const TEST_CATALOG: &str = r#"[
  {
    "index": "001",
    "title": "Al-Fatiha",
    "titleAr": "الفاتحة",
    "place": "Mecca",
    "count": 7,
    "verse": {
      "verse_1": "بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ",
      "verse_2": "الْحَمْدُ لِلَّهِ رَبِّ الْعَالَمِينَ",
      "verse_10x": "ignored"
    },
    "translation": { "verse_1": "In the name of Allah, the Entirely Merciful, the Especially Merciful." }
  },
  {
    "index": "009",
    "title": "At-Tawba",
    "titleAr": "التوبة",
    "place": "Medina",
    "count": 129
  },
  {
    "index": "112",
    "title": "Al-Ikhlas",
    "titleAr": "الإخلاص",
    "place": "Mecca",
    "count": 4,
    "verse": {
      "verse_2": "اللَّهُ الصَّمَدُ",
      "verse_1": "قُلْ هُوَ اللَّهُ أَحَدٌ"
    }
  }
]"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_json(TEST_CATALOG).unwrap()
    }

    #[test]
    fn verses_are_ordered_and_malformed_keys_skipped() {
        let catalog = catalog();
        let ikhlas = catalog.lookup("112").unwrap();
        let numbers: Vec<u32> = ikhlas.verses().iter().map(|v| v.number).collect();
        assert_eq!(numbers, vec![1, 2]);

        let fatiha = catalog.lookup("001").unwrap();
        assert_eq!(fatiha.verses().len(), 2);
        assert!(fatiha.translation(1).unwrap().starts_with("In the name"));
        assert_eq!(fatiha.translation(2), None);
    }

    #[test]
    fn bismillah_is_hidden_for_first_and_ninth() {
        let catalog = catalog();
        assert!(!catalog.lookup("001").unwrap().shows_bismillah());
        assert!(!catalog.lookup("009").unwrap().shows_bismillah());
        assert!(catalog.lookup("112").unwrap().shows_bismillah());
    }

    #[test]
    fn search_matches_title_arabic_and_index() {
        let catalog = catalog();
        assert_eq!(catalog.search("  ").len(), 3);
        assert_eq!(catalog.search("FATI")[0].index, "001");
        assert_eq!(catalog.search("الإخلاص")[0].index, "112");
        assert_eq!(catalog.search("009")[0].title, "At-Tawba");
        assert!(catalog.search("kahf").is_empty());
    }

    #[test]
    fn numeric_queries_match_raw_index_substrings() {
        let catalog = catalog();
        let hits: Vec<&str> = catalog.search("1").iter().map(|c| c.index.as_str()).collect();
        assert_eq!(hits, vec!["001", "112"]);
        assert_eq!(catalog.search("12")[0].index, "112");
        assert!(catalog.search("002").is_empty());
    }

    #[test]
    fn audio_url_uses_chapter_number() {
        let chapter = catalog().lookup("009").cloned().unwrap();
        assert_eq!(
            audio_url("https://cdn.example/audio/", chapter.number()),
            "https://cdn.example/audio/9.mp3"
        );
    }

    #[test]
    fn unknown_index_is_none() {
        assert!(catalog().lookup("200").is_none());
    }
}
