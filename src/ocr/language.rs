//! Language codes passed through to OCR engines.
//!
//! Users may give either two-letter ISO 639-1 codes (`it`) or Tesseract's
//! three-letter codes (`ita`). Each backend asks for the form it needs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Known (ISO 639-1, Tesseract) pairs. All Latin script.
const KNOWN_LANGUAGES: &[(&str, &str)] = &[
    ("en", "eng"),
    ("it", "ita"),
    ("fr", "fra"),
    ("de", "deu"),
    ("es", "spa"),
    ("pt", "por"),
    ("nl", "nld"),
];

/// A single OCR language code, stored lowercased as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Code in Tesseract's traineddata naming. Unknown codes pass through.
    pub fn tesseract_code(&self) -> &str {
        KNOWN_LANGUAGES
            .iter()
            .find(|(iso, tess)| *iso == self.0 || *tess == self.0)
            .map(|(_, tess)| *tess)
            .unwrap_or(&self.0)
    }

    /// Two-letter ISO 639-1 code, if this is a known language.
    pub fn iso_code(&self) -> Option<&'static str> {
        KNOWN_LANGUAGES
            .iter()
            .find(|(iso, tess)| *iso == self.0 || *tess == self.0)
            .map(|(iso, _)| *iso)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, duplicate-free set of language codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LanguageCode>", into = "Vec<LanguageCode>")]
pub struct Languages(Vec<LanguageCode>);

impl Languages {
    /// Build from codes, keeping first occurrence order and dropping blanks.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<LanguageCode> = Vec::new();
        for code in codes {
            let code = LanguageCode::new(code.as_ref());
            if code.as_str().is_empty() {
                continue;
            }
            // `it` and `ita` are the same language
            let duplicate = out.iter().any(|existing| {
                existing == &code || existing.tesseract_code() == code.tesseract_code()
            });
            if !duplicate {
                out.push(code);
            }
        }
        Self(out)
    }

    /// Parse a list separated by commas or `+` (`it,en` or `ita+eng`).
    pub fn parse(list: &str) -> Self {
        Self::new(list.split([',', '+']))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanguageCode> {
        self.0.iter()
    }

    /// Tesseract `-l` argument: codes joined with `+`.
    pub fn tesseract_arg(&self) -> String {
        self.0
            .iter()
            .map(|code| code.tesseract_code())
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl Default for Languages {
    fn default() -> Self {
        Self::new(["ita", "eng"])
    }
}

impl From<Vec<LanguageCode>> for Languages {
    fn from(codes: Vec<LanguageCode>) -> Self {
        Self::new(codes.iter().map(|c| c.as_str().to_string()))
    }
}

impl From<Languages> for Vec<LanguageCode> {
    fn from(languages: Languages) -> Self {
        languages.0
    }
}

impl fmt::Display for Languages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.0.iter().map(|c| c.as_str()).collect();
        write!(f, "{}", codes.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_italian_english() {
        let langs = Languages::default();
        assert_eq!(langs.tesseract_arg(), "ita+eng");
        assert_eq!(langs.len(), 2);
    }

    #[test]
    fn test_parse_mixed_forms() {
        let langs = Languages::parse("it, en");
        assert_eq!(langs.tesseract_arg(), "ita+eng");

        let langs = Languages::parse("ita+eng");
        assert_eq!(langs.to_string(), "ita,eng");
    }

    #[test]
    fn test_duplicates_dropped_in_order() {
        let langs = Languages::parse("en,it,eng,,ita");
        let codes: Vec<&str> = langs.iter().map(|c| c.as_str()).collect();
        assert_eq!(codes, vec!["en", "it"]);
    }

    #[test]
    fn test_unknown_code_passes_through() {
        let code = LanguageCode::new("chi_sim");
        assert_eq!(code.tesseract_code(), "chi_sim");
        assert_eq!(code.iso_code(), None);
        assert_eq!(LanguageCode::new("ITA").iso_code(), Some("it"));
    }

    #[test]
    fn test_empty_list() {
        assert!(Languages::parse(" , ").is_empty());
    }
}
