use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which tabbed definition families the extractor should read.
///
/// Basic and web definitions, pronunciation, sentences and word forms are
/// always extracted; the scope only narrows the authoritative, bilingual and
/// english families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionScope {
    #[default]
    All,
    Authoritative,
    Bilingual,
    English,
}

impl DefinitionScope {
    pub fn includes_authoritative(self) -> bool {
        matches!(self, Self::All | Self::Authoritative)
    }

    pub fn includes_bilingual(self) -> bool {
        matches!(self, Self::All | Self::Bilingual)
    }

    pub fn includes_english(self) -> bool {
        matches!(self, Self::All | Self::English)
    }
}

impl fmt::Display for DefinitionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Authoritative => write!(f, "authoritative"),
            Self::Bilingual => write!(f, "bilingual"),
            Self::English => write!(f, "english"),
        }
    }
}

impl FromStr for DefinitionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "authoritative" => Ok(Self::Authoritative),
            "bilingual" => Ok(Self::Bilingual),
            "english" => Ok(Self::English),
            other => Err(format!(
                "unknown scope '{other}' (expected all, authoritative, bilingual or english)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_scope_includes_every_family() {
        let scope = DefinitionScope::All;
        assert!(scope.includes_authoritative());
        assert!(scope.includes_bilingual());
        assert!(scope.includes_english());
    }

    #[test]
    fn narrow_scope_includes_only_its_family() {
        let scope = DefinitionScope::Bilingual;
        assert!(!scope.includes_authoritative());
        assert!(scope.includes_bilingual());
        assert!(!scope.includes_english());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(
            "  English ".parse::<DefinitionScope>().unwrap(),
            DefinitionScope::English
        );
        assert!("thesaurus".parse::<DefinitionScope>().is_err());
    }

    #[test]
    fn display_matches_serde_name() {
        let json = serde_json::to_string(&DefinitionScope::Authoritative).unwrap();
        assert_eq!(json, format!("\"{}\"", DefinitionScope::Authoritative));
    }
}
