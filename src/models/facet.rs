use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pronunciation accent variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    American,
    British,
}

impl Accent {
    pub const ALL: [Accent; 2] = [Accent::American, Accent::British];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::American => "american",
            Self::British => "british",
        }
    }
}

impl fmt::Display for Accent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Accent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "american" => Ok(Self::American),
            "british" => Ok(Self::British),
            other => Err(format!("unknown accent '{other}'")),
        }
    }
}

/// The `def_type` discriminator stored on every definition row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionType {
    Basic,
    Web,
    Authoritative,
    Bilingual,
    English,
}

impl DefinitionType {
    pub const ALL: [DefinitionType; 5] = [
        DefinitionType::Basic,
        DefinitionType::Web,
        DefinitionType::Authoritative,
        DefinitionType::Bilingual,
        DefinitionType::English,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Web => "web",
            Self::Authoritative => "authoritative",
            Self::Bilingual => "bilingual",
            Self::English => "english",
        }
    }

    /// The facet a row of this type belongs to.
    pub fn facet(self) -> Facet {
        match self {
            Self::Basic => Facet::Basic,
            Self::Web => Facet::Web,
            Self::Authoritative => Facet::Authoritative,
            Self::Bilingual => Facet::Bilingual,
            Self::English => Facet::English,
        }
    }
}

impl fmt::Display for DefinitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefinitionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown definition type '{s}'"))
    }
}

/// One independent kind of word data.
///
/// Facets are the unit of isolation everywhere: extraction, persistence
/// failures, divergence findings and backfill all operate per facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Pronunciation,
    Basic,
    Web,
    Authoritative,
    Bilingual,
    English,
    Sentences,
    WordForms,
}

impl Facet {
    pub const ALL: [Facet; 8] = [
        Facet::Pronunciation,
        Facet::Basic,
        Facet::Web,
        Facet::Authoritative,
        Facet::Bilingual,
        Facet::English,
        Facet::Sentences,
        Facet::WordForms,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pronunciation => "pronunciation",
            Self::Basic => "basic",
            Self::Web => "web",
            Self::Authoritative => "authoritative",
            Self::Bilingual => "bilingual",
            Self::English => "english",
            Self::Sentences => "sentences",
            Self::WordForms => "word_forms",
        }
    }

    /// Families that count towards partial validity. Web definitions do not.
    pub fn is_core_definition(self) -> bool {
        matches!(
            self,
            Self::Basic | Self::Authoritative | Self::Bilingual | Self::English
        )
    }

    /// Definition row type backing this facet, if it is a definition family.
    pub fn definition_type(self) -> Option<DefinitionType> {
        match self {
            Self::Basic => Some(DefinitionType::Basic),
            Self::Web => Some(DefinitionType::Web),
            Self::Authoritative => Some(DefinitionType::Authoritative),
            Self::Bilingual => Some(DefinitionType::Bilingual),
            Self::English => Some(DefinitionType::English),
            Self::Pronunciation | Self::Sentences | Self::WordForms => None,
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_types_round_trip_through_their_names() {
        for def_type in DefinitionType::ALL {
            assert_eq!(def_type.as_str().parse::<DefinitionType>().unwrap(), def_type);
        }
        assert!("example".parse::<DefinitionType>().is_err());
    }

    #[test]
    fn web_is_not_a_core_definition_family() {
        assert!(!Facet::Web.is_core_definition());
        assert!(Facet::Basic.is_core_definition());
        assert!(!Facet::Sentences.is_core_definition());
    }

    #[test]
    fn definition_facets_map_back_to_their_type() {
        for def_type in DefinitionType::ALL {
            assert_eq!(def_type.facet().definition_type(), Some(def_type));
        }
        assert_eq!(Facet::WordForms.definition_type(), None);
    }

    #[test]
    fn facet_serializes_in_snake_case() {
        let json = serde_json::to_string(&Facet::WordForms).unwrap();
        assert_eq!(json, r#""word_forms""#);
    }
}
