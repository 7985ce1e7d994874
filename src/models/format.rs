//! Format selectors and their content negotiation values.
//!
//! Every selector maps to exactly one `Accept` header value and one decode
//! path. Unknown tags never fail: they resolve to the operation's default
//! format.

use serde::{Deserialize, Serialize};

/// Content type requested for plain artifact metadata.
pub const METADATA_CONTENT_TYPE: &str = "application/json";

/// Shared behaviour of the per-operation format enums
pub trait FormatSelector: Copy + Default + Sized + 'static {
    /// Every variant, in documentation order
    const ALL: &'static [Self];

    /// Short tag used on the command line and in config files
    fn tag(&self) -> &'static str;

    /// Value sent in the `Accept` header
    fn accept(&self) -> &'static str;

    /// Resolve a tag, falling back to the default format when it is unknown
    fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.tag().eq_ignore_ascii_case(tag))
            .unwrap_or_default()
    }
}

/// Linked-data serialisations of an artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkedDataFormat {
    #[default]
    JsonLd,
    Rdf,
    Turtle,
}

impl LinkedDataFormat {
    /// Whether the response is decoded as JSON rather than kept as text
    pub fn is_json(&self) -> bool {
        matches!(self, LinkedDataFormat::JsonLd)
    }
}

impl FormatSelector for LinkedDataFormat {
    const ALL: &'static [Self] = &[Self::JsonLd, Self::Rdf, Self::Turtle];

    fn tag(&self) -> &'static str {
        match self {
            LinkedDataFormat::JsonLd => "jsonld",
            LinkedDataFormat::Rdf => "rdf",
            LinkedDataFormat::Turtle => "turtle",
        }
    }

    fn accept(&self) -> &'static str {
        match self {
            LinkedDataFormat::JsonLd => "application/ld+json",
            LinkedDataFormat::Rdf => "application/rdf+xml",
            LinkedDataFormat::Turtle => "text/turtle",
        }
    }
}

/// Bibliography formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BibliographyFormat {
    #[default]
    Bibtex,
    Csl,
    Ris,
}

impl FormatSelector for BibliographyFormat {
    const ALL: &'static [Self] = &[Self::Bibtex, Self::Csl, Self::Ris];

    fn tag(&self) -> &'static str {
        match self {
            BibliographyFormat::Bibtex => "bibtex",
            BibliographyFormat::Csl => "csl",
            BibliographyFormat::Ris => "ris",
        }
    }

    fn accept(&self) -> &'static str {
        match self {
            BibliographyFormat::Bibtex => "application/x-bibtex",
            BibliographyFormat::Csl => "application/vnd.citationstyles.csl+json",
            BibliographyFormat::Ris => "application/x-research-info-systems",
        }
    }
}

/// Transliteration formats for inscriptions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InscriptionFormat {
    #[default]
    Atf,
    CdliConll,
    ConllU,
}

impl FormatSelector for InscriptionFormat {
    const ALL: &'static [Self] = &[Self::Atf, Self::CdliConll, Self::ConllU];

    fn tag(&self) -> &'static str {
        match self {
            InscriptionFormat::Atf => "atf",
            InscriptionFormat::CdliConll => "cdli-conll",
            InscriptionFormat::ConllU => "conll-u",
        }
    }

    fn accept(&self) -> &'static str {
        match self {
            InscriptionFormat::Atf => "text/x-c-atf",
            InscriptionFormat::CdliConll => "text/x-cdli-conll",
            InscriptionFormat::ConllU => "text/x-conll-u",
        }
    }
}

/// Bulk export formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabularFormat {
    #[default]
    Csv,
    Tsv,
    Xlsx,
}

impl TabularFormat {
    /// Field delimiter for the text formats, `None` for spreadsheets
    pub fn delimiter(&self) -> Option<u8> {
        match self {
            TabularFormat::Csv => Some(b','),
            TabularFormat::Tsv => Some(b'\t'),
            TabularFormat::Xlsx => None,
        }
    }
}

impl FormatSelector for TabularFormat {
    const ALL: &'static [Self] = &[Self::Csv, Self::Tsv, Self::Xlsx];

    fn tag(&self) -> &'static str {
        match self {
            TabularFormat::Csv => "csv",
            TabularFormat::Tsv => "tsv",
            TabularFormat::Xlsx => "xlsx",
        }
    }

    fn accept(&self) -> &'static str {
        match self {
            TabularFormat::Csv => "text/csv",
            TabularFormat::Tsv => "text/tab-separated-values",
            TabularFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// `Display` writes the tag and `FromStr` resolves one, never failing
macro_rules! tag_conversions {
    ($($format:ty),+ $(,)?) => {
        $(
            impl std::fmt::Display for $format {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.tag())
                }
            }

            impl std::str::FromStr for $format {
                type Err = std::convert::Infallible;

                fn from_str(tag: &str) -> Result<Self, Self::Err> {
                    Ok(Self::from_tag(tag))
                }
            }
        )+
    };
}

tag_conversions!(
    LinkedDataFormat,
    BibliographyFormat,
    InscriptionFormat,
    TabularFormat,
);
