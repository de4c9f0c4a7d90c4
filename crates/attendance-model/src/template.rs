//! Slide template identifiers and catalogue metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// The closed set of slide layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateId {
    #[default]
    Modern,
    Classic,
    Minimal,
    Elegant,
}

/// Catalogue entry describing a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemplateInfo {
    pub id: TemplateId,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
}

const CATALOGUE: [TemplateInfo; 4] = [
    TemplateInfo {
        id: TemplateId::Modern,
        name: "Modern",
        description: "Two-column bordered grid with logos and hashtag",
        category: "professional",
    },
    TemplateInfo {
        id: TemplateId::Classic,
        name: "Classic",
        description: "Serif vertical list with a framed total",
        category: "traditional",
    },
    TemplateInfo {
        id: TemplateId::Minimal,
        name: "Minimal",
        description: "Light type on translucent cards",
        category: "modern",
    },
    TemplateInfo {
        id: TemplateId::Elegant,
        name: "Elegant",
        description: "Gold accents inside a rounded frame",
        category: "formal",
    },
];

impl TemplateId {
    pub const ALL: [TemplateId; 4] = [
        TemplateId::Modern,
        TemplateId::Classic,
        TemplateId::Minimal,
        TemplateId::Elegant,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateId::Modern => "modern",
            TemplateId::Classic => "classic",
            TemplateId::Minimal => "minimal",
            TemplateId::Elegant => "elegant",
        }
    }

    pub fn info(self) -> &'static TemplateInfo {
        &CATALOGUE[self as usize]
    }

    /// Id by name, falling back to `Modern` for unknown names.
    pub fn lookup_or_default(name: &str) -> TemplateId {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!(template = name, "Unknown template, using modern");
            TemplateId::Modern
        })
    }

    pub fn catalogue() -> &'static [TemplateInfo] {
        &CATALOGUE
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        TemplateId::ALL
            .into_iter()
            .find(|id| id.as_str() == lower)
            .ok_or_else(|| ModelError::unknown("template", s))
    }
}
