use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Categorical trick tag. Unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrickType {
    Normal,
    Nollie,
    Fakie,
    Switch,
    Fliptrick,
    Rotation,
    Pivot,
    Grind,
    Other(String),
}

impl TrickType {
    pub fn as_str(&self) -> &str {
        match self {
            TrickType::Normal => "NORMAL",
            TrickType::Nollie => "NOLLIE",
            TrickType::Fakie => "FAKIE",
            TrickType::Switch => "SWITCH",
            TrickType::Fliptrick => "FLIPTRICK",
            TrickType::Rotation => "ROTATION",
            TrickType::Pivot => "PIVOT",
            TrickType::Grind => "GRIND",
            TrickType::Other(s) => s.as_str(),
        }
    }

    /// Stance tags describe how the board is ridden, not the trick itself.
    pub fn is_stance(&self) -> bool {
        matches!(self, TrickType::Normal | TrickType::Nollie | TrickType::Fakie | TrickType::Switch)
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, TrickType::Fliptrick | TrickType::Rotation | TrickType::Pivot)
    }
}

impl From<String> for TrickType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "NORMAL" => TrickType::Normal,
            "NOLLIE" => TrickType::Nollie,
            "FAKIE" => TrickType::Fakie,
            "SWITCH" => TrickType::Switch,
            "FLIPTRICK" => TrickType::Fliptrick,
            "ROTATION" => TrickType::Rotation,
            "PIVOT" => TrickType::Pivot,
            "GRIND" => TrickType::Grind,
            _ => TrickType::Other(s),
        }
    }
}

impl From<&str> for TrickType {
    fn from(s: &str) -> Self { TrickType::from(s.to_string()) }
}

impl From<TrickType> for String {
    fn from(t: TrickType) -> Self {
        match t {
            TrickType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TrickType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateAndPlace {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub place: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub title: String,
    /// YouTube video id, empty when the trick has not been filmed yet.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub path: String,
    #[serde(default)]
    pub types: Vec<TrickType>,
    #[serde(rename = "dateAndPlace", default, skip_serializing_if = "Option::is_none")]
    pub date_and_place: Option<Vec<DateAndPlace>>,
}

impl Video {
    pub fn new(title: impl Into<String>, path: impl Into<String>, types: &[&str]) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            types: types.iter().map(|t| TrickType::from(*t)).collect(),
            date_and_place: None,
        }
    }

    /// A video is playable (and eligible for the carousel) when it has a non-blank path.
    pub fn has_video(&self) -> bool { !self.path.trim().is_empty() }

    pub fn primary_type(&self) -> Option<&TrickType> { self.types.first() }

    pub fn is_flat_trick(&self) -> bool {
        self.types.iter().any(|t| t.is_flat() || (self.types.len() == 1 && t.is_stance()))
    }

    pub fn is_grind(&self) -> bool { self.types.contains(&TrickType::Grind) }

    pub fn first_date(&self) -> Option<&DateAndPlace> {
        self.date_and_place.as_ref().and_then(|d| d.first())
    }

    /// Types joined by ", ", followed by the first recorded date when present.
    pub fn description(&self) -> String {
        let types = self.types.iter().map(TrickType::as_str).collect::<Vec<_>>().join(", ");
        match self.first_date() {
            Some(d) => format!("{} - {}", types, d.date),
            None => types,
        }
    }

    pub fn matches(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.types.iter().any(|t| t.as_str().to_lowercase().contains(needle_lower))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoTrick {
    pub name: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}
