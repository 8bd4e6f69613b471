use serde::{Deserialize, Serialize};

/// Which side of the distribution voltage level an asset belongs to.
///
/// Classified once when a source row is ingested. The free-text description the
/// role was read from stays on the asset as a display label only.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Role {
    Primary,
    Secondary,
    #[default]
    Unclassified,
}

impl Role {
    /// Reads the role marker out of a free-text description.
    ///
    /// The match is case-insensitive and "primary" wins when both markers occur.
    pub fn classify(description: Option<&str>) -> Self {
        let Some(text) = description else {
            return Role::Unclassified;
        };
        let text = text.to_ascii_lowercase();
        if text.contains("primary") {
            Role::Primary
        } else if text.contains("secondary") {
            Role::Secondary
        } else {
            Role::Unclassified
        }
    }

    /// Canonical display label written onto a resolved line bushing.
    pub fn bushing_label(self) -> Option<&'static str> {
        match self {
            Role::Primary => Some("PRIMARY LINE BUSHING"),
            Role::Secondary => Some("SECONDARY LINE BUSHING"),
            Role::Unclassified => None,
        }
    }
}
