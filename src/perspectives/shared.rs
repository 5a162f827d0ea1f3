//! Sharing policy of a published perspective.

use crate::error::UnknownSharingType;
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who may read and write a shared perspective's links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SharingType {
    #[serde(rename = "broadcast")]
    Broadcast,
    #[serde(rename = "permissionless")]
    Permissionless,
    #[serde(rename = "permissioned")]
    Permissioned,
    #[serde(rename = "holochain")]
    Holochain,
    #[serde(rename = "holochainChannel")]
    HolochainChannel,
}

impl SharingType {
    pub const ALL: [SharingType; 5] = [
        SharingType::Broadcast,
        SharingType::Permissionless,
        SharingType::Permissioned,
        SharingType::Holochain,
        SharingType::HolochainChannel,
    ];

    /// The literal used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SharingType::Broadcast => "broadcast",
            SharingType::Permissionless => "permissionless",
            SharingType::Permissioned => "permissioned",
            SharingType::Holochain => "holochain",
            SharingType::HolochainChannel => "holochainChannel",
        }
    }
}

impl fmt::Display for SharingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SharingType {
    type Err = UnknownSharingType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SharingType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownSharingType(s.to_string()))
    }
}

/// Map an externally supplied literal onto a sharing type.
///
/// Exact, case-sensitive lookup; anything else is an explicit error.
pub fn sharing_type_from_string(s: &str) -> Result<SharingType, UnknownSharingType> {
    s.parse()
}

/// Reference to a language by address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRef {
    pub address: Address,
    pub name: String,
}

/// Declared sharing policy of a perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedPerspective {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub sharing_type: SharingType,
    #[serde(default)]
    pub link_languages: Vec<LanguageRef>,
    #[serde(default)]
    pub allowed_expression_languages: Vec<Address>,
    #[serde(default)]
    pub required_expression_languages: Vec<Address>,
}

impl SharedPerspective {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        sharing_type: SharingType,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            sharing_type,
            link_languages: Vec::new(),
            allowed_expression_languages: Vec::new(),
            required_expression_languages: Vec::new(),
        }
    }
}
