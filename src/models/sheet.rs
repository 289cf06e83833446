//! Product technical data sheet.

use serde::{Deserialize, Serialize};

/// Structured technical data sheet for one product.
///
/// `title` and `description` are empty strings when the narrative did not
/// yield them. The attribute fields are `None` when unknown and serialize
/// as `""`, so every field is always present in the JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSheet {
    pub title: String,
    pub description: String,
    #[serde(default, with = "empty_as_none")]
    pub brand: Option<String>,
    #[serde(default, with = "empty_as_none")]
    pub model: Option<String>,
    #[serde(default, with = "empty_as_none")]
    pub power: Option<String>,
    #[serde(default, with = "empty_as_none")]
    pub dimensions: Option<String>,
    #[serde(default, with = "empty_as_none")]
    pub ip_rating: Option<String>,
    #[serde(default, with = "empty_as_none")]
    pub serial_number: Option<String>,
    #[serde(default, with = "empty_as_none")]
    pub certifications: Option<String>,
    #[serde(default, with = "empty_as_none")]
    pub country_of_manufacture: Option<String>,
    /// Full narrative produced by the completion service.
    #[serde(default, with = "empty_as_none")]
    pub narrative_summary: Option<String>,
}

impl ProductSheet {
    /// Number of technical attributes that were determined.
    pub fn known_attributes(&self) -> usize {
        [
            &self.brand,
            &self.model,
            &self.power,
            &self.dimensions,
            &self.ip_rating,
            &self.serial_number,
            &self.certifications,
            &self.country_of_manufacture,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }
}

/// `None` <-> `""`. A JSON `null` also reads back as `None`.
mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or_default())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|s| !s.is_empty()))
    }
}
