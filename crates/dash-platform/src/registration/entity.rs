//! Dashboard Registration Entity
//!
//! Which data a dashboard shows for one country.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Data points enabled on a dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub temperature: bool,
    pub precipitation: bool,
    pub capital: bool,
    pub coordinates: bool,
    pub population: bool,
    pub area: bool,
    /// Upper-case ISO 4217 codes, deduplicated
    #[serde(default)]
    pub target_currencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(rename = "_id")]
    pub id: String,

    pub country: String,

    /// Upper-case two letter code; the country events are fired for
    pub iso_code: String,

    pub features: Features,

    /// `YYYYMMDD HH:MM` local time of the last write
    pub last_change: String,
}

impl Registration {
    pub fn new(
        id: impl Into<String>,
        country: impl Into<String>,
        iso_code: impl Into<String>,
        features: Features,
        last_change: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            country: country.into(),
            iso_code: iso_code.into(),
            features,
            last_change: last_change.into(),
        }
    }
}

/// Upper-cases three letter codes, drops anything else and duplicates. Order is kept.
pub fn normalize_currencies(raw: &[String]) -> Vec<String> {
    let mut currencies: Vec<String> = Vec::with_capacity(raw.len());
    for code in raw {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            continue;
        }
        let code = code.to_ascii_uppercase();
        if !currencies.contains(&code) {
            currencies.push(code);
        }
    }
    currencies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_currencies() {
        let raw: Vec<String> = ["nok", "EUR", "Nok", "dollar", "us", " sek ", "U$D"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(normalize_currencies(&raw), vec!["NOK", "EUR", "SEK"]);
    }

    #[test]
    fn test_document_shape() {
        let reg = Registration::new("Ab3dE", "Norway", "NO", Features::default(), "20240307 09:05");
        let json = serde_json::to_value(&reg).unwrap();
        assert_eq!(json["_id"], "Ab3dE");
        assert_eq!(json["isoCode"], "NO");
        assert_eq!(json["lastChange"], "20240307 09:05");
        assert_eq!(json["features"]["targetCurrencies"], serde_json::json!([]));
    }
}
