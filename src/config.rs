//! Consolidation configuration: the six fixed fields collected by the
//! form layer, and the uniform / per-source duality. The core never
//! builds these values itself; it validates and applies them.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConsolidateError;
use crate::types::NamingTokens;

pub const YEAR_MIN: i32 = 2023;
pub const YEAR_MAX: i32 = 2100;

/// Placeholder naming tokens used when per-source entries disagree.
pub const MULTI_ROUTE: &str = "MULTI_Ruta";
pub const MULTI_MONTH: &str = "MULTI_Mes";
pub const MULTI_YEAR: &str = "MULTI_Año";

/// The twelve canonical month names offered by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Month {
    Enero,
    Febrero,
    Marzo,
    Abril,
    Mayo,
    Junio,
    Julio,
    Agosto,
    Septiembre,
    Octubre,
    Noviembre,
    Diciembre,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Enero,
        Month::Febrero,
        Month::Marzo,
        Month::Abril,
        Month::Mayo,
        Month::Junio,
        Month::Julio,
        Month::Agosto,
        Month::Septiembre,
        Month::Octubre,
        Month::Noviembre,
        Month::Diciembre,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Month::Enero => "Enero",
            Month::Febrero => "Febrero",
            Month::Marzo => "Marzo",
            Month::Abril => "Abril",
            Month::Mayo => "Mayo",
            Month::Junio => "Junio",
            Month::Julio => "Julio",
            Month::Agosto => "Agosto",
            Month::Septiembre => "Septiembre",
            Month::Octubre => "Octubre",
            Month::Noviembre => "Noviembre",
            Month::Diciembre => "Diciembre",
        }
    }
}

impl FromStr for Month {
    type Err = ConsolidateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ConsolidateError::UnknownMonth(s.to_string()))
    }
}

/// The six fixed fields applied to every record of a brand (or of one
/// source file, in per-source mode). Serde names match the form layer's
/// field labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    #[serde(rename = "Mes")]
    pub month: Month,
    #[serde(rename = "Ruta")]
    pub route: String,
    #[serde(rename = "Codigo de cliente")]
    pub client_code: String,
    #[serde(rename = "Año")]
    pub year: i32,
    #[serde(rename = "Zona")]
    pub zone: String,
    #[serde(rename = "Nombre de la tienda")]
    pub store_name: String,
}

impl ConfigEntry {
    pub fn validate(&self) -> Result<(), ConsolidateError> {
        if !(YEAR_MIN..=YEAR_MAX).contains(&self.year) {
            return Err(ConsolidateError::InvalidYear(self.year));
        }
        Ok(())
    }
}

/// The two resolution modes for one brand: one entry for everything, or
/// one entry per contributing file, looked up by each record's origin tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BrandConfig {
    Uniform { entry: ConfigEntry },
    PerSource { entries: BTreeMap<String, ConfigEntry> },
}

impl BrandConfig {
    /// Check the mode contract before consolidation: uniform mode carries
    /// exactly one entry by construction; per-source mode must cover every
    /// file in the brand's membership list.
    pub fn validate(&self, brand: &str, membership: &[String]) -> Result<(), ConsolidateError> {
        match self {
            BrandConfig::Uniform { entry } => entry.validate(),
            BrandConfig::PerSource { entries } => {
                for entry in entries.values() {
                    entry.validate()?;
                }
                let missing: Vec<String> = membership
                    .iter()
                    .filter(|file| !entries.contains_key(*file))
                    .cloned()
                    .collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(ConsolidateError::IncompleteConfiguration {
                        brand: brand.to_string(),
                        missing,
                    })
                }
            }
        }
    }

    /// Entry for a record's origin file, or `None` when per-source mode
    /// has no entry for it.
    pub fn resolve(&self, origin: &str) -> Option<&ConfigEntry> {
        match self {
            BrandConfig::Uniform { entry } => Some(entry),
            BrandConfig::PerSource { entries } => entries.get(origin),
        }
    }

    /// File-naming tokens. Uniform mode uses the entry's values directly.
    /// Per-source mode uses a shared value when every entry agrees and the
    /// fixed MULTI placeholder otherwise.
    pub fn naming_tokens(&self, brand: &str) -> NamingTokens {
        match self {
            BrandConfig::Uniform { entry } => NamingTokens {
                route: entry.route.clone(),
                brand: brand.to_string(),
                month: entry.month.as_str().to_string(),
                year: entry.year.to_string(),
            },
            BrandConfig::PerSource { entries } => NamingTokens {
                route: shared(entries.values().map(|e| e.route.clone()))
                    .unwrap_or_else(|| MULTI_ROUTE.to_string()),
                brand: brand.to_string(),
                month: shared(entries.values().map(|e| e.month.as_str().to_string()))
                    .unwrap_or_else(|| MULTI_MONTH.to_string()),
                year: shared(entries.values().map(|e| e.year.to_string()))
                    .unwrap_or_else(|| MULTI_YEAR.to_string()),
            },
        }
    }
}

/// The single value all items agree on, if any.
fn shared(mut values: impl Iterator<Item = String>) -> Option<String> {
    let first = values.next()?;
    values.all(|v| v == first).then_some(first)
}
