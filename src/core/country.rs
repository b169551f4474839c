//! Country demographic records and raw indicator bundles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// A bundle of raw indicator values for one country at one point in time.
///
/// Every field is optional; consumers that need a value fall back to the
/// fixed defaults documented in [`crate::features`]. Wire names are
/// camelCase to match the upstream ingestion payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Indicators {
    pub population: Option<f64>,
    pub birth_rate: Option<f64>,
    pub death_rate: Option<f64>,
    pub gdp_per_capita: Option<f64>,
    pub urbanization: Option<f64>,
    pub education_index: Option<f64>,
    pub healthcare_spending: Option<f64>,
    pub fertility_rate: Option<f64>,
    pub median_age: Option<f64>,
    pub life_expectancy: Option<f64>,
    pub growth_rate: Option<f64>,
    /// Demographic-transition stage (1-5). Informational only.
    pub stage: Option<u8>,
}

impl Indicators {
    /// Look up a numeric indicator by its wire name.
    ///
    /// Returns `None` for unknown names and for the non-numeric `stage`
    /// field.
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "population" => self.population,
            "birthRate" => self.birth_rate,
            "deathRate" => self.death_rate,
            "gdpPerCapita" => self.gdp_per_capita,
            "urbanization" => self.urbanization,
            "educationIndex" => self.education_index,
            "healthcareSpending" => self.healthcare_spending,
            "fertilityRate" => self.fertility_rate,
            "medianAge" => self.median_age,
            "lifeExpectancy" => self.life_expectancy,
            "growthRate" => self.growth_rate,
            _ => None,
        }
    }

    /// Add `delta` to the named indicator.
    ///
    /// An absent base value counts as present-with-zero so an adjustment
    /// can still seed it. Returns `false` for unknown names, which the
    /// fusion layer uses to drop deltas that do not map to any indicator.
    pub fn add(&mut self, name: &str, delta: f64) -> bool {
        let slot = match name {
            "population" => &mut self.population,
            "birthRate" => &mut self.birth_rate,
            "deathRate" => &mut self.death_rate,
            "gdpPerCapita" => &mut self.gdp_per_capita,
            "urbanization" => &mut self.urbanization,
            "educationIndex" => &mut self.education_index,
            "healthcareSpending" => &mut self.healthcare_spending,
            "fertilityRate" => &mut self.fertility_rate,
            "medianAge" => &mut self.median_age,
            "lifeExpectancy" => &mut self.life_expectancy,
            "growthRate" => &mut self.growth_rate,
            _ => return false,
        };
        *slot = Some(slot.unwrap_or(0.0) + delta);
        true
    }
}

/// One country's indicator state at a specific year.
///
/// `(country_code, year)` is unique; the storage collaborator enforces it.
/// Records are read-only to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub country_code: String,
    pub country_name: String,
    pub year: i32,
    pub indicators: Indicators,
}

/// One observed year inside a country's historical series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalYear {
    pub year: i32,
    /// Absolute population count.
    pub population: f64,
    pub birth_rate: Option<f64>,
    pub death_rate: Option<f64>,
    pub gdp_per_capita: Option<f64>,
}

/// A country's full training input: identity, the latest indicator
/// snapshot, and the chronological historical series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryHistory {
    pub country_code: String,
    pub country_name: String,
    pub indicators: Indicators,
    historical: Vec<HistoricalYear>,
}

impl CountryHistory {
    /// Create a history, sorting observations chronologically.
    ///
    /// Rejects duplicate years: the `(country, year)` pair is unique
    /// upstream, so a duplicate means corrupted input.
    pub fn new(
        country_code: impl Into<String>,
        country_name: impl Into<String>,
        indicators: Indicators,
        mut historical: Vec<HistoricalYear>,
    ) -> Result<Self> {
        historical.sort_by_key(|h| h.year);
        let mut seen = BTreeSet::new();
        for h in &historical {
            if !seen.insert(h.year) {
                return Err(ForecastError::InvalidParameter(format!(
                    "duplicate historical year {}",
                    h.year
                )));
            }
        }
        Ok(Self {
            country_code: country_code.into(),
            country_name: country_name.into(),
            indicators,
            historical,
        })
    }

    /// Chronologically sorted historical observations.
    pub fn historical(&self) -> &[HistoricalYear] {
        &self.historical
    }

    /// The most recent observed year, if any history exists.
    pub fn latest_year(&self) -> Option<i32> {
        self.historical.last().map(|h| h.year)
    }

    /// Number of observed years.
    pub fn len(&self) -> usize {
        self.historical.len()
    }

    /// Whether the history holds no observations.
    pub fn is_empty(&self) -> bool {
        self.historical.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year(y: i32, pop: f64) -> HistoricalYear {
        HistoricalYear {
            year: y,
            population: pop,
            birth_rate: Some(15.0),
            death_rate: Some(7.0),
            gdp_per_capita: Some(3000.0),
        }
    }

    #[test]
    fn history_sorts_observations_by_year() {
        let history = CountryHistory::new(
            "VN",
            "Viet Nam",
            Indicators::default(),
            vec![year(2010, 87.0e6), year(2000, 77.6e6), year(2005, 82.0e6)],
        )
        .unwrap();

        let years: Vec<i32> = history.historical().iter().map(|h| h.year).collect();
        assert_eq!(years, vec![2000, 2005, 2010]);
        assert_eq!(history.latest_year(), Some(2010));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn history_rejects_duplicate_years() {
        let err = CountryHistory::new(
            "VN",
            "Viet Nam",
            Indicators::default(),
            vec![year(2000, 77.6e6), year(2000, 78.0e6)],
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter(_)));
    }

    #[test]
    fn empty_history_has_no_latest_year() {
        let history =
            CountryHistory::new("VN", "Viet Nam", Indicators::default(), vec![]).unwrap();
        assert!(history.is_empty());
        assert_eq!(history.latest_year(), None);
    }

    #[test]
    fn indicator_lookup_by_wire_name() {
        let ind = Indicators {
            birth_rate: Some(14.8),
            gdp_per_capita: Some(4300.0),
            ..Default::default()
        };
        assert_eq!(ind.get("birthRate"), Some(14.8));
        assert_eq!(ind.get("gdpPerCapita"), Some(4300.0));
        assert_eq!(ind.get("deathRate"), None);
        assert_eq!(ind.get("unknownKey"), None);
    }

    #[test]
    fn indicator_add_known_and_unknown_keys() {
        let mut ind = Indicators {
            birth_rate: Some(14.8),
            ..Default::default()
        };
        assert!(ind.add("birthRate", 0.3));
        assert_eq!(ind.birth_rate, Some(15.1));

        // Absent base seeds from zero.
        assert!(ind.add("deathRate", 0.5));
        assert_eq!(ind.death_rate, Some(0.5));

        assert!(!ind.add("unknownKey", 1.0));
    }

    #[test]
    fn indicators_roundtrip_camel_case_json() {
        let json = r#"{"birthRate": 14.8, "gdpPerCapita": 4300.0, "stage": 3}"#;
        let ind: Indicators = serde_json::from_str(json).unwrap();
        assert_eq!(ind.birth_rate, Some(14.8));
        assert_eq!(ind.stage, Some(3));

        let back = serde_json::to_string(&ind).unwrap();
        assert!(back.contains("\"birthRate\":14.8"));
    }
}
