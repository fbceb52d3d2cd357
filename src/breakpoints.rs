//! PM2.5 breakpoint table and AQI category mapping.
//!
//! Converts a concentration (µg/m³) to the EPA Air Quality Index using
//! piecewise-linear interpolation over fixed breakpoints, and labels an AQI
//! value with its EPA category and color. Values may be confirmed using the
//! calculator at https://www.airnow.gov/aqi/aqi-calculator-concentration/

use std::fmt;

use serde::Serialize;

// ---

/// One row of the breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub conc_low: f64,
    pub conc_high: f64,
    pub aqi_low: f64,
    pub aqi_high: f64,
}

const fn bp(conc_low: f64, conc_high: f64, aqi_low: f64, aqi_high: f64) -> Breakpoint {
    Breakpoint {
        conc_low,
        conc_high,
        aqi_low,
        aqi_high,
    }
}

/// AQI breakpoints for PM2.5, ascending and contiguous at 0.1 µg/m³ resolution.
pub const PM25_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 12.0, 0.0, 50.0),        // Good
    bp(12.1, 35.4, 51.0, 100.0),     // Moderate
    bp(35.5, 55.4, 101.0, 150.0),    // Unhealthy for Sensitive Groups
    bp(55.5, 150.4, 151.0, 200.0),   // Unhealthy
    bp(150.5, 250.4, 201.0, 300.0),  // Very Unhealthy
    bp(250.5, 500.4, 301.0, 500.0),  // Hazardous
];

/// EPA AQI category, derived from the AQI value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    OutOfRange,
}

impl Category {
    /// Label an AQI value. Bands are inclusive on their upper bound; negative,
    /// NaN, or anything above 500 is [`Category::OutOfRange`].
    pub fn from_aqi(aqi: f64) -> Self {
        if aqi.is_nan() || aqi < 0.0 {
            return Category::OutOfRange;
        }
        if aqi <= 50.0 {
            Category::Good
        } else if aqi <= 100.0 {
            Category::Moderate
        } else if aqi <= 150.0 {
            Category::UnhealthyForSensitiveGroups
        } else if aqi <= 200.0 {
            Category::Unhealthy
        } else if aqi <= 300.0 {
            Category::VeryUnhealthy
        } else if aqi <= 500.0 {
            Category::Hazardous
        } else {
            Category::OutOfRange
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Good => "Good",
            Category::Moderate => "Moderate",
            Category::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Category::Unhealthy => "Unhealthy",
            Category::VeryUnhealthy => "Very Unhealthy",
            Category::Hazardous => "Hazardous",
            Category::OutOfRange => "out of range",
        }
    }

    /// EPA reporting color for the category, `None` when out of range.
    pub fn color_hex(self) -> Option<&'static str> {
        match self {
            Category::Good => Some("#00E400"),
            Category::Moderate => Some("#FFFF00"),
            Category::UnhealthyForSensitiveGroups => Some("#FF7E00"),
            Category::Unhealthy => Some("#FF0000"),
            Category::VeryUnhealthy => Some("#8F3F97"),
            Category::Hazardous => Some("#7E0023"),
            Category::OutOfRange => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An AQI value (one decimal place) and its category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AqiResult {
    pub value: f64,
    pub category: Category,
}

/// Calculate the AQI for a PM2.5 concentration.
///
/// Scans the breakpoints in ascending order and interpolates within the first
/// row where `conc_low <= concentration <= conc_high`:
///
/// `AQI = (AQIhigh - AQIlow) / (BPhigh - BPlow) * (C - BPlow) + AQIlow`
///
/// Returns `None` when no row matches. Concentrations above 500.4 are reported
/// as out of range rather than clamped to 500.
///
/// # Examples
///
/// ```
/// use airwatch::breakpoints::{to_aqi, Category};
///
/// let result = to_aqi(12.0).unwrap();
/// assert_eq!(result.value, 50.0);
/// assert_eq!(result.category, Category::Good);
///
/// assert!(to_aqi(600.0).is_none());
/// ```
pub fn to_aqi(concentration: f64) -> Option<AqiResult> {
    // ---
    let row = PM25_BREAKPOINTS
        .iter()
        .find(|b| b.conc_low <= concentration && concentration <= b.conc_high)?;

    let aqi = (row.aqi_high - row.aqi_low) / (row.conc_high - row.conc_low)
        * (concentration - row.conc_low)
        + row.aqi_low;
    let value = round_tenths(aqi);

    Some(AqiResult {
        value,
        category: Category::from_aqi(value),
    })
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_aqi() {
        assert_eq!(to_aqi(0.0).unwrap().value, 0.0);
        assert_eq!(to_aqi(6.0).unwrap().value, 25.0);
        assert_eq!(to_aqi(12.0).unwrap().value, 50.0);
        assert_eq!(to_aqi(12.1).unwrap().value, 51.0);
        assert_eq!(to_aqi(35.4).unwrap().value, 100.0);
        assert_eq!(to_aqi(35.5).unwrap().value, 101.0);
        assert_eq!(to_aqi(55.4).unwrap().value, 150.0);
        assert_eq!(to_aqi(55.5).unwrap().value, 151.0);
        assert_eq!(to_aqi(150.4).unwrap().value, 200.0);
        assert_eq!(to_aqi(150.5).unwrap().value, 201.0);
        assert_eq!(to_aqi(250.4).unwrap().value, 300.0);
        assert_eq!(to_aqi(250.5).unwrap().value, 301.0);
        assert_eq!(to_aqi(500.4).unwrap().value, 500.0);
    }

    #[test]
    fn test_to_aqi_rounds_to_one_decimal() {
        // 50 / 12 * 7 = 29.1666...
        assert_eq!(to_aqi(7.0).unwrap().value, 29.2);
        // 49 / 23.3 * 0.9 + 51 = 52.892...
        assert_eq!(to_aqi(13.0).unwrap().value, 52.9);
    }

    #[test]
    fn test_to_aqi_out_of_range() {
        assert_eq!(to_aqi(500.5), None);
        assert_eq!(to_aqi(10_000.0), None);
        assert_eq!(to_aqi(-0.1), None);
        assert_eq!(to_aqi(f64::NAN), None);
        // Between two rows of the table
        assert_eq!(to_aqi(12.05), None);
    }

    #[test]
    fn test_to_aqi_is_pure() {
        for c in [0.0, 12.0, 12.1, 47.3, 133.0, 499.9] {
            assert_eq!(to_aqi(c), to_aqi(c));
        }
    }

    #[test]
    fn test_category_from_aqi() {
        assert_eq!(Category::from_aqi(0.0), Category::Good);
        assert_eq!(Category::from_aqi(50.0), Category::Good);
        assert_eq!(Category::from_aqi(50.1), Category::Moderate);
        assert_eq!(Category::from_aqi(100.0), Category::Moderate);
        assert_eq!(Category::from_aqi(100.1), Category::UnhealthyForSensitiveGroups);
        assert_eq!(Category::from_aqi(150.0), Category::UnhealthyForSensitiveGroups);
        assert_eq!(Category::from_aqi(175.0), Category::Unhealthy);
        assert_eq!(Category::from_aqi(200.0), Category::Unhealthy);
        assert_eq!(Category::from_aqi(250.0), Category::VeryUnhealthy);
        assert_eq!(Category::from_aqi(300.0), Category::VeryUnhealthy);
        assert_eq!(Category::from_aqi(301.0), Category::Hazardous);
        assert_eq!(Category::from_aqi(500.0), Category::Hazardous);
        assert_eq!(Category::from_aqi(500.1), Category::OutOfRange);
        assert_eq!(Category::from_aqi(-1.0), Category::OutOfRange);
        assert_eq!(Category::from_aqi(f64::NAN), Category::OutOfRange);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::from_aqi(50.0).to_string(), "Good");
        assert_eq!(Category::from_aqi(50.1).to_string(), "Moderate");
        assert_eq!(Category::from_aqi(500.0).to_string(), "Hazardous");
        assert_eq!(Category::from_aqi(-1.0).to_string(), "out of range");
        assert_eq!(Category::Good.color_hex(), Some("#00E400"));
        assert_eq!(Category::OutOfRange.color_hex(), None);
    }

    #[test]
    fn test_breakpoints_are_contiguous() {
        for pair in PM25_BREAKPOINTS.windows(2) {
            let gap = pair[1].conc_low - pair[0].conc_high;
            assert!((gap - 0.1).abs() < 1e-9, "gap between rows: {gap}");
            assert_eq!(pair[1].aqi_low, pair[0].aqi_high + 1.0);
        }
    }
}
