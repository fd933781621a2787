use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::colors::{hsl_to_rgb, interpolate_hsl, rgb_to_hsl, to_hex};
use crate::error::LoadError;

/// Yearly averages for one prefecture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub temperature: f64,
    #[serde(default)]
    pub precipitation: Option<f64>,
}

pub type WeatherData = BTreeMap<String, WeatherRecord>;

pub fn weather_from_json(json: &str) -> Result<WeatherData, LoadError> {
    Ok(serde_json::from_str(json)?)
}

const COOL: (u8, u8, u8) = (49, 130, 189);
const WARM: (u8, u8, u8) = (222, 45, 38);

/// Linear temperature → color scale over the loaded data's range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureScale {
    pub min: f64,
    pub max: f64,
}

impl TemperatureScale {
    pub fn from_data(data: &WeatherData) -> Option<Self> {
        let mut temps = data
            .values()
            .map(|r| r.temperature)
            .filter(|t| t.is_finite());
        let first = temps.next()?;
        let (min, max) = temps.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        Some(Self { min, max })
    }

    pub fn color(&self, temperature: f64) -> String {
        let span = self.max - self.min;
        let t = if span.abs() < f64::EPSILON {
            0.5
        } else {
            ((temperature - self.min) / span).clamp(0.0, 1.0)
        };
        let from = rgb_to_hsl(COOL.0, COOL.1, COOL.2);
        let to = rgb_to_hsl(WARM.0, WARM.1, WARM.2);
        let (h, s, l) = interpolate_hsl(from, to, t);
        to_hex(hsl_to_rgb(h, s, l))
    }

    /// Fill per prefecture. Prefectures absent from `data` get no entry and
    /// fall back to the neutral fill when drawn.
    pub fn fills(&self, data: &WeatherData) -> BTreeMap<String, String> {
        data.iter()
            .filter(|(_, r)| r.temperature.is_finite())
            .map(|(name, r)| (name.clone(), self.color(r.temperature)))
            .collect()
    }
}
