use std::str::FromStr;

use crate::error::AppError;
use crate::models::destination::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            other => Err(AppError::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// Deep link that hands the active route over to the platform's map
/// application for turn-by-turn guidance, driving mode pre-selected.
pub fn external_nav_url(platform: Platform, origin: &GeoPoint, destination: &GeoPoint) -> String {
    match platform {
        Platform::Ios => format!(
            "https://maps.apple.com/?saddr={},{}&daddr={},{}&dirflg=d",
            origin.lat, origin.lng, destination.lat, destination.lng
        ),
        Platform::Android => format!(
            "https://www.google.com/maps/dir/?api=1&origin={},{}&destination={},{}&travelmode=driving",
            origin.lat, origin.lng, destination.lat, destination.lng
        ),
    }
}
