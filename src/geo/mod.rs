use crate::error::AppError;
use crate::models::destination::GeoPoint;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_M * central_angle
}

// NaN parses as a valid f64, so an explicit finiteness check is required
// before the range checks.
pub fn is_valid(point: &GeoPoint) -> bool {
    point.lat.is_finite()
        && point.lng.is_finite()
        && (-90.0..=90.0).contains(&point.lat)
        && (-180.0..=180.0).contains(&point.lng)
}

pub fn parse_coordinates(raw: &str) -> Result<GeoPoint, AppError> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        return Err(AppError::Parse(format!(
            "expected \"lat,lng\", got {} value(s)",
            parts.len()
        )));
    }

    let lat = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| AppError::Parse(format!("latitude {:?} is not a number", parts[0].trim())))?;
    let lng = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| AppError::Parse(format!("longitude {:?} is not a number", parts[1].trim())))?;

    let point = GeoPoint { lat, lng };
    if !is_valid(&point) {
        return Err(AppError::Parse(format!(
            "coordinates out of range: latitude must be within [-90, 90] and longitude within [-180, 180], got {lat},{lng}"
        )));
    }

    Ok(point)
}
