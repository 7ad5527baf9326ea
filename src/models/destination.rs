use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub address: String,
    pub coordinates: GeoPoint,
}

// Fixed delivery catalog; destinations are never created or deleted at
// runtime.
pub fn catalog() -> Vec<Destination> {
    vec![
        Destination {
            id: "palladium".to_string(),
            name: "Palladium Mall".to_string(),
            address: "Palladium Mall, Ahmedabad".to_string(),
            coordinates: GeoPoint {
                lat: 23.058746,
                lng: 72.521035,
            },
        },
        Destination {
            id: "alphaone".to_string(),
            name: "AlphaOne Mall".to_string(),
            address: "AlphaOne Mall, Ahmedabad".to_string(),
            coordinates: GeoPoint {
                lat: 23.040149,
                lng: 72.5287451,
            },
        },
    ]
}
