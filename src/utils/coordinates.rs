use crate::utils::constants::EARTH_RADIUS_KM;

/// Haversine term `sin²(Δφ/2) + cos φ₁ cos φ₂ sin²(Δλ/2)`.
///
/// Monotone in great-circle distance, so it can be compared and sorted
/// directly. Convert with [`pseudo_to_km`] only when a physical distance is
/// needed.
pub fn pseudo_haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2)
}

/// Convert a pseudo-haversine value into kilometres.
pub fn pseudo_to_km(pseudo: f64) -> f64 {
    // Rounding can push the term fractionally outside [0, 1]
    EARTH_RADIUS_KM * 2.0 * pseudo.clamp(0.0, 1.0).sqrt().asin()
}

/// Calculate the distance between two points using the Haversine formula
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    pseudo_to_km(pseudo_haversine(lat1, lon1, lat2, lon2))
}

/// Position on the unit sphere.
///
/// For two such points the squared chord length divided by four equals
/// [`pseudo_haversine`], which lets a Euclidean index order by great-circle
/// distance.
pub fn to_unit_vector(lat: f64, lon: f64) -> [f64; 3] {
    let lat_rad = lat.to_radians();
    let lon_rad = lon.to_radians();
    [
        lat_rad.cos() * lon_rad.cos(),
        lat_rad.cos() * lon_rad.sin(),
        lat_rad.sin(),
    ]
}

pub fn chord_squared_to_pseudo(chord_squared: f64) -> f64 {
    chord_squared / 4.0
}
