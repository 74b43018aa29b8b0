//! Great-circle geometry helpers.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Calculate the great-circle distance between two positions.
///
/// Uses the haversine formula, which stays accurate over the short distances
/// between consecutive walking fixes.
///
/// # Arguments
///
/// * `from` - First position as (latitude, longitude) in degrees
/// * `to` - Second position as (latitude, longitude) in degrees
///
/// # Returns
///
/// Distance in meters.
///
/// # Example
///
/// ```
/// use walktrack::tracking::haversine_distance_m;
///
/// // One degree of latitude is ~111.2km
/// let dist = haversine_distance_m((0.0, 10.0), (1.0, 10.0));
/// assert!((dist - 111_195.0).abs() < 1.0);
/// ```
pub fn haversine_distance_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;

    let lat1_rad = lat1 * DEG_TO_RAD;
    let lat2_rad = lat2 * DEG_TO_RAD;
    let delta_lat = (lat2 - lat1) * DEG_TO_RAD;
    let delta_lon = (lon2 - lon1) * DEG_TO_RAD;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Total length of a path in meters, summing consecutive haversine legs.
pub fn path_length_m<I>(points: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut total = 0.0;
    let mut previous: Option<(f64, f64)> = None;
    for point in points {
        if let Some(prev) = previous {
            total += haversine_distance_m(prev, point);
        }
        previous = Some(point);
    }
    total
}
