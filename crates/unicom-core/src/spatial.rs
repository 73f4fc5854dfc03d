//! Spatial math for vicinity routing and corridor occupancy tests.

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (haversine).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

pub fn lat_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lat(ref_lat_deg)
}

pub fn lon_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lon(ref_lat_deg)
}

pub fn meters_to_lat(meters: f64, ref_lat_deg: f64) -> f64 {
    meters / meters_per_deg_lat(ref_lat_deg).max(1e-9)
}

/// Project a point at a given distance and bearing from an origin.
///
/// Used to construct approach corridor endpoints from a runway threshold.
/// Bearing is in radians, 0 = north, pi/2 = east.
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Minimum distance from a point to a line segment, in meters.
///
/// This is the corridor occupancy test: distance from an aircraft to the
/// approach segment. A point-to-midpoint shortcut understates separation for
/// aircraft abeam either end of the corridor and must not be used here.
pub fn distance_to_segment_m(
    point_lat: f64,
    point_lon: f64,
    seg_start_lat: f64,
    seg_start_lon: f64,
    seg_end_lat: f64,
    seg_end_lon: f64,
) -> f64 {
    // Local ENU projection with the segment start as origin. Corridors are a
    // few nautical miles long, well within the flat-earth tolerance.
    let ref_lat = seg_start_lat;

    let px = lon_to_meters(point_lon - seg_start_lon, ref_lat);
    let py = lat_to_meters(point_lat - seg_start_lat, ref_lat);

    let sx = lon_to_meters(seg_end_lon - seg_start_lon, ref_lat);
    let sy = lat_to_meters(seg_end_lat - seg_start_lat, ref_lat);

    let seg_len_sq = sx * sx + sy * sy;

    if seg_len_sq < 0.0001 {
        // Degenerate segment, treat as a point
        return (px * px + py * py).sqrt();
    }

    // Project the point onto the segment line: t = ((P-A) . (B-A)) / |B-A|^2
    let t = ((px * sx + py * sy) / seg_len_sq).clamp(0.0, 1.0);

    let dx = px - t * sx;
    let dy = py - t * sy;

    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn haversine_same_point() {
        let dist = haversine_distance(37.3329, -121.8195, 37.3329, -121.8195);
        assert!(dist < 0.001);
    }

    #[test]
    fn offset_round_trips_through_haversine() {
        let (lat, lon) = offset_by_bearing(37.0, -122.0, 5_000.0, 1.2);
        let dist = haversine_distance(37.0, -122.0, lat, lon);
        assert!((dist - 5_000.0).abs() < 5.0);
    }

    #[test]
    fn point_beside_segment_midpoint() {
        // Segment running north from the origin; point 100m east of its middle.
        let base_lat = 37.0;
        let base_lon = -122.0;
        let (end_lat, end_lon) = offset_by_bearing(base_lat, base_lon, 2_000.0, 0.0);
        let (p_lat, p_lon) = {
            let (mid_lat, mid_lon) = offset_by_bearing(base_lat, base_lon, 1_000.0, 0.0);
            offset_by_bearing(mid_lat, mid_lon, 100.0, std::f64::consts::FRAC_PI_2)
        };

        let dist = distance_to_segment_m(p_lat, p_lon, base_lat, base_lon, end_lat, end_lon);
        assert!((dist - 100.0).abs() < 2.0, "got {dist}");
    }

    #[test]
    fn point_beyond_segment_end_measures_to_endpoint() {
        // Point 500m past the far end must measure ~500m, not its distance to
        // the midpoint (~1500m) or to the infinite line (0m).
        let base_lat = 37.0;
        let base_lon = -122.0;
        let (end_lat, end_lon) = offset_by_bearing(base_lat, base_lon, 2_000.0, 0.0);
        let (p_lat, p_lon) = offset_by_bearing(base_lat, base_lon, 2_500.0, 0.0);

        let dist = distance_to_segment_m(p_lat, p_lon, base_lat, base_lon, end_lat, end_lon);
        assert!((dist - 500.0).abs() < 5.0, "got {dist}");
    }
}
