// src/utils/geo.rs

/// Mean Earth radius in metres.
const EARTH_RADIUS_METRES: f64 = 6_371_008.8;

/// Great-circle distance between two `(lng, lat)` points, in metres.
pub fn haversine_metres(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lng1, lat1) = (from.0.to_radians(), from.1.to_radians());
    let (lng2, lat2) = (to.0.to_radians(), to.1.to_radians());

    let d_lat = lat2 - lat1;
    let d_lng = lng2 - lng1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METRES * a.sqrt().min(1.0).asin()
}

/// Axis-aligned box that contains every point within `radius` metres of the centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lng: f64,
    pub max_lng: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn around(lng: f64, lat: f64, radius_metres: f64) -> Self {
        let d_lat = (radius_metres / EARTH_RADIUS_METRES).to_degrees();
        let min_lat = (lat - d_lat).max(-90.0);
        let max_lat = (lat + d_lat).min(90.0);

        // Near the poles (or a box spanning the antimeridian) fall back to every longitude.
        let cos_lat = lat.to_radians().cos();
        let (min_lng, max_lng) = if max_lat >= 90.0 || min_lat <= -90.0 || cos_lat <= f64::EPSILON {
            (-180.0, 180.0)
        } else {
            let d_lng = d_lat / cos_lat;
            if lng - d_lng < -180.0 || lng + d_lng > 180.0 {
                (-180.0, 180.0)
            } else {
                (lng - d_lng, lng + d_lng)
            }
        };

        Self {
            min_lng,
            max_lng,
            min_lat,
            max_lat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_to_self() {
        assert!(haversine_metres((2.35, 48.85), (2.35, 48.85)).abs() < 1e-6);
    }

    #[test]
    fn paris_to_london_is_about_344_km() {
        let d = haversine_metres((2.3522, 48.8566), (-0.1276, 51.5072));
        assert!((d - 343_500.0).abs() < 2_000.0, "got {d}");
    }

    #[test]
    fn bounding_box_contains_radius() {
        let b = BoundingBox::around(2.35, 48.85, 10_000.0);
        assert!(b.min_lat < 48.85 && b.max_lat > 48.85);
        assert!(b.min_lng < 2.35 && b.max_lng > 2.35);
        // A point 9.9 km due north must fall inside.
        let north = 48.85 + (9_900.0 / EARTH_RADIUS_METRES).to_degrees();
        assert!(north < b.max_lat);
    }

    #[test]
    fn bounding_box_near_antimeridian_spans_all_longitudes() {
        let b = BoundingBox::around(179.99, 0.0, 10_000.0);
        assert_eq!((b.min_lng, b.max_lng), (-180.0, 180.0));
    }
}
