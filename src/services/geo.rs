// src/services/geo.rs
// DOCUMENTATION: Geographic helpers shared by search, dedupe and map output
// PURPOSE: Distance math and GeoJSON conversion

use crate::models::Place;
use geo_types::Point;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Build a point from latitude/longitude (geo-types stores x = longitude)
pub fn point(latitude: f64, longitude: f64) -> Point<f64> {
    Point::new(longitude, latitude)
}

/// Great-circle distance between two points in kilometers (haversine)
pub fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    let d_lat = (b.y() - a.y()).to_radians();
    let d_lon = (b.x() - a.x()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.y().to_radians().cos() * b.y().to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Distance in meters
pub fn distance_m(a: Point<f64>, b: Point<f64>) -> f64 {
    haversine_km(a, b) * 1000.0
}

/// Latitude/longitude deltas of a box enclosing a circle of `radius_km`
/// DOCUMENTATION: Used to prefilter rows in SQL before the exact haversine check
pub fn bounding_deltas(latitude: f64, radius_km: f64) -> (f64, f64) {
    let lat_delta = radius_km / 111.0;
    let cos_lat = latitude.to_radians().cos().abs().max(0.01);
    let lon_delta = (radius_km / (111.0 * cos_lat)).min(180.0);
    (lat_delta, lon_delta)
}

/// Convert places into a GeoJSON FeatureCollection for the map view
pub fn places_to_geojson(places: &[Place]) -> FeatureCollection {
    let features = places
        .iter()
        .map(|place| {
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), place.id.to_string().into());
            properties.insert("name".to_string(), place.name.clone().into());
            properties.insert("slug".to_string(), place.slug.clone().into());
            properties.insert("type".to_string(), place.place_type.as_str().into());
            properties.insert("city".to_string(), place.city_slug.clone().into());
            if let Some(rating) = place.rating {
                properties.insert("rating".to_string(), f64::from(rating).into());
            }
            if let Some(ref image) = place.image_url {
                properties.insert("image_url".to_string(), image.clone().into());
            }

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    place.longitude,
                    place.latitude,
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Madrid (Puerta del Sol) to Barcelona (Plaça de Catalunya), ~505 km
        let madrid = point(40.4168, -3.7038);
        let barcelona = point(41.3870, 2.1701);
        let d = haversine_km(madrid, barcelona);
        assert!(d > 495.0 && d < 515.0, "got {}", d);
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = point(52.52, 13.405);
        assert!(distance_m(p, p) < 1e-6);
    }

    #[test]
    fn test_small_distance_in_meters() {
        // 0.0005 degrees of latitude is roughly 55 m
        let a = point(48.8566, 2.3522);
        let b = point(48.8571, 2.3522);
        let d = distance_m(a, b);
        assert!(d > 50.0 && d < 60.0, "got {}", d);
    }

    #[test]
    fn test_bounding_deltas_widen_with_latitude() {
        let (lat_eq, lon_eq) = bounding_deltas(0.0, 10.0);
        let (lat_north, lon_north) = bounding_deltas(60.0, 10.0);
        assert!((lat_eq - lat_north).abs() < 1e-9);
        assert!(lon_north > lon_eq);
    }
}
