use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

use crate::entities::{user_location, prelude::*};

pub const DEFAULT_RADIUS_KM: f64 = 2.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two (lat, lng) points in kilometres.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

pub fn radius_km_from_env() -> f64 {
    std::env::var("NEARBY_RADIUS_KM")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_RADIUS_KM)
}

/// Users currently sharing their location within `radius_km` of the given
/// point, excluding the requester. Candidate pool is small (one row per
/// sharing user), so the distance filter runs in process.
pub async fn find_nearby_helpers(
    db: &DatabaseConnection,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
    exclude_user_id: i32,
) -> Result<Vec<user_location::Model>, DbErr> {
    let sharing = UserLocation::find()
        .filter(user_location::Column::IsSharing.eq(true))
        .filter(user_location::Column::UserId.ne(exclude_user_id))
        .all(db)
        .await?;

    Ok(sharing
        .into_iter()
        .filter(|loc| haversine_km(latitude, longitude, loc.latitude, loc.longitude) <= radius_km)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_of_identical_points_is_zero() {
        assert!(haversine_km(34.07, -118.45, 34.07, -118.45) < 1e-9);
    }

    #[test]
    fn haversine_one_degree_longitude_at_equator() {
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.19).abs() < 0.5, "got {}", d);
    }

    #[test]
    fn haversine_close_campus_points_within_default_radius() {
        let d = haversine_km(34.07, -118.45, 34.071, -118.449);
        assert!(d < DEFAULT_RADIUS_KM, "got {}", d);
    }
}

#[cfg(all(test, feature = "mock"))]
mod mock_tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn loc(user_id: i32, latitude: f64, longitude: f64) -> user_location::Model {
        user_location::Model {
            user_id,
            latitude,
            longitude,
            is_sharing: true,
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[tokio::test]
    async fn nearby_filters_by_radius() {
        // is_sharing / exclusion filters run in SQL; the mock returns the
        // candidate pool and the radius cut happens here.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                loc(2, 34.071, -118.449),  // ~150 m away
                loc(3, 34.25, -118.45),    // ~20 km away
            ]])
            .into_connection();

        let nearby = find_nearby_helpers(&db, 34.07, -118.45, 2.0, 1)
            .await
            .unwrap();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].user_id, 2);
    }
}
