//! Spherical earth geodesics used by the derived views
use std::fmt;

/// Mean earth radius, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// A point on the sphere, stored in radians
///
/// Formulas from <http://www.movable-type.co.uk/scripts/latlong.html>
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    /// Latitude in radians
    pub lat: f64,
    /// Longitude in radians
    pub lon: f64,
}

impl LatLon {
    /// A point from degrees
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.to_radians(),
            lon: lon.to_radians(),
        }
    }

    /// A point from radians
    pub fn from_radians(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Latitude in degrees
    pub fn lat_degrees(&self) -> f64 {
        self.lat.to_degrees()
    }

    /// Longitude in degrees
    pub fn lon_degrees(&self) -> f64 {
        self.lon.to_degrees()
    }

    /// GeoJSON position, longitude first
    pub fn geojson(&self) -> String {
        format!("[{}, {}]", self.lon_degrees(), self.lat_degrees())
    }

    /// Great circle distance in radians (haversine)
    pub fn angular_distance_to(&self, other: &LatLon) -> f64 {
        let d_lat = other.lat - self.lat;
        let d_lon = other.lon - self.lon;
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.cos() * other.lat.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * a.sqrt().min(1.0).asin()
    }

    /// Great circle distance in meters
    pub fn distance_to(&self, other: &LatLon) -> f64 {
        EARTH_RADIUS_M * self.angular_distance_to(other)
    }

    /// Initial bearing towards `other`, in radians clockwise from north
    pub fn bearing_to(&self, other: &LatLon) -> f64 {
        let d_lon = other.lon - self.lon;
        let y = d_lon.sin() * other.lat.cos();
        let x = self.lat.cos() * other.lat.sin() - self.lat.sin() * other.lat.cos() * d_lon.cos();
        y.atan2(x)
    }

    /// Destination reached following `bearing` for an angular distance `dist`
    pub fn add_bearing_and_angular_distance(&self, bearing: f64, dist: f64) -> LatLon {
        let lat = (self.lat.sin() * dist.cos() + self.lat.cos() * dist.sin() * bearing.cos()).asin();
        let lon = self.lon
            + (bearing.sin() * dist.sin() * self.lat.cos())
                .atan2(dist.cos() - self.lat.sin() * lat.sin());
        LatLon::from_radians(lat, lon)
    }

    /// Distance in meters from this point to the segment `l1`-`l2`
    ///
    /// The foot of the cross track perpendicular is used when it lies between both ends,
    /// otherwise the nearest end.
    pub fn distance_to_segment(&self, l1: &LatLon, l2: &LatLon) -> f64 {
        let d_l1_x = l1.angular_distance_to(self);
        let t_l1_x = l1.bearing_to(self);
        let d_l1_l2 = l1.angular_distance_to(l2);
        let t_l1_l2 = l1.bearing_to(l2);
        let d_l2_x = l2.angular_distance_to(self);

        let d_cross = (d_l1_x.sin() * (t_l1_x - t_l1_l2).sin()).asin();
        let d_along = (d_l1_x.cos() / d_cross.cos()).clamp(-1.0, 1.0).acos();

        let lx = l1.add_bearing_and_angular_distance(t_l1_l2, d_along);
        let d_lx_x = lx.angular_distance_to(self);

        if d_along < d_l1_l2 && d_lx_x < d_l1_x && d_lx_x < d_l2_x {
            EARTH_RADIUS_M * d_lx_x
        } else {
            EARTH_RADIUS_M * d_l1_x.min(d_l2_x)
        }
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat_degrees(), self.lon_degrees())
    }
}
