//! SVY21 to WGS84 coordinate conversion.
//!
//! SVY21 is a transverse Mercator projection on the WGS84 ellipsoid with its
//! origin near the centre of Singapore. The inverse uses the closed-form
//! footpoint-latitude series (terms up to `D^6`), which is accurate to well
//! under a metre across the island.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Planar SVY21 coordinate in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Svy21Point {
    pub easting: f64,
    pub northing: f64,
}

impl Svy21Point {
    pub fn new(easting: f64, northing: f64) -> Self {
        Self { easting, northing }
    }
}

/// Geographic WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
const INVERSE_FLATTENING: f64 = 298.257_223_563;
const ORIGIN_LATITUDE: f64 = 1.366_666_666_666_667;
const ORIGIN_LONGITUDE: f64 = 103.833_333_333_333_333;
const FALSE_EASTING: f64 = 28_001.642;
const FALSE_NORTHING: f64 = 38_744.572;
const SCALE_FACTOR: f64 = 1.0;

/// Derived ellipsoid and projection constants, computed once.
#[derive(Debug)]
struct TransverseMercator {
    a: f64,
    e2: f64,
    ep2: f64,
    k0: f64,
    lat0: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
    /// Meridian arc length from the equator to the origin latitude.
    m0: f64,
    /// Rectifying radius factor turning an arc length into `mu`.
    mu_divisor: f64,
    footpoint: [f64; 4],
    arc: [f64; 4],
}

impl TransverseMercator {
    fn svy21() -> Self {
        let a = SEMI_MAJOR_AXIS;
        let f = 1.0 / INVERSE_FLATTENING;
        let e2 = 2.0 * f - f * f;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let arc = [
            1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0,
            3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0,
            15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0,
            35.0 * e6 / 3072.0,
        ];

        let root = (1.0 - e2).sqrt();
        let e1 = (1.0 - root) / (1.0 + root);
        let footpoint = [
            3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0,
            21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0,
            151.0 * e1.powi(3) / 96.0,
            1097.0 * e1.powi(4) / 512.0,
        ];

        let mut projection = Self {
            a,
            e2,
            ep2,
            k0: SCALE_FACTOR,
            lat0: ORIGIN_LATITUDE.to_radians(),
            lon0: ORIGIN_LONGITUDE.to_radians(),
            false_easting: FALSE_EASTING,
            false_northing: FALSE_NORTHING,
            m0: 0.0,
            mu_divisor: a * arc[0],
            footpoint,
            arc,
        };
        projection.m0 = projection.meridian_arc(projection.lat0);
        projection
    }

    fn meridian_arc(&self, phi: f64) -> f64 {
        let [c0, c2, c4, c6] = self.arc;
        self.a
            * (c0 * phi - c2 * (2.0 * phi).sin() + c4 * (4.0 * phi).sin()
                - c6 * (6.0 * phi).sin())
    }

    fn inverse(&self, point: Svy21Point) -> GeoPoint {
        let m = self.m0 + (point.northing - self.false_northing) / self.k0;
        let mu = m / self.mu_divisor;
        let [j1, j2, j3, j4] = self.footpoint;
        let phi1 = mu
            + j1 * (2.0 * mu).sin()
            + j2 * (4.0 * mu).sin()
            + j3 * (6.0 * mu).sin()
            + j4 * (8.0 * mu).sin();

        let (sin1, cos1) = phi1.sin_cos();
        let tan1 = phi1.tan();
        let w = 1.0 - self.e2 * sin1 * sin1;
        let n1 = self.a / w.sqrt();
        let r1 = self.a * (1.0 - self.e2) / w.powf(1.5);
        let t1 = tan1 * tan1;
        let c1 = self.ep2 * cos1 * cos1;
        let d = (point.easting - self.false_easting) / (n1 * self.k0);

        let latitude = phi1
            - (n1 * tan1 / r1)
                * (d.powi(2) / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * self.ep2) * d.powi(4)
                        / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * self.ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let longitude = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * self.ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos1;

        GeoPoint::new(latitude.to_degrees(), longitude.to_degrees())
    }

    fn forward(&self, point: GeoPoint) -> Svy21Point {
        let phi = point.latitude.to_radians();
        let lambda = point.longitude.to_radians();
        let (sin, cos) = phi.sin_cos();
        let tan = phi.tan();
        let n = self.a / (1.0 - self.e2 * sin * sin).sqrt();
        let t = tan * tan;
        let c = self.ep2 * cos * cos;
        let a = (lambda - self.lon0) * cos;
        let m = self.meridian_arc(phi);

        let easting = self.false_easting
            + self.k0
                * n
                * (a + (1.0 - t + c) * a.powi(3) / 6.0
                    + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * self.ep2) * a.powi(5) / 120.0);
        let northing = self.false_northing
            + self.k0
                * (m - self.m0
                    + n * tan
                        * (a.powi(2) / 2.0
                            + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                            + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * self.ep2)
                                * a.powi(6)
                                / 720.0));

        Svy21Point::new(easting, northing)
    }
}

static SVY21: LazyLock<TransverseMercator> = LazyLock::new(TransverseMercator::svy21);

/// Convert an SVY21 planar coordinate to WGS84 latitude and longitude.
///
/// Non-finite input yields a non-finite result; callers validate with
/// [`GeoPoint::is_finite`].
///
/// # Examples
/// ```
/// use carpark_backend::domain::coordinates::{Svy21Point, svy21_to_wgs84};
///
/// let origin = svy21_to_wgs84(Svy21Point::new(28_001.642, 38_744.572));
/// assert!((origin.latitude - 1.366_666).abs() < 1e-4);
/// assert!((origin.longitude - 103.833_333).abs() < 1e-4);
/// ```
pub fn svy21_to_wgs84(point: Svy21Point) -> GeoPoint {
    SVY21.inverse(point)
}

/// Project a WGS84 coordinate onto the SVY21 plane.
pub fn wgs84_to_svy21(point: GeoPoint) -> Svy21Point {
    SVY21.forward(point)
}
