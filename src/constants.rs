/// Earth angular velocity, in WGS84 frame rad/s
pub const EARTH_ANGULAR_VEL_RAD: f64 = 7.2921151467E-5;

/// Earth gravitational constant (km^3 s-2)
pub const EARTH_GRAVITATION_MU_KM3_S2: f64 = 398600.4418;

/// Sun gravitational constant (km^3 s-2)
pub const SUN_GRAVITATION_MU_KM3_S2: f64 = 1.32712440018E11;

/// Earth's moon gravitational constant (km^3 s-2)
pub const MOON_GRAVITATION_MU_KM3_S2: f64 = 4902.800066;

/// Earth equatorial radius (kilometers)
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.1363;

/// Earth flattening
pub const EARTH_FLATTENING: f64 = 1.0 / 298.256415;

/// Earth zonal harmonics (unnormalized, J_n = -C_n0)
pub const EARTH_J2: f64 = 1.082629989E-3;
pub const EARTH_J3: f64 = -2.53215306E-6;
pub const EARTH_J4: f64 = -1.61098761E-6;

/// Astronomical unit (kilometers)
pub const AU_KM: f64 = 1.49597870E8;

/// Speed of light in km.s⁻¹
pub const SPEED_OF_LIGHT_KM_S: f64 = 299792.458;

/// Solar radiation pressure at 1 AU (N.m⁻²)
pub const SOLAR_PRESSURE_1AU_N_M2: f64 = 4.56E-6;

/// Seconds per day
pub const SECONDS_PER_DAY: f64 = 86400.0;
