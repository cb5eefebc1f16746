//! Physical constants and design thresholds.

// Physical constants
pub const GRAVITY: f64 = 9.81; // m/s^2
pub const AIR_DENSITY: f64 = 1.225; // kg/m^3 at 15 degC, sea level
pub const BRINE_DENSITY_23PCT: f64 = 1170.0; // kg/m^3 (23% NaCl solution)
pub const DROPLET_DRAG_COEFF: f64 = 0.44; // small spherical droplets
pub const STEFAN_BOLTZMANN: f64 = 5.67e-8; // W/(m^2 K^4)

// NaCl brine
pub const NACL_EUTECTIC_TEMP_C: f64 = -21.1;
pub const NACL_EUTECTIC_CONC_PCT: f64 = 23.3;
/// Linear freezing-point depression per percent NaCl, degC.
pub const FREEZING_DEPRESSION_PER_PCT: f64 = 0.6;

// Surface radiative properties (asphalt)
pub const SURFACE_EMISSIVITY: f64 = 0.93;
pub const SOLAR_ABSORPTIVITY: f64 = 0.85;

// Nozzle
/// Nozzle velocity coefficient (Cv) in the Bernoulli exit velocity.
pub const SPRAY_VELOCITY_COEFF: f64 = 0.95;
/// Droplets fanned across each device's spray cone per evaluation.
pub const DROPLETS_PER_DEVICE: usize = 24;
/// Vertical launch angle of the spray fan, degrees.
pub const SPRAY_ELEVATION_DEG: f64 = 30.0;

// Coverage grid
pub const GRID_RESOLUTION_M: f64 = 0.1;
pub const SPLASH_RADIUS_M: f64 = 0.05;

// Design thresholds (KDS 24 10 10, road design standards)
/// Minimum acceptable brine coverage ratio.
pub const MIN_BRINE_COVERAGE: f64 = 0.85;
/// Thermal margin corresponding to a safety factor of 1.0, degC.
pub const REFERENCE_THERMAL_MARGIN_C: f64 = 10.0 / 3.0;
/// Weights of the spray and thermal terms in the combined safety factor.
pub const SPRAY_SF_WEIGHT: f64 = 0.6;
pub const THERMAL_SF_WEIGHT: f64 = 0.4;
