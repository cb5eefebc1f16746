//! Road surface thermal model.
//!
//! Solves the steady-state surface energy balance (solar absorption,
//! convective exchange with air, radiative cooling toward the sky) by
//! Newton iteration, then applies NaCl freezing-point depression to decide
//! how much margin the surface has before icing.

use crate::physics::constants::{
    FREEZING_DEPRESSION_PER_PCT, NACL_EUTECTIC_CONC_PCT, SOLAR_ABSORPTIVITY, STEFAN_BOLTZMANN,
    SURFACE_EMISSIVITY,
};

const KELVIN_OFFSET: f64 = 273.15;
const MAX_NEWTON_ITERATIONS: usize = 50;
const RESIDUAL_TOLERANCE_W: f64 = 0.01;

/// Convective heat transfer coefficient, Jurges formula: `h = 5.7 + 3.8 v`.
fn convective_coeff(wind_speed_mps: f64) -> f64 {
    5.7 + 3.8 * wind_speed_mps
}

/// Effective sky temperature for radiative cooling, degC.
///
/// Humid air radiates back more, raising the effective sky temperature.
fn sky_temperature_c(air_temp_c: f64, humidity_pct: f64) -> f64 {
    let t_air_k = air_temp_c + KELVIN_OFFSET;
    let emissivity_factor = (0.8 + humidity_pct / 500.0).powf(0.25);
    t_air_k * emissivity_factor - KELVIN_OFFSET
}

/// Steady-state surface temperature from the energy balance, degC.
pub fn surface_temperature_c(
    air_temp_c: f64,
    wind_speed_mps: f64,
    humidity_pct: f64,
    solar_radiation_wm2: f64,
) -> f64 {
    let h_conv = convective_coeff(wind_speed_mps);
    let t_sky_k = sky_temperature_c(air_temp_c, humidity_pct) + KELVIN_OFFSET;
    let t_air_k = air_temp_c + KELVIN_OFFSET;

    let mut t_surface = air_temp_c;
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let t_s_k = t_surface + KELVIN_OFFSET;
        let q_solar = SOLAR_ABSORPTIVITY * solar_radiation_wm2;
        let q_conv = h_conv * (t_air_k - t_s_k);
        let q_rad = SURFACE_EMISSIVITY * STEFAN_BOLTZMANN * (t_sky_k.powi(4) - t_s_k.powi(4));
        let residual = q_solar + q_conv + q_rad;

        let derivative = -h_conv - 4.0 * SURFACE_EMISSIVITY * STEFAN_BOLTZMANN * t_s_k.powi(3);
        if derivative.abs() < 1e-12 {
            break;
        }
        t_surface -= residual / derivative;
        if residual.abs() < RESIDUAL_TOLERANCE_W {
            break;
        }
    }

    t_surface
}

/// Freezing point of the treated surface, degC.
///
/// Linear depression of `-0.6 degC` per percent NaCl, capped at the
/// eutectic concentration (23.3 %): adding salt beyond the eutectic cannot
/// lower the freezing point further.
pub fn freezing_point_c(brine_concentration_pct: f64) -> f64 {
    let conc = brine_concentration_pct.min(NACL_EUTECTIC_CONC_PCT);
    -FREEZING_DEPRESSION_PER_PCT * conc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jurges_coefficient() {
        assert!((convective_coeff(0.0) - 5.7).abs() < 1e-12);
        assert!((convective_coeff(3.0) - 17.1).abs() < 1e-12);
    }

    #[test]
    fn clear_night_surface_is_colder_than_air() {
        // No sun, dry air: radiative cooling dominates.
        let t = surface_temperature_c(0.0, 1.0, 30.0, 0.0);
        assert!(t < 0.0, "expected sub-air surface temperature, got {t}");
    }

    #[test]
    fn strong_sun_warms_the_surface() {
        let shaded = surface_temperature_c(5.0, 2.0, 50.0, 0.0);
        let sunny = surface_temperature_c(5.0, 2.0, 50.0, 600.0);
        assert!(sunny > shaded + 5.0);
    }

    #[test]
    fn freezing_depression_caps_at_eutectic() {
        assert!((freezing_point_c(10.0) + 6.0).abs() < 1e-9);
        assert!((freezing_point_c(23.3) - freezing_point_c(30.0)).abs() < 1e-9);
        assert_eq!(freezing_point_c(0.0), 0.0);
    }
}
