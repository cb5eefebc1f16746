//! Spray coverage model.
//!
//! Droplet trajectories are integrated ballistically under gravity,
//! quadratic drag, and wind, then splatted onto a grid over the road
//! rectangle to produce a coverage ratio. Droplets are fanned
//! deterministically across each device's spray cone; the only stochastic
//! input is the sampled median droplet diameter carried by the
//! [`ParameterSample`], so evaluation is a pure function of its inputs.

use crate::physics::constants::{
    AIR_DENSITY, BRINE_DENSITY_23PCT, DROPLETS_PER_DEVICE, DROPLET_DRAG_COEFF, GRAVITY,
    GRID_RESOLUTION_M, SPLASH_RADIUS_M, SPRAY_ELEVATION_DEG, SPRAY_VELOCITY_COEFF,
};
use crate::scenario::{ParameterSample, Scenario};

/// Trajectory integration step, seconds.
const DT_S: f64 = 0.002;
/// Flight time cap, seconds.
const MAX_FLIGHT_S: f64 = 5.0;

/// Nozzle exit velocity from Bernoulli: `v = Cv * sqrt(2 P / rho)`.
fn exit_velocity(pressure_pa: f64) -> f64 {
    SPRAY_VELOCITY_COEFF * (2.0 * pressure_pa / BRINE_DENSITY_23PCT).sqrt()
}

/// Integrate one droplet from launch to ground contact.
///
/// Returns the landing offset (x along the launch azimuth, y lateral)
/// relative to the nozzle, in the road frame before device placement.
fn droplet_landing(
    v0: f64,
    azimuth_rad: f64,
    height_m: f64,
    wind_speed: f64,
    wind_azimuth_rad: f64,
    diameter_m: f64,
) -> (f64, f64) {
    let elevation = SPRAY_ELEVATION_DEG.to_radians();
    let mut vx = v0 * elevation.cos() * azimuth_rad.cos();
    let mut vy = v0 * elevation.cos() * azimuth_rad.sin();
    let mut vz = v0 * elevation.sin();
    let (mut x, mut y, mut z) = (0.0, 0.0, height_m);

    let mass = (std::f64::consts::PI / 6.0) * diameter_m.powi(3) * BRINE_DENSITY_23PCT;
    let area = (std::f64::consts::PI / 4.0) * diameter_m.powi(2);
    let wx = wind_speed * wind_azimuth_rad.cos();
    let wy = wind_speed * wind_azimuth_rad.sin();

    let mut t = 0.0;
    while t < MAX_FLIGHT_S && z > 0.0 {
        let rel_vx = vx - wx;
        let rel_vy = vy - wy;
        let rel_speed = (rel_vx * rel_vx + rel_vy * rel_vy + vz * vz).sqrt();

        let (ax, ay, az) = if rel_speed > 0.0 {
            let drag = 0.5 * AIR_DENSITY * DROPLET_DRAG_COEFF * area * rel_speed;
            (
                -drag * rel_vx / (mass * rel_speed),
                -drag * rel_vy / (mass * rel_speed),
                -GRAVITY - drag * vz / (mass * rel_speed),
            )
        } else {
            (0.0, 0.0, -GRAVITY)
        };

        vx += ax * DT_S;
        vy += ay * DT_S;
        vz += az * DT_S;
        x += vx * DT_S;
        y += vy * DT_S;
        z += vz * DT_S;
        t += DT_S;
    }

    (x, y)
}

/// Compute the covered fraction of the road surface for one sampled draw.
///
/// The road is discretized at [`GRID_RESOLUTION_M`]; every landing point
/// marks the cells within [`SPLASH_RADIUS_M`] as covered.
pub fn coverage_ratio(scenario: &Scenario, sample: &ParameterSample) -> f64 {
    let road = &scenario.road;
    let nx = ((road.length_m / GRID_RESOLUTION_M).ceil() as usize).max(1);
    let ny = ((road.width_m / GRID_RESOLUTION_M).ceil() as usize).max(1);
    let mut grid = vec![false; nx * ny];

    let wind_azimuth = sample.wind_direction_deg.to_radians();
    let v0 = exit_velocity(scenario.supply.pump_pressure_pa);

    for (device, &median_diameter) in scenario.devices.iter().zip(&sample.droplet_diameters_m) {
        let half_cone = (device.spray_angle_deg / 2.0).to_radians();
        let aim = device.orientation_deg.to_radians();

        for i in 0..DROPLETS_PER_DEVICE {
            let frac = i as f64 / (DROPLETS_PER_DEVICE - 1) as f64;
            let azimuth = aim - half_cone + 2.0 * half_cone * frac;
            // Deterministic size spread across the fan, centered on the
            // sampled median (log-spaced over roughly +/- 2 sigma).
            let diameter = median_diameter * (1.2 * (2.0 * frac - 1.0)).exp();

            let (dx, dy) = droplet_landing(
                v0,
                azimuth,
                device.mount_height_m,
                sample.wind_speed_mps,
                wind_azimuth,
                diameter,
            );

            let land_x = device.station_m + dx;
            let land_y = road.width_m / 2.0 + device.offset_m + dy;

            splat(&mut grid, nx, ny, land_x, land_y);
        }
    }

    let covered = grid.iter().filter(|&&c| c).count();
    covered as f64 / (nx * ny) as f64
}

/// Mark cells within the splash radius of a landing point.
fn splat(grid: &mut [bool], nx: usize, ny: usize, x_m: f64, y_m: f64) {
    let ix = (x_m / GRID_RESOLUTION_M).floor() as i64;
    let iy = (y_m / GRID_RESOLUTION_M).floor() as i64;
    let radius = ((SPLASH_RADIUS_M / GRID_RESOLUTION_M).ceil() as i64).max(1);

    for dx in -radius..=radius {
        for dy in -radius..=radius {
            let (gx, gy) = (ix + dx, iy + dy);
            if gx >= 0 && (gx as usize) < nx && gy >= 0 && (gy as usize) < ny {
                grid[gx as usize * ny + gy as usize] = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::tests::test_scenario;
    use verglas_foundation::RngStream;

    #[test]
    fn exit_velocity_follows_bernoulli() {
        let v = exit_velocity(300_000.0);
        let expected = 0.95 * (2.0 * 300_000.0_f64 / 1170.0).sqrt();
        assert!((v - expected).abs() < 1e-9);
    }

    #[test]
    fn still_air_droplet_lands_downrange() {
        let (x, y) = droplet_landing(20.0, 0.0, 0.3, 0.0, 0.0, 0.001);
        assert!(x > 0.5, "droplet should travel downrange, got {x}");
        assert!(y.abs() < 1e-6, "no lateral drift in still air, got {y}");
    }

    #[test]
    fn crosswind_drifts_droplets_laterally() {
        let (_, calm_y) = droplet_landing(20.0, 0.0, 0.3, 0.0, 0.0, 0.0008);
        let (_, windy_y) = droplet_landing(20.0, 0.0, 0.3, 8.0, std::f64::consts::FRAC_PI_2, 0.0008);
        assert!(windy_y > calm_y, "crosswind should push droplets sideways");
    }

    #[test]
    fn coverage_is_a_valid_ratio_and_deterministic() {
        let scenario = test_scenario();
        let stream = RngStream::derive(7, "scenario.ramp-7");
        let sample = scenario.draw_sample(0, &stream);
        let a = coverage_ratio(&scenario, &sample);
        let b = coverage_ratio(&scenario, &sample);
        assert!((0.0..=1.0).contains(&a));
        assert_eq!(a.to_bits(), b.to_bits());
        assert!(a > 0.0, "a working nozzle must cover something");
    }
}
