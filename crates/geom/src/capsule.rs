//! Capsule mesh generation.
//!
//! A capsule is a body of `height` along the Z spine capped by two domes of
//! radius `radius_bottom` (centred at `-height / 2`) and `radius_top` (centred
//! at `+height / 2`). When the radii differ the body is the cone tangent to
//! both spheres, so the cap/body seam sits at the tangent latitude rather than
//! the equator.
//!
//! Point layout, bottom to top:
//! ```text
//! bottom pole
//! num_cap_axial rings of the bottom cap (last one is the bottom body ring)
//! num_cap_axial rings of the top cap    (first one is the top body ring)
//! top pole
//! ```
//! Each ring holds `num_radial` points for a closed sweep, `num_radial + 1`
//! for an open one (the seam column is duplicated, the boundary stays open).
//!
//! Faces are triangle fans around each pole and quad strips between rings,
//! wound counter-clockwise seen from outside.

use glam::{DMat4, DVec3, Vec3};
use std::f64::consts::FRAC_PI_2;

use crate::topology::MeshTopology;

/// Fewest longitude divisions that still enclose a volume.
pub const MIN_NUM_RADIAL: usize = 3;
/// Fewest latitude rings per cap.
pub const MIN_NUM_CAP_AXIAL: usize = 1;

const CLOSED_SWEEP_EPSILON: f64 = 1e-4;

/// Shape dimensions consumed by [`generate_points`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleGeometry {
    pub radius_bottom: f64,
    pub radius_top: f64,
    pub height: f64,
    pub sweep_degrees: f64,
}

impl Default for CapsuleGeometry {
    fn default() -> Self {
        Self {
            radius_bottom: 0.5,
            radius_top: 0.5,
            height: 2.0,
            sweep_degrees: 360.0,
        }
    }
}

/// Whether a sweep covers the full revolution.
pub fn is_closed_sweep(sweep_degrees: f64) -> bool {
    let sweep = sanitize_sweep(sweep_degrees);
    (sweep.abs() - 360.0).abs() < CLOSED_SWEEP_EPSILON
}

fn sanitize_sweep(sweep_degrees: f64) -> f64 {
    if sweep_degrees.is_finite() {
        sweep_degrees.clamp(-360.0, 360.0)
    } else {
        360.0
    }
}

/// Non-finite dimensions collapse to zero.
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn is_valid_resolution(num_radial: usize, num_cap_axial: usize) -> bool {
    num_radial >= MIN_NUM_RADIAL && num_cap_axial >= MIN_NUM_CAP_AXIAL
}

/// Points per latitude ring.
pub fn compute_num_radial_points(num_radial: usize, closed_sweep: bool) -> usize {
    if closed_sweep { num_radial } else { num_radial + 1 }
}

/// Exact number of points [`generate_points`] emits, or 0 below the minimum
/// resolution.
pub fn compute_num_points(num_radial: usize, num_cap_axial: usize, closed_sweep: bool) -> usize {
    if !is_valid_resolution(num_radial, num_cap_axial) {
        return 0;
    }
    let ring = compute_num_radial_points(num_radial, closed_sweep);
    2 * num_cap_axial * ring + 2
}

/// Connectivity for a capsule of the given resolution.
///
/// Depends on nothing else, so one buffer serves every capsule sharing
/// `(num_radial, num_cap_axial, closed_sweep)`. Returns an empty topology
/// below the minimum resolution.
pub fn generate_topology(
    num_radial: usize,
    num_cap_axial: usize,
    closed_sweep: bool,
) -> MeshTopology {
    if !is_valid_resolution(num_radial, num_cap_axial) {
        return MeshTopology::default();
    }

    let ring_len = compute_num_radial_points(num_radial, closed_sweep);
    let num_rings = 2 * num_cap_axial;
    let num_strips = num_rings - 1;
    let num_faces = 2 * num_radial + num_strips * num_radial;

    let ring_start = |ring: usize| (1 + ring * ring_len) as u32;
    let next = |i: usize| {
        if closed_sweep {
            ((i + 1) % num_radial) as u32
        } else {
            (i + 1) as u32
        }
    };
    let bottom_pole = 0u32;
    let top_pole = (1 + num_rings * ring_len) as u32;

    let mut counts = Vec::with_capacity(num_faces);
    let mut indices = Vec::with_capacity(2 * 3 * num_radial + 4 * num_strips * num_radial);

    let first = ring_start(0);
    for i in 0..num_radial {
        counts.push(3);
        indices.extend_from_slice(&[bottom_pole, first + next(i), first + i as u32]);
    }

    for strip in 0..num_strips {
        let lower = ring_start(strip);
        let upper = ring_start(strip + 1);
        for i in 0..num_radial {
            let (a, b) = (i as u32, next(i));
            counts.push(4);
            indices.extend_from_slice(&[lower + a, lower + b, upper + b, upper + a]);
        }
    }

    let last = ring_start(num_rings - 1);
    for i in 0..num_radial {
        counts.push(3);
        indices.extend_from_slice(&[last + i as u32, last + next(i), top_pole]);
    }

    MeshTopology {
        face_vertex_counts: counts,
        face_vertex_indices: indices,
    }
}

/// Latitude (radians from the equator) where the body meets both caps.
///
/// The body is tangent to the bottom sphere at `asin((rb - rt) / h)`; equal
/// radii give the equator. Never NaN for finite input.
fn tangent_latitude(radius_bottom: f64, radius_top: f64, height: f64) -> f64 {
    let diff = radius_bottom - radius_top;
    if height > 0.0 {
        (diff / height).clamp(-1.0, 1.0).asin()
    } else if diff > 0.0 {
        FRAC_PI_2
    } else if diff < 0.0 {
        -FRAC_PI_2
    } else {
        0.0
    }
}

/// Generate capsule points, appending them to `out`.
///
/// `basis` is applied last, after all generation math runs in the canonical
/// Z-spine frame. Appends exactly `compute_num_points(num_radial,
/// num_cap_axial, is_closed_sweep(geometry.sweep_degrees))` points.
pub fn generate_points_into(
    out: &mut Vec<Vec3>,
    num_radial: usize,
    num_cap_axial: usize,
    geometry: &CapsuleGeometry,
    basis: Option<&DMat4>,
) {
    if !is_valid_resolution(num_radial, num_cap_axial) {
        return;
    }

    let sweep = sanitize_sweep(geometry.sweep_degrees);
    let closed = is_closed_sweep(sweep);
    let ring_len = compute_num_radial_points(num_radial, closed);
    out.reserve(compute_num_points(num_radial, num_cap_axial, closed));

    let sweep_radians = sweep.to_radians();
    let ring_xy: Vec<(f64, f64)> = (0..ring_len)
        .map(|i| {
            let angle = (i as f64 / num_radial as f64) * sweep_radians;
            (angle.cos(), angle.sin())
        })
        .collect();

    let rb = finite_or_zero(geometry.radius_bottom);
    let rt = finite_or_zero(geometry.radius_top);
    let height = finite_or_zero(geometry.height);
    let half = 0.5 * height;
    let seam = tangent_latitude(rb, rt, height);

    let place = |p: DVec3| basis.map_or(p, |m| m.transform_point3(p)).as_vec3();
    let ring_xy = &ring_xy;
    let ring = move |radius: f64, z: f64| {
        ring_xy
            .iter()
            .map(move |&(x, y)| place(DVec3::new(radius * x, radius * y, z)))
    };

    out.push(place(DVec3::new(0.0, 0.0, -half - rb)));

    let cap_steps = num_cap_axial as f64;
    for step in 1..=num_cap_axial {
        let latitude = -FRAC_PI_2 + (seam + FRAC_PI_2) * (step as f64 / cap_steps);
        let (sin, cos) = latitude.sin_cos();
        out.extend(ring(rb * cos, -half + rb * sin));
    }
    for step in 0..num_cap_axial {
        let latitude = seam + (FRAC_PI_2 - seam) * (step as f64 / cap_steps);
        let (sin, cos) = latitude.sin_cos();
        out.extend(ring(rt * cos, half + rt * sin));
    }

    out.push(place(DVec3::new(0.0, 0.0, half + rt)));
}

/// Generate capsule points into a fresh buffer.
pub fn generate_points(
    num_radial: usize,
    num_cap_axial: usize,
    geometry: &CapsuleGeometry,
    basis: Option<&DMat4>,
) -> Vec<Vec3> {
    let mut points = Vec::new();
    generate_points_into(&mut points, num_radial, num_cap_axial, geometry, basis);
    points
}
