//! Roots of low-degree real polynomials and the depth-root selection rule.
//!
//! Coefficients are given highest degree first. Leading zero coefficients are
//! dropped before solving, so a "cubic" whose cubic coefficient is exactly zero
//! is treated as a quadratic and yields two roots; trailing zeros contribute
//! roots at the origin.

use std::cmp::Ordering;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Imaginary parts below this (relative to the real part) count as real
pub const REAL_TOLERANCE: f64 = 1e-12;

/// A possibly complex root
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub re: f64,
    pub im: f64,
}

impl Root {
    pub fn real(re: f64) -> Self {
        Self { re, im: 0.0 }
    }

    pub fn is_real(&self) -> bool {
        self.im.abs() <= REAL_TOLERANCE * self.re.abs().max(1.0)
    }

    /// Real and strictly positive, as a market depth must be
    pub fn is_admissible_depth(&self) -> bool {
        self.is_real() && self.re > 0.0
    }

    /// Order by real part, then imaginary part
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.re.total_cmp(&other.re).then(self.im.total_cmp(&other.im))
    }
}

/// All roots of a polynomial of degree at most three
pub fn polynomial_roots(coefficients: &[f64]) -> Vec<Root> {
    let start = coefficients.iter().position(|&c| c != 0.0);
    let Some(start) = start else {
        return Vec::new();
    };
    let end = coefficients.iter().rposition(|&c| c != 0.0).unwrap_or(start);

    let trimmed = &coefficients[start..=end];
    let zero_roots = coefficients.len() - 1 - end;

    let mut roots = match trimmed.len() {
        1 => Vec::new(),
        2 => vec![Root::real(-trimmed[1] / trimmed[0])],
        3 => quadratic_roots(trimmed[0], trimmed[1], trimmed[2]),
        4 => cubic_roots(trimmed[0], trimmed[1], trimmed[2], trimmed[3]),
        _ => Vec::new(),
    };
    roots.extend(std::iter::repeat(Root::real(0.0)).take(zero_roots));
    roots
}

fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<Root> {
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        let re = -b / (2.0 * a);
        let im = (-disc).sqrt() / (2.0 * a);
        return vec![Root { re, im }, Root { re, im: -im }];
    }

    // Avoid cancellation between -b and the square root
    let q = -0.5 * (b + b.signum() * disc.sqrt());
    if q == 0.0 {
        return vec![Root::real(0.0), Root::real(0.0)];
    }
    vec![Root::real(q / a), Root::real(c / q)]
}

fn cubic_roots(a: f64, b: f64, c: f64, d: f64) -> Vec<Root> {
    // Monic form x^3 + b x^2 + c x + d
    let (b, c, d) = (b / a, c / a, d / a);
    let shift = -b / 3.0;

    // Depressed cubic t^3 + p t + q with x = t + shift
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let disc = (q / 2.0).powi(2) + (p / 3.0).powi(3);

    if disc > 0.0 {
        // One real root, then deflate to a quadratic for the complex pair
        let s = disc.sqrt();
        let u = (-q / 2.0 - q.signum() * s).cbrt();
        let t = if u == 0.0 { 0.0 } else { u - p / (3.0 * u) };
        let r = t + shift;

        let qb = b + r;
        let qc = c + r * qb;
        let mut roots = vec![Root::real(r)];
        roots.extend(quadratic_roots(1.0, qb, qc));
        return roots;
    }

    if p == 0.0 {
        return vec![Root::real(shift); 3];
    }

    // Three real roots, trigonometric form
    let m = 2.0 * (-p / 3.0).sqrt();
    let arg = ((3.0 * q) / (2.0 * p) * (-3.0 / p).sqrt()).clamp(-1.0, 1.0);
    let theta = arg.acos() / 3.0;
    (0..3)
        .map(|k| Root::real(m * (theta - 2.0 * PI * k as f64 / 3.0).cos() + shift))
        .collect()
}

/// Pick the depth root: the median of three, or the maximum when fewer came back.
///
/// The maximum branch is what a quadratic (zero cubic coefficient) falls into.
pub fn select_depth_root(roots: &[Root]) -> Option<Root> {
    if roots.len() < 3 {
        return roots.iter().copied().max_by(|a, b| a.total_cmp(b));
    }
    let mut sorted = roots.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[sorted.len() / 2])
}
