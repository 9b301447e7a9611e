//! Coordinate maps from logical grid coordinates to physical space.

use hcmesh_core::{CoordinateMap, Real};

/// The identity map: physical coordinates equal logical coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IdentityMap;

impl<const D: usize> CoordinateMap<D> for IdentityMap {
    fn map(&self, logical: [Real; D]) -> [Real; D] {
        logical
    }
}

/// Polar (2-D) or spherical (3-D) arc map.
///
/// Logical axis 0 is the radius. In 2-D, axis 1 maps to the angle
/// `theta0 + theta_coeff * s1`. In 3-D, axis 1 maps to the polar angle
/// `theta0 + theta_coeff * s1` and axis 2 to the azimuth
/// `phi0 + phi_coeff * s2`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcMap {
    /// Polar angle at logical coordinate 0.
    pub theta0: Real,
    /// Radians per logical unit along axis 1.
    pub theta_coeff: Real,
    /// Azimuth at logical coordinate 0.
    pub phi0: Real,
    /// Radians per logical unit along axis 2.
    pub phi_coeff: Real,
}

impl Default for ArcMap {
    fn default() -> Self {
        Self {
            theta0: 0.0,
            theta_coeff: 1.0,
            phi0: 0.0,
            phi_coeff: 1.0,
        }
    }
}

impl CoordinateMap<2> for ArcMap {
    fn map(&self, s: [Real; 2]) -> [Real; 2] {
        let r = s[0];
        let theta = self.theta0 + self.theta_coeff * s[1];
        [r * theta.cos(), r * theta.sin()]
    }
}

impl CoordinateMap<3> for ArcMap {
    fn map(&self, s: [Real; 3]) -> [Real; 3] {
        let r = s[0];
        let theta = self.theta0 + self.theta_coeff * s[1];
        let phi = self.phi0 + self.phi_coeff * s[2];
        [
            r * theta.sin() * phi.cos(),
            r * theta.sin() * phi.sin(),
            r * theta.cos(),
        ]
    }
}

pub(crate) fn distance<const D: usize>(a: &[Real; D], b: &[Real; D]) -> Real {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<Real>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn identity_is_identity() {
        let m = IdentityMap;
        assert_eq!(CoordinateMap::<3>::map(&m, [1.0, 2.0, 3.0]), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn polar_quarter_turn() {
        let m = ArcMap {
            theta_coeff: FRAC_PI_2,
            ..ArcMap::default()
        };
        let [x, y] = CoordinateMap::<2>::map(&m, [2.0, 1.0]);
        assert!(x.abs() < 1e-12);
        assert!((y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn spherical_pole() {
        let m = ArcMap::default();
        let p = CoordinateMap::<3>::map(&m, [3.0, 0.0, 0.7]);
        assert!((p[2] - 3.0).abs() < 1e-12);
        assert!(p[0].abs() < 1e-12 && p[1].abs() < 1e-12);
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }
}
