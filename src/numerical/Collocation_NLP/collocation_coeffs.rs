//! Collocation coefficients of the orthogonal collocation scheme.
//!
//! Degree 3 is the only tabulated scheme: two interior points plus the interval end. Interior
//! points of the first interval sit at the Lobatto fractions `e1, e2` = (5 ∓ √5)/10, all
//! following intervals use the Radau IIA fractions `c1, c2` = (4 ∓ √6)/10.
use crate::numerical::Collocation_NLP::NLP_errors::{CollocationError, Result};
use nalgebra::DVector;

pub const SUPPORTED_DEGREES: [usize; 1] = [3];

#[derive(Debug, Clone, PartialEq)]
pub struct CollocationScheme {
    pub deg: usize,
    /// interior fractions of intervals 1.. (Radau)
    pub c: DVector<f64>,
    /// interior fractions of interval 0 (Lobatto)
    pub e: DVector<f64>,
    /// integration coefficients, length deg + 1
    pub a1: DVector<f64>,
    pub a2: DVector<f64>,
    pub a3: DVector<f64>,
    /// differentiation coefficients, length deg + 2
    pub d1: DVector<f64>,
    pub d2: DVector<f64>,
    pub d3: DVector<f64>,
    /// 1/d1[deg+1]
    pub invd_last: f64,
    /// quadrature weights of interval 0, length deg + 1
    pub bl: DVector<f64>,
    /// quadrature weights of intervals 1.., length deg
    pub br: DVector<f64>,
}

impl CollocationScheme {
    pub fn is_supported(deg: usize) -> bool {
        SUPPORTED_DEGREES.contains(&deg)
    }

    pub fn new(deg: usize) -> Result<Self> {
        match deg {
            3 => Ok(Self::degree3()),
            _ => Err(CollocationError::UnsupportedDegree(deg)),
        }
    }

    fn degree3() -> Self {
        let c = DVector::from_vec(vec![
            0.155_051_025_721_682_19,
            0.644_948_974_278_317_8,
            1.0,
        ]);
        let e = DVector::from_vec(vec![
            0.276_393_202_250_021_03,
            0.723_606_797_749_978_97,
            1.0,
        ]);

        let a1 = DVector::from_vec(vec![
            4.139_387_691_339_813_7,
            3.224_744_871_391_589,
            1.167_840_084_690_405_5,
            0.253_197_264_742_180_83,
        ]);
        let a2 = DVector::from_vec(vec![
            1.739_387_691_339_813_7,
            3.567_840_084_690_405_5,
            0.775_255_128_608_410_95,
            1.053_197_264_742_180_8,
        ]);
        let a3 = DVector::from_vec(vec![
            3.0,
            5.531_972_647_421_808,
            7.531_972_647_421_808,
            5.0,
        ]);

        let d1 = DVector::from_vec(vec![
            4.301_315_561_749_642_5,
            3.618_033_988_749_895,
            0.854_101_966_249_684_5,
            0.170_820_393_249_936_9,
            0.447_213_595_499_957_94,
        ]);
        let d2 = DVector::from_vec(vec![
            3.301_315_561_749_642_5,
            5.854_101_966_249_684_5,
            1.381_966_011_250_105_2,
            1.170_820_393_249_936_9,
            0.447_213_595_499_957_94,
        ]);
        let d3 = DVector::from_vec(vec![
            7.0,
            11.180_339_887_498_949,
            11.180_339_887_498_949,
            7.0,
            1.0,
        ]);
        // √5
        let invd_last = 2.236_067_977_499_789_7;

        let bl0 = 1.0 / 12.0;
        let bl1 = 5.0 / 12.0;
        let bl = DVector::from_vec(vec![bl0, bl1, bl1, 1.0 - (bl0 + bl1 + bl1)]);

        let br2 = 1.0 / 9.0;
        let br1 = 0.512_485_826_188_421_6;
        let br = DVector::from_vec(vec![1.0 - (br1 + br2), br1, br2]);

        CollocationScheme {
            deg: 3,
            c,
            e,
            a1,
            a2,
            a3,
            d1,
            d2,
            d3,
            invd_last,
            bl,
            br,
        }
    }

    /// collocation fractions of interval `i`, interval end included
    pub fn fractions(&self, interval: usize) -> &DVector<f64> {
        if interval == 0 { &self.e } else { &self.c }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_degree3_sizes() {
        let s = CollocationScheme::new(3).unwrap();
        assert_eq!(s.c.len(), 3);
        assert_eq!(s.e.len(), 3);
        assert_eq!(s.a1.len(), 4);
        assert_eq!(s.a3.len(), 4);
        assert_eq!(s.d1.len(), 5);
        assert_eq!(s.d3.len(), 5);
        assert_eq!(s.bl.len(), 4);
        assert_eq!(s.br.len(), 3);
    }

    #[test]
    fn test_radau_and_lobatto_fractions() {
        let s = CollocationScheme::new(3).unwrap();
        let sq6 = 6_f64.sqrt();
        let sq5 = 5_f64.sqrt();
        assert_relative_eq!(s.c[0], (4.0 - sq6) / 10.0, epsilon = 1e-15);
        assert_relative_eq!(s.c[1], (4.0 + sq6) / 10.0, epsilon = 1e-15);
        assert_relative_eq!(s.e[0], (5.0 - sq5) / 10.0, epsilon = 1e-15);
        assert_relative_eq!(s.e[1], (5.0 + sq5) / 10.0, epsilon = 1e-15);
        assert_eq!(s.c[2], 1.0);
        assert_eq!(s.e[2], 1.0);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let s = CollocationScheme::new(3).unwrap();
        assert_relative_eq!(s.bl.sum(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(s.br.sum(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(s.invd_last * s.d1[4], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_unsupported_degree() {
        for deg in [0, 1, 2, 4, 5] {
            assert!(matches!(
                CollocationScheme::new(deg),
                Err(CollocationError::UnsupportedDegree(d)) if d == deg
            ));
            assert!(!CollocationScheme::is_supported(deg));
        }
    }

    #[test]
    fn test_first_interval_uses_shifted_fractions() {
        let s = CollocationScheme::new(3).unwrap();
        assert_eq!(s.fractions(0), &s.e);
        assert_eq!(s.fractions(1), &s.c);
        assert_eq!(s.fractions(7), &s.c);
    }
}
