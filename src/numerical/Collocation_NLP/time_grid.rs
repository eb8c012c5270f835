//! Time mesh of the collocation problem: interval lengths and collocation instants.
use crate::numerical::Collocation_NLP::NLP_errors::{CollocationError, Result};
use crate::numerical::Collocation_NLP::arena::allocate_zeroed;
use crate::numerical::Collocation_NLP::collocation_coeffs::CollocationScheme;
use log::info;
use nalgebra::DVector;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeMesh {
    pub t0: f64,
    pub tf: f64,
    pub dt_default: f64,
    /// interval lengths, nsi entries
    pub dt: DVector<f64>,
    /// collocation instants, deg*nsi + 1 entries
    pub time: DVector<f64>,
}

impl TimeMesh {
    /// mesh with zeroed buffers, filled later by `move_grid` and `set_time_points`
    pub fn zeroed(nsi: usize, deg: usize) -> Result<Self> {
        let n_points = deg
            .checked_mul(nsi)
            .and_then(|n| n.checked_add(1))
            .ok_or(CollocationError::OutOfMemory {
                buffer: "time",
                len: usize::MAX,
            })?;
        Ok(TimeMesh {
            t0: 0.0,
            tf: 0.0,
            dt_default: 0.0,
            dt: DVector::from_vec(allocate_zeroed("dt", nsi, 0.0)?),
            time: DVector::from_vec(allocate_zeroed("time", n_points, 0.0)?),
        })
    }

    /// builds interval lengths and collocation instants in one go
    pub fn build(t0: f64, tf: f64, nsi: usize, scheme: &CollocationScheme) -> Result<Self> {
        let mut mesh = TimeMesh::zeroed(nsi, scheme.deg)?;
        mesh.move_grid(t0, tf)?;
        mesh.set_time_points(scheme)?;
        Ok(mesh)
    }

    pub fn nsi(&self) -> usize {
        self.dt.len()
    }

    /// Uniform interval lengths; the last interval absorbs the rounding so that the mesh ends
    /// exactly at `tf`.
    pub fn move_grid(&mut self, t0: f64, tf: f64) -> Result<()> {
        let nsi = self.nsi();
        if nsi == 0 {
            return Err(CollocationError::InvalidConfiguration(
                "number of mesh intervals must be positive".to_string(),
            ));
        }
        if !t0.is_finite() || !tf.is_finite() || tf <= t0 {
            return Err(CollocationError::InvalidConfiguration(format!(
                "time horizon [{}, {}] is empty or not finite",
                t0, tf
            )));
        }
        let span = tf - t0;
        let dt_default = span / nsi as f64;
        if !span.is_finite() || !dt_default.is_finite() || dt_default <= 0.0 {
            return Err(CollocationError::InvalidConfiguration(format!(
                "time horizon [{}, {}] cannot be split into {} finite intervals",
                t0, tf, nsi
            )));
        }
        self.t0 = t0;
        self.tf = tf;
        self.dt_default = dt_default;

        let mut t = t0;
        for dt in self.dt.iter_mut() {
            *dt = self.dt_default;
            t += self.dt_default;
        }
        self.dt[nsi - 1] = self.dt_default + (tf - t);
        info!(
            "time grid: {} intervals of length {} on [{}, {}]",
            nsi, self.dt_default, t0, tf
        );
        Ok(())
    }

    /// Expands interval lengths into collocation instants:
    /// `time[i*deg + k] = time[i*deg] + c_k * dt[i]` for the interior points of interval `i`
    /// followed by the interval end. The last instant is pinned to `tf`.
    pub fn set_time_points(&mut self, scheme: &CollocationScheme) -> Result<()> {
        let deg = scheme.deg;
        let nsi = self.nsi();
        if self.time.len() != deg * nsi + 1 {
            return Err(CollocationError::InvalidConfiguration(format!(
                "time buffer holds {} points, degree {} on {} intervals needs {}",
                self.time.len(),
                deg,
                nsi,
                deg * nsi + 1
            )));
        }
        self.time[0] = self.t0;
        let mut boundary = self.t0;
        for i in 0..nsi {
            let base = i * deg;
            let fractions = scheme.fractions(i);
            for k in 0..deg - 1 {
                self.time[base + k + 1] = self.time[base] + fractions[k] * self.dt[i];
            }
            boundary += self.dt[i];
            self.time[base + deg] = boundary;
        }
        self.time[deg * nsi] = self.tf;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scheme() -> CollocationScheme {
        CollocationScheme::new(3).unwrap()
    }

    #[test]
    fn test_two_intervals() {
        let mesh = TimeMesh::build(0.0, 2.0, 2, &scheme()).unwrap();
        assert_eq!(mesh.dt.as_slice(), &[1.0, 1.0]);
        assert_eq!(mesh.time.len(), 7);
        assert_relative_eq!(mesh.time[1], 0.2764, epsilon = 1e-4);
        assert_relative_eq!(mesh.time[2], 0.7236, epsilon = 1e-4);
        assert_eq!(mesh.time[3], 1.0);
        assert_relative_eq!(mesh.time[4], 1.1551, epsilon = 1e-4);
        assert_relative_eq!(mesh.time[5], 1.6449, epsilon = 1e-4);
        assert_eq!(mesh.time[6], 2.0);
    }

    #[test]
    fn test_dt_sums_to_horizon() {
        for (t0, tf, nsi) in [(0.0, 1.0, 3), (0.3, 7.1, 7), (-2.5, 11.0, 13), (1e3, 1e3 + 0.1, 9)] {
            let mesh = TimeMesh::build(t0, tf, nsi, &scheme()).unwrap();
            assert_relative_eq!(mesh.dt.sum(), tf - t0, epsilon = 1e-12);
            assert_eq!(mesh.time[0], t0);
            assert_eq!(mesh.time[mesh.time.len() - 1], tf);
            for w in mesh.time.as_slice().windows(2) {
                assert!(w[0] <= w[1], "time is not monotone: {:?}", w);
            }
        }
    }

    #[test]
    fn test_shifted_start() {
        let mesh = TimeMesh::build(1.0, 3.0, 2, &scheme()).unwrap();
        assert_relative_eq!(mesh.time[3], 2.0, epsilon = 1e-15);
        assert_eq!(mesh.time[6], 3.0);
        assert_relative_eq!(mesh.dt[1], 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_invalid_horizon() {
        assert!(matches!(
            TimeMesh::build(1.0, 1.0, 2, &scheme()),
            Err(CollocationError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            TimeMesh::build(0.0, f64::NAN, 2, &scheme()),
            Err(CollocationError::InvalidConfiguration(_))
        ));
        // both ends finite, span overflows
        assert!(matches!(
            TimeMesh::build(-1e308, 1e308, 2, &scheme()),
            Err(CollocationError::InvalidConfiguration(_))
        ));
        // span too small to give nonzero intervals
        assert!(matches!(
            TimeMesh::build(0.0, 5e-324, 4, &scheme()),
            Err(CollocationError::InvalidConfiguration(_))
        ));
        let mut mesh = TimeMesh::zeroed(2, 3).unwrap();
        assert!(mesh.move_grid(-1e308, 1e308).is_err());
        assert!(mesh.dt.iter().all(|&dt| dt == 0.0));
    }

    #[test]
    fn test_zero_intervals() {
        let mut mesh = TimeMesh::zeroed(0, 3).unwrap();
        assert!(matches!(
            mesh.move_grid(0.0, 1.0),
            Err(CollocationError::InvalidConfiguration(_))
        ));
    }
}
