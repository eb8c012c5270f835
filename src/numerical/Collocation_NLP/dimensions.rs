//! Decision-vector layout of the collocation NLP.
//!
//! All sizes are derived from five integers: number of states `nx`, inputs `nu`, path
//! constraints `nc`, collocation degree `deg` and number of mesh intervals `nsi`. The decision
//! vector stacks one block of `nv = nx + nu` values (states first, then inputs) for every
//! collocation point and one extra block for the initial point:
//! ```text
//! | x_0 u_0 | x_1 u_1 | ... | x_{deg*nsi} u_{deg*nsi} |
//! ```
use crate::numerical::Collocation_NLP::NLP_errors::{CollocationError, Result};
use crate::numerical::Collocation_NLP::collocation_coeffs::CollocationScheme;
use log::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemDimensions {
    pub nx: usize,
    pub nu: usize,
    pub nc: usize,
    pub deg: usize,
    pub nsi: usize,
    /// variables per collocation point
    pub nv: usize,
    /// stacked states of one interval
    pub nX: usize,
    /// stacked inputs of one interval
    pub nU: usize,
    pub nV: usize,
    /// all stacked states
    pub NX: usize,
    /// all stacked inputs
    pub NU: usize,
    /// length of the decision vector
    pub NV: usize,
    /// residual equations per interval
    pub nRes: usize,
    pub NRes: usize,
    /// offset of the last block in the decision vector
    pub endN: usize,
    /// rows of the per-point constraint/derivative block
    pub nJ: usize,
    /// number of NLP constraints: collocation residuals plus path constraints
    pub ng: usize,
    /// number of time points: deg*nsi + 1
    pub n_points: usize,
}

fn mul(a: usize, b: usize, what: &'static str) -> Result<usize> {
    a.checked_mul(b).ok_or(CollocationError::OutOfMemory {
        buffer: what,
        len: usize::MAX,
    })
}

fn add(a: usize, b: usize, what: &'static str) -> Result<usize> {
    a.checked_add(b).ok_or(CollocationError::OutOfMemory {
        buffer: what,
        len: usize::MAX,
    })
}

impl ProblemDimensions {
    pub fn new(nx: usize, nu: usize, nc: usize, deg: usize, nsi: usize) -> Result<Self> {
        if nsi == 0 {
            return Err(CollocationError::InvalidConfiguration(
                "number of mesh intervals must be positive".to_string(),
            ));
        }
        if !CollocationScheme::is_supported(deg) {
            return Err(CollocationError::UnsupportedDegree(deg));
        }
        if nx == 0 && nu == 0 {
            return Err(CollocationError::InvalidConfiguration(
                "model has neither states nor inputs".to_string(),
            ));
        }

        let nX = mul(nx, deg, "nX")?;
        let nU = mul(nu, deg, "nU")?;
        let NX = add(mul(nX, nsi, "NX")?, nx, "NX")?;
        let NU = add(mul(nU, nsi, "NU")?, nu, "NU")?;
        let nv = add(nx, nu, "nv")?;
        let nV = add(nX, nU, "nV")?;
        let NV = add(NX, NU, "NV")?;
        let nRes = nX;
        let NRes = mul(nRes, nsi, "NRes")?;
        let nJ = add(nc, nx, "nJ")?;
        let ng = add(NRes, mul(mul(nc, deg, "ng")?, nsi, "ng")?, "ng")?;
        let n_points = add(mul(deg, nsi, "time")?, 1, "time")?;

        let dims = ProblemDimensions {
            nx,
            nu,
            nc,
            deg,
            nsi,
            nv,
            nX,
            nU,
            nV,
            NX,
            NU,
            NV,
            nRes,
            NRes,
            endN: NV - nv,
            nJ,
            ng,
            n_points,
        };
        info!(
            "NLP layout: nx = {}, nu = {}, nc = {}, deg = {}, nsi = {} => NV = {}, ng = {}",
            nx, nu, nc, deg, nsi, dims.NV, dims.ng
        );
        Ok(dims)
    }

    /// index of variable `var` (0..nv) at time point `point` (0..n_points) in the decision vector
    pub fn var_index(&self, point: usize, var: usize) -> usize {
        point * self.nv + var
    }
}
