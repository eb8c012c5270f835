//! Storage of one optimization run.
//!
//! `ProblemArena` owns every buffer the NLP solver reads or writes: bounds, scaling, the
//! time mesh, collocation coefficients, sparsity flags, Jacobian/Hessian storage and
//! multipliers. Ragged row-pointer structures of a classic C layout are replaced by flat
//! `Vec`s and column-major nalgebra matrices. Every allocation is fallible, and buffers are
//! plain owned locals until the arena is returned, so a failed allocation releases whatever
//! was already acquired.
use crate::numerical::Collocation_NLP::NLP_errors::{CollocationError, Result};
use crate::numerical::Collocation_NLP::collocation_coeffs::CollocationScheme;
use crate::numerical::Collocation_NLP::diagnostics::DiagnosticsExporter;
use crate::numerical::Collocation_NLP::dimensions::ProblemDimensions;
use crate::numerical::Collocation_NLP::sparsity::SparsityPattern;
use crate::numerical::Collocation_NLP::time_grid::TimeMesh;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};

/// lower bound of an inequality path constraint `g(x, u) <= 0`
pub const PATH_CONSTRAINT_LOWER: f64 = -1e21;

/// Allocates `len` copies of `value`, reporting allocation failure instead of aborting.
pub fn allocate_zeroed<T: Clone>(buffer: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| CollocationError::OutOfMemory { buffer, len })?;
    v.resize(len, value);
    Ok(v)
}

fn vector(buffer: &'static str, len: usize) -> Result<DVector<f64>> {
    Ok(DVector::from_vec(allocate_zeroed(buffer, len, 0.0)?))
}

fn matrix(buffer: &'static str, nrows: usize, ncols: usize) -> Result<DMatrix<f64>> {
    let len = nrows
        .checked_mul(ncols)
        .ok_or(CollocationError::OutOfMemory {
            buffer,
            len: usize::MAX,
        })?;
    Ok(DMatrix::from_vec(
        nrows,
        ncols,
        allocate_zeroed(buffer, len, 0.0)?,
    ))
}

/// Dense per-point second-derivative tensor `H[k][i][j]`, `k < nJ`, `i, j < nv`.
#[derive(Debug, Clone, PartialEq)]
pub struct HessianTensor {
    pub n_blocks: usize,
    pub nv: usize,
    pub data: Vec<f64>,
}

impl HessianTensor {
    pub fn new(n_blocks: usize, nv: usize) -> Result<Self> {
        let len = n_blocks
            .checked_mul(nv)
            .and_then(|n| n.checked_mul(nv))
            .ok_or(CollocationError::OutOfMemory {
                buffer: "H",
                len: usize::MAX,
            })?;
        Ok(HessianTensor {
            n_blocks,
            nv,
            data: allocate_zeroed("H", len, 0.0)?,
        })
    }

    #[inline]
    pub fn index(&self, k: usize, i: usize, j: usize) -> usize {
        (k * self.nv + i) * self.nv + j
    }

    pub fn get(&self, k: usize, i: usize, j: usize) -> f64 {
        self.data[self.index(k, i, j)]
    }

    pub fn set(&mut self, k: usize, i: usize, j: usize, value: f64) {
        let idx = self.index(k, i, j);
        self.data[idx] = value;
    }

    /// the `nv x nv` block of row `k`
    pub fn block(&self, k: usize) -> &[f64] {
        let n = self.nv * self.nv;
        &self.data[k * n..(k + 1) * n]
    }
}

pub struct ProblemArena {
    pub dims: ProblemDimensions,
    pub scheme: CollocationScheme,
    pub mesh: TimeMesh,
    pub pattern: SparsityPattern,

    // constraint bounds and multipliers
    pub gmin: DVector<f64>,
    pub gmax: DVector<f64>,
    pub mult_g: DVector<f64>,
    pub mult_x_L: DVector<f64>,
    pub mult_x_U: DVector<f64>,

    // per-point bounds and scaling
    pub xmin: DVector<f64>,
    pub xmax: DVector<f64>,
    pub umin: DVector<f64>,
    pub umax: DVector<f64>,
    pub vmin: DVector<f64>,
    pub vmax: DVector<f64>,
    pub vnom: DVector<f64>,
    pub scalVar: DVector<f64>,
    pub scalf: DVector<f64>,
    /// unscaled initial state taken from the model
    pub x0: DVector<f64>,
    /// scaled initial guess of the inputs
    pub start_u: DVector<f64>,
    pub state_names: Vec<String>,
    pub input_names: Vec<String>,

    // whole decision vector
    pub Vmin: DVector<f64>,
    pub Vmax: DVector<f64>,
    pub v: DVector<f64>,
    pub w: DVector<f64>,

    // evaluation scratch used by the solver callbacks
    pub lhs: DVector<f64>,
    pub rhs: DVector<f64>,
    pub dotx: Vec<DVector<f64>>,
    pub grad_f: DVector<f64>,
    pub grad_f_: DVector<f64>,
    pub grad_f0: DVector<f64>,
    pub grad_f00: DVector<f64>,
    pub grad_fomc: DMatrix<f64>,
    pub sv: DVector<f64>,
    pub sh: DVector<f64>,
    pub vsave: DVector<f64>,
    pub eps: DVector<f64>,

    // derivative storage
    pub jac: DMatrix<f64>,
    pub jac0: DMatrix<f64>,
    pub num_jac: DMatrix<f64>,
    pub H: HessianTensor,
    pub oH: DMatrix<f64>,
    pub mH: DMatrix<f64>,

    pub diagnostics: Option<DiagnosticsExporter>,
}

impl ProblemArena {
    /// Sizes every buffer from `dims`. Fails with `OutOfMemory` if any buffer cannot be
    /// allocated and with `UnsupportedDegree` before allocating anything if `dims.deg` has no
    /// coefficient table.
    pub fn allocate(dims: &ProblemDimensions) -> Result<Self> {
        let d = dims;
        let scheme = CollocationScheme::new(d.deg)?;

        let mut gmin = vector("gmin", d.ng)?;
        let gmax = vector("gmax", d.ng)?;
        if d.nc > 0 {
            let mut i = d.nx;
            while i < d.ng {
                for j in 0..d.nc {
                    gmin[i + j] = PATH_CONSTRAINT_LOWER;
                }
                i += d.nJ;
            }
        }

        let mut dotx = Vec::with_capacity(4);
        for _ in 0..4 {
            dotx.push(vector("dotx", d.nx)?);
        }

        let arena = ProblemArena {
            dims: d.clone(),
            scheme,
            mesh: TimeMesh::zeroed(d.nsi, d.deg)?,
            pattern: SparsityPattern::new(d.nJ, d.nv)?,
            gmin,
            gmax,
            mult_g: vector("mult_g", d.ng)?,
            mult_x_L: vector("mult_x_L", d.NV)?,
            mult_x_U: vector("mult_x_U", d.NV)?,
            xmin: vector("xmin", d.nx)?,
            xmax: vector("xmax", d.nx)?,
            umin: vector("umin", d.nu)?,
            umax: vector("umax", d.nu)?,
            vmin: vector("vmin", d.nv)?,
            vmax: vector("vmax", d.nv)?,
            vnom: vector("vnom", d.nv)?,
            scalVar: vector("scalVar", d.nv)?,
            scalf: vector("scalf", d.nx)?,
            x0: vector("x0", d.nx)?,
            start_u: vector("start_u", d.nu)?,
            state_names: allocate_zeroed("state_names", d.nx, String::new())?,
            input_names: allocate_zeroed("input_names", d.nu, String::new())?,
            Vmin: vector("Vmin", d.NV)?,
            Vmax: vector("Vmax", d.NV)?,
            v: vector("v", d.NV)?,
            w: vector("w", (d.nsi + 1) * d.nv)?,
            lhs: vector("lhs", d.nJ)?,
            rhs: vector("rhs", d.nJ)?,
            dotx,
            grad_f: vector("gradF", d.nv)?,
            grad_f_: vector("gradF_", d.nv)?,
            grad_f0: vector("gradF0", d.nv)?,
            grad_f00: vector("gradF00", d.nv)?,
            grad_fomc: matrix("gradFomc", 2, d.nv)?,
            sv: vector("sv", d.nv)?,
            sh: vector("sh", d.nJ)?,
            vsave: vector("vsave", d.nv)?,
            eps: vector("eps", d.nv)?,
            jac: matrix("J", d.nJ, d.nv)?,
            jac0: matrix("J0", d.nJ, d.nv)?,
            num_jac: matrix("numJ", d.nJ, d.nv)?,
            H: HessianTensor::new(d.nJ, d.nv)?,
            oH: matrix("oH", d.nv, d.nv)?,
            mH: matrix("mH", d.nv, d.nv)?,
            diagnostics: None,
        };
        debug!(
            "arena allocated: NV = {}, ng = {}, nJ = {}, H has {} entries",
            d.NV,
            d.ng,
            d.nJ,
            arena.H.data.len()
        );
        Ok(arena)
    }

    /// Releases the arena. Diagnostics files are flushed and closed first so that their I/O
    /// errors reach the caller; every buffer is dropped even if flushing fails.
    pub fn free(mut self) -> Result<()> {
        let flushed = match self.diagnostics.take() {
            Some(exporter) => exporter.close(),
            None => Ok(()),
        };
        info!("arena for NV = {} released", self.dims.NV);
        drop(self);
        flushed
    }

    /// the per-point block `[x; u]` of the decision vector at time point `point`
    pub fn stage(&self, point: usize) -> &[f64] {
        let nv = self.dims.nv;
        &self.v.as_slice()[point * nv..(point + 1) * nv]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_sizes() {
        let dims = ProblemDimensions::new(2, 1, 1, 3, 4).unwrap();
        let a = ProblemArena::allocate(&dims).unwrap();
        assert_eq!(a.gmin.len(), dims.ng);
        assert_eq!(a.mult_x_L.len(), dims.NV);
        assert_eq!(a.Vmin.len(), dims.NV);
        assert_eq!(a.w.len(), 5 * 3);
        assert_eq!(a.mesh.dt.len(), 4);
        assert_eq!(a.mesh.time.len(), 13);
        assert_eq!(a.dotx.len(), 4);
        assert_eq!(a.dotx[3].len(), 2);
        assert_eq!(a.jac.shape(), (3, 3));
        assert_eq!(a.grad_fomc.shape(), (2, 3));
        assert_eq!(a.H.data.len(), 3 * 3 * 3);
        assert_eq!(a.oH.shape(), (3, 3));
        assert_eq!(a.pattern.nlocal_jac, 0);
        assert!(a.pattern.jac.iter().all(|&f| !f));
        assert!(a.grad_f.iter().all(|&g| g == 0.0));
        assert!(a.diagnostics.is_none());
    }

    #[test]
    fn test_path_constraint_lower_bounds() {
        let dims = ProblemDimensions::new(2, 1, 1, 3, 2).unwrap();
        let a = ProblemArena::allocate(&dims).unwrap();
        // blocks of nJ = 3 rows: two residual rows then one path constraint row
        for (i, g) in a.gmin.iter().enumerate() {
            if i % 3 == 2 {
                assert_eq!(*g, PATH_CONSTRAINT_LOWER);
            } else {
                assert_eq!(*g, 0.0);
            }
        }
        assert!(a.gmax.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_no_path_constraints() {
        let dims = ProblemDimensions::new(2, 1, 0, 3, 2).unwrap();
        let a = ProblemArena::allocate(&dims).unwrap();
        assert!(a.gmin.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_hessian_tensor_indexing() {
        let mut h = HessianTensor::new(2, 3).unwrap();
        h.set(1, 2, 0, 4.5);
        assert_eq!(h.get(1, 2, 0), 4.5);
        assert_eq!(h.block(1)[2 * 3], 4.5);
        assert!(h.block(0).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_allocation_failure_is_reported() {
        let r = allocate_zeroed("huge", usize::MAX / 4, 0.0_f64);
        assert!(matches!(
            r,
            Err(CollocationError::OutOfMemory { buffer: "huge", .. })
        ));
    }

    #[test]
    fn test_free_without_diagnostics() {
        let dims = ProblemDimensions::new(1, 1, 0, 3, 1).unwrap();
        let a = ProblemArena::allocate(&dims).unwrap();
        assert!(a.free().is_ok());
    }
}
