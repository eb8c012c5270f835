//! Structural sparsity of the per-point constraint Jacobian and of the Lagrangian Hessian.
//!
//! The Jacobian block has `nJ = nx + nc` rows (state derivatives first, then path
//! constraints) and `nv = nx + nu` columns. Its pattern is discovered either from the model's
//! column coloring, one color group at a time, or assumed dense. The Hessian pattern is the
//! co-occurrence closure `Hg[i][j] = ∃k: J[k][i] ∧ J[k][j]`.
use crate::numerical::Collocation_NLP::NLP_errors::{CollocationError, Result};
use crate::numerical::Collocation_NLP::arena::allocate_zeroed;
use crate::numerical::Collocation_NLP::model::JacobianColoring;
use itertools::iproduct;
use log::{debug, info, warn};
use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use std::str::FromStr;
use strum_macros::{Display, EnumIter};
use tabled::{builder::Builder, settings::Style};

/// How the Jacobian pattern is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter)]
pub enum JacobianStrategy {
    /// analytic Jacobian, pattern from the model's coloring
    #[default]
    Symbolic,
    /// directional finite differences, same structural discovery as `Symbolic`
    NumericDirectional,
    /// every entry treated as nonzero
    DenseFallback,
}

impl FromStr for JacobianStrategy {
    type Err = CollocationError;

    fn from_str(flag: &str) -> Result<Self> {
        match flag {
            "SYM" | "sym" => Ok(JacobianStrategy::Symbolic),
            "NUM" => Ok(JacobianStrategy::NumericDirectional),
            "NUMDENSE" => Ok(JacobianStrategy::DenseFallback),
            other => Err(CollocationError::UnrecognizedOption(other.to_string())),
        }
    }
}

impl JacobianStrategy {
    /// Lenient parsing of the configuration flag: unknown values fall back to `Symbolic`
    /// with a warning.
    pub fn from_flag(flag: Option<&str>) -> Self {
        let (strategy, warning) = Self::resolve_flag(flag);
        if let Some(warning) = warning {
            warn!("{}", warning);
        }
        strategy
    }

    /// strategy for `flag` plus the warning to emit when the flag was not recognised
    pub fn resolve_flag(flag: Option<&str>) -> (Self, Option<String>) {
        match flag {
            None => (JacobianStrategy::default(), None),
            Some(flag) => match flag.parse() {
                Ok(strategy) => (strategy, None),
                Err(e) => (
                    JacobianStrategy::default(),
                    Some(format!(
                        "not supported jacobian strategy '{}' ({}), using SYM",
                        flag, e
                    )),
                ),
            },
        }
    }

    pub fn as_flag(&self) -> &'static str {
        match self {
            JacobianStrategy::Symbolic => "SYM",
            JacobianStrategy::NumericDirectional => "NUM",
            JacobianStrategy::DenseFallback => "NUMDENSE",
        }
    }
}

/// Boolean structure of the per-point Jacobian (`nJ x nv`, row-major) and of the Hessian
/// (`nv x nv`, row-major).
#[derive(Debug, Clone, PartialEq)]
pub struct SparsityPattern {
    pub n_rows: usize,
    pub n_cols: usize,
    pub jac: Vec<bool>,
    pub hess: Vec<bool>,
    /// number of structural nonzeros in `jac`
    pub nlocal_jac: usize,
    /// nonzeros contributed by path-constraint rows
    pub nng: usize,
}

impl SparsityPattern {
    pub fn new(n_rows: usize, n_cols: usize) -> Result<Self> {
        let overflow = CollocationError::OutOfMemory {
            buffer: "knowedJ",
            len: usize::MAX,
        };
        let jac_len = n_rows.checked_mul(n_cols).ok_or(overflow)?;
        let hess_len = n_cols
            .checked_mul(n_cols)
            .ok_or(CollocationError::OutOfMemory {
                buffer: "Hg",
                len: usize::MAX,
            })?;
        Ok(SparsityPattern {
            n_rows,
            n_cols,
            jac: allocate_zeroed("knowedJ", jac_len, false)?,
            hess: allocate_zeroed("Hg", hess_len, false)?,
            nlocal_jac: 0,
            nng: 0,
        })
    }

    #[inline]
    pub fn j(&self, row: usize, col: usize) -> bool {
        self.jac[row * self.n_cols + col]
    }

    #[inline]
    pub fn hg(&self, i: usize, j: usize) -> bool {
        self.hess[i * self.n_cols + j]
    }

    /// marks `J[row][col]`, returns true if the entry was new
    fn mark(&mut self, row: usize, col: usize) -> bool {
        let idx = row * self.n_cols + col;
        if self.jac[idx] {
            false
        } else {
            self.jac[idx] = true;
            self.nlocal_jac += 1;
            true
        }
    }

    pub fn clear(&mut self) {
        self.jac.iter_mut().for_each(|f| *f = false);
        self.hess.iter_mut().for_each(|f| *f = false);
        self.nlocal_jac = 0;
        self.nng = 0;
    }

    /// `Hg[i][j] = 1` iff some row of `J` has both column `i` and column `j`
    pub fn derive_hessian(&mut self) {
        let nv = self.n_cols;
        let nJ = self.n_rows;
        if nv == 0 {
            return;
        }
        let jac = &self.jac;
        self.hess
            .par_chunks_mut(nv)
            .enumerate()
            .for_each(|(i, row)| {
                for (j, h) in row.iter_mut().enumerate() {
                    *h = (0..nJ).any(|k| jac[k * nv + i] && jac[k * nv + j]);
                }
            });
    }

    pub fn hessian_nonzeros_lower(&self) -> usize {
        iproduct!(0..self.n_cols, 0..self.n_cols)
            .filter(|&(i, j)| j <= i && self.hg(i, j))
            .count()
    }

    /// Jacobian pattern as a CSR matrix with 1.0 at every structural nonzero
    pub fn jacobian_csr(&self) -> CsMat<f64> {
        let mut tri = TriMat::new((self.n_rows, self.n_cols));
        for (r, c) in iproduct!(0..self.n_rows, 0..self.n_cols) {
            if self.j(r, c) {
                tri.add_triplet(r, c, 1.0);
            }
        }
        tri.to_csr()
    }

    /// lower triangle of the Hessian pattern as a CSR matrix
    pub fn hessian_lower_csr(&self) -> CsMat<f64> {
        let mut tri = TriMat::new((self.n_cols, self.n_cols));
        for (i, j) in iproduct!(0..self.n_cols, 0..self.n_cols) {
            if j <= i && self.hg(i, j) {
                tri.add_triplet(i, j, 1.0);
            }
        }
        tri.to_csr()
    }

    fn flag_table(n_rows: usize, n_cols: usize, flag: impl Fn(usize, usize) -> bool) -> String {
        let mut builder = Builder::default();
        let mut header = vec![String::new()];
        header.extend((0..n_cols).map(|c| c.to_string()));
        builder.push_record(header);
        for r in 0..n_rows {
            let mut record = vec![r.to_string()];
            record.extend((0..n_cols).map(|c| (if flag(r, c) { "1" } else { "0" }).to_string()));
            builder.push_record(record);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }

    /// 0/1 tables of the Jacobian and Hessian structure
    pub fn structure_tables(&self) -> (String, String) {
        (
            Self::flag_table(self.n_rows, self.n_cols, |r, c| self.j(r, c)),
            Self::flag_table(self.n_cols, self.n_cols, |i, j| self.hg(i, j)),
        )
    }
}

pub struct SparsityAnalyzer {
    pub strategy: JacobianStrategy,
}

impl SparsityAnalyzer {
    pub fn new(strategy: JacobianStrategy) -> Self {
        SparsityAnalyzer { strategy }
    }

    /// Fills `pattern` from scratch and returns `nng`. Repeated calls on an unchanged model
    /// give identical results.
    pub fn analyze(
        &self,
        pattern: &mut SparsityPattern,
        nx: usize,
        nc: usize,
        coloring: Option<&mut JacobianColoring>,
    ) -> Result<usize> {
        if pattern.n_rows != nx + nc || pattern.n_cols < nx {
            return Err(CollocationError::InvalidConfiguration(format!(
                "sparsity block {}x{} does not fit nx = {}, nc = {}",
                pattern.n_rows, pattern.n_cols, nx, nc
            )));
        }
        pattern.clear();
        let nng = match self.strategy {
            JacobianStrategy::DenseFallback => local_jac_struct_dense(pattern, nc),
            JacobianStrategy::Symbolic | JacobianStrategy::NumericDirectional => {
                let coloring = coloring.ok_or_else(|| {
                    CollocationError::ModelContractViolation(format!(
                        "jacobian strategy {} needs the model's coloring",
                        self.strategy.as_flag()
                    ))
                })?;
                local_jac_struct(pattern, nx, coloring)?
            }
        };
        pattern.nng = nng;
        pattern.derive_hessian();
        info!(
            "jacobian structure ({}): {} local nonzeros, {} from path constraints",
            self.strategy, pattern.nlocal_jac, nng
        );
        Ok(nng)
    }
}

fn local_jac_struct_dense(pattern: &mut SparsityPattern, nc: usize) -> usize {
    pattern.jac.iter_mut().for_each(|f| *f = true);
    pattern.nlocal_jac = pattern.jac.len();
    nc * pattern.n_cols
}

/// Discovers the pattern one color group at a time: seeds of the group are switched on, the
/// rows touched by every seeded column are marked, seeds are switched off again.
fn local_jac_struct(
    pattern: &mut SparsityPattern,
    nx: usize,
    coloring: &mut JacobianColoring,
) -> Result<usize> {
    coloring.validate(pattern.n_rows, pattern.n_cols)?;
    let mut nng = 0;
    for color in 1..=coloring.max_colors {
        let members: Vec<usize> = (0..coloring.size_cols)
            .filter(|&col| coloring.color_cols[col] == color)
            .collect();
        for &col in &members {
            coloring.seed_vars[col] = 1.0;
        }
        for &col in &members {
            for j in coloring.column_range(col) {
                let row = coloring.index[j];
                if pattern.mark(row, col) && row >= nx {
                    nng += 1;
                }
            }
        }
        for &col in &members {
            coloring.seed_vars[col] = 0.0;
        }
        debug!("color {}: columns {:?}", color, members);
    }
    // every state enters its own derivative
    for i in 0..nx {
        pattern.mark(i, i);
    }
    Ok(nng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    /// nx = 2, nu = 1, nc = 1; rows {x0', x1', g}, cols {x0, x1, u}
    fn coloring() -> JacobianColoring {
        // col x0 -> {1}, col x1 -> {0, 2}, col u -> {1, 2}
        JacobianColoring::from_columns(3, &[vec![1], vec![0, 2], vec![1, 2]], &[1, 2, 3])
    }

    #[test]
    fn test_flag_parsing() {
        assert_eq!("SYM".parse::<JacobianStrategy>().unwrap(), JacobianStrategy::Symbolic);
        assert_eq!("sym".parse::<JacobianStrategy>().unwrap(), JacobianStrategy::Symbolic);
        assert_eq!(
            "NUM".parse::<JacobianStrategy>().unwrap(),
            JacobianStrategy::NumericDirectional
        );
        assert_eq!(
            "NUMDENSE".parse::<JacobianStrategy>().unwrap(),
            JacobianStrategy::DenseFallback
        );
        assert!(matches!(
            "num".parse::<JacobianStrategy>(),
            Err(CollocationError::UnrecognizedOption(_))
        ));
    }

    #[test]
    fn test_lenient_flag_falls_back() {
        assert_eq!(JacobianStrategy::from_flag(Some("FANCY")), JacobianStrategy::Symbolic);
        assert_eq!(JacobianStrategy::from_flag(None), JacobianStrategy::Symbolic);
        for s in JacobianStrategy::iter() {
            assert_eq!(JacobianStrategy::from_flag(Some(s.as_flag())), s);
        }
    }

    #[test]
    fn test_unknown_flag_warns() {
        let (strategy, warning) = JacobianStrategy::resolve_flag(Some("FANCY"));
        assert_eq!(strategy, JacobianStrategy::Symbolic);
        let warning = warning.unwrap();
        assert!(warning.contains("not supported jacobian strategy 'FANCY'"));
        assert!(warning.contains("using SYM"));
        assert_eq!(JacobianStrategy::resolve_flag(None), (JacobianStrategy::Symbolic, None));
        for s in JacobianStrategy::iter() {
            assert_eq!(JacobianStrategy::resolve_flag(Some(s.as_flag())), (s, None));
        }
    }

    #[test]
    fn test_symbolic_discovery() {
        let mut p = SparsityPattern::new(3, 3).unwrap();
        let mut c = coloring();
        let nng = SparsityAnalyzer::new(JacobianStrategy::Symbolic)
            .analyze(&mut p, 2, 1, Some(&mut c))
            .unwrap();
        // discovered: (1,0) (0,1) (2,1) (1,2) (2,2); forced diagonal adds (0,0) (1,1)
        assert_eq!(p.nlocal_jac, 7);
        assert_eq!(nng, 2);
        assert_eq!(p.nng, 2);
        assert!(p.j(0, 0) && p.j(1, 1));
        assert!(!p.j(0, 2));
        assert_eq!(p.jac.iter().filter(|&&f| f).count(), p.nlocal_jac);
        assert!(c.seed_vars.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_hessian_is_closure_of_jacobian() {
        for strategy in JacobianStrategy::iter() {
            let mut p = SparsityPattern::new(3, 3).unwrap();
            let mut c = coloring();
            SparsityAnalyzer::new(strategy)
                .analyze(&mut p, 2, 1, Some(&mut c))
                .unwrap();
            for (i, j) in iproduct!(0..3, 0..3) {
                let expected = (0..3).any(|k| p.j(k, i) && p.j(k, j));
                assert_eq!(p.hg(i, j), expected, "Hg[{}][{}] with {}", i, j, strategy);
                assert_eq!(p.hg(i, j), p.hg(j, i));
            }
        }
    }

    #[test]
    fn test_dense_fallback() {
        let mut p = SparsityPattern::new(3, 3).unwrap();
        let nng = SparsityAnalyzer::new(JacobianStrategy::DenseFallback)
            .analyze(&mut p, 2, 1, None)
            .unwrap();
        assert!(p.jac.iter().all(|&f| f));
        assert!(p.hess.iter().all(|&f| f));
        assert_eq!(nng, 3);
        assert_eq!(p.nlocal_jac, 9);
    }

    #[test]
    fn test_idempotent_analysis() {
        for strategy in JacobianStrategy::iter() {
            let mut p = SparsityPattern::new(3, 3).unwrap();
            let mut c = coloring();
            let analyzer = SparsityAnalyzer::new(strategy);
            let n1 = analyzer.analyze(&mut p, 2, 1, Some(&mut c)).unwrap();
            let first = p.clone();
            let n2 = analyzer.analyze(&mut p, 2, 1, Some(&mut c)).unwrap();
            assert_eq!(n1, n2);
            assert_eq!(first, p);
        }
    }

    #[test]
    fn test_symbolic_requires_coloring() {
        let mut p = SparsityPattern::new(3, 3).unwrap();
        let r = SparsityAnalyzer::new(JacobianStrategy::NumericDirectional).analyze(&mut p, 2, 1, None);
        assert!(matches!(r, Err(CollocationError::ModelContractViolation(_))));
    }

    #[test]
    fn test_sparse_exports() {
        let mut p = SparsityPattern::new(3, 3).unwrap();
        let mut c = coloring();
        SparsityAnalyzer::new(JacobianStrategy::Symbolic)
            .analyze(&mut p, 2, 1, Some(&mut c))
            .unwrap();
        let jac = p.jacobian_csr();
        assert_eq!(jac.shape(), (3, 3));
        assert_eq!(jac.nnz(), p.nlocal_jac);
        let hess = p.hessian_lower_csr();
        assert_eq!(hess.nnz(), p.hessian_nonzeros_lower());
        let (jt, ht) = p.structure_tables();
        assert!(jt.contains('1'));
        assert!(ht.contains('1'));
    }
}
