//! Capabilities the NLP setup needs from the simulated model.
use crate::numerical::Collocation_NLP::NLP_errors::{CollocationError, Result};

/// Declared attributes of one state variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableAttributes {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub nominal: f64,
    pub use_nominal: bool,
    pub start: f64,
}

impl VariableAttributes {
    pub fn new(name: &str, min: f64, max: f64) -> Self {
        VariableAttributes {
            name: name.to_string(),
            min,
            max,
            nominal: 1.0,
            use_nominal: false,
            start: 0.0,
        }
    }

    pub fn with_nominal(mut self, nominal: f64) -> Self {
        self.nominal = nominal;
        self.use_nominal = true;
        self
    }

    pub fn with_start(mut self, start: f64) -> Self {
        self.start = start;
        self
    }
}

/// Output buffers filled by [`OptimizationModel::input_bounds`], all of length `nu`
#[derive(Debug, Clone, PartialEq)]
pub struct InputBounds {
    pub umin: Vec<f64>,
    pub umax: Vec<f64>,
    pub nominal: Vec<f64>,
    pub nominal_set: Vec<bool>,
    pub names: Vec<String>,
    pub start: Vec<f64>,
}

impl InputBounds {
    pub fn with_len(nu: usize) -> Self {
        InputBounds {
            umin: vec![0.0; nu],
            umax: vec![0.0; nu],
            nominal: vec![1.0; nu],
            nominal_set: vec![false; nu],
            names: vec![String::new(); nu],
            start: vec![0.0; nu],
        }
    }

    pub fn check_len(&self, nu: usize) -> Result<()> {
        let lens = [
            ("umin", self.umin.len()),
            ("umax", self.umax.len()),
            ("nominal", self.nominal.len()),
            ("nominal_set", self.nominal_set.len()),
            ("names", self.names.len()),
            ("start", self.start.len()),
        ];
        for (what, len) in lens {
            if len != nu {
                return Err(CollocationError::ModelContractViolation(format!(
                    "input bounds: '{}' has {} entries, expected {}",
                    what, len, nu
                )));
            }
        }
        Ok(())
    }
}

/// Column coloring of the model's per-point Jacobian together with its compressed pattern.
///
/// Column `col` belongs to color group `color_cols[col]` (groups are numbered `1..=max_colors`).
/// The structural rows of column `col` are `index[lead_index[col-1]..lead_index[col]]`
/// (`0..lead_index[0]` for the first column). `seed_vars` and `result_vars` are scratch owned by
/// the model and toggled while the pattern is discovered.
#[derive(Debug, Clone, PartialEq)]
pub struct JacobianColoring {
    pub size_cols: usize,
    pub size_rows: usize,
    pub max_colors: usize,
    pub color_cols: Vec<usize>,
    pub lead_index: Vec<usize>,
    pub index: Vec<usize>,
    pub seed_vars: Vec<f64>,
    pub result_vars: Vec<f64>,
}

impl JacobianColoring {
    /// builds the compressed form from a column-wise list of structural rows and a given coloring
    pub fn from_columns(size_rows: usize, columns: &[Vec<usize>], colors: &[usize]) -> Self {
        let mut lead_index = Vec::with_capacity(columns.len());
        let mut index = Vec::new();
        for rows in columns {
            index.extend_from_slice(rows);
            lead_index.push(index.len());
        }
        JacobianColoring {
            size_cols: columns.len(),
            size_rows,
            max_colors: colors.iter().copied().max().unwrap_or(0),
            color_cols: colors.to_vec(),
            lead_index,
            index,
            seed_vars: vec![0.0; columns.len()],
            result_vars: vec![0.0; size_rows],
        }
    }

    /// range into `index` holding the rows of column `col`
    pub fn column_range(&self, col: usize) -> std::ops::Range<usize> {
        let start = if col == 0 { 0 } else { self.lead_index[col - 1] };
        start..self.lead_index[col]
    }

    /// Checks the metadata against the per-point block of `n_rows x n_cols`.
    pub fn validate(&self, n_rows: usize, n_cols: usize) -> Result<()> {
        let fail = |msg: String| Err(CollocationError::ModelContractViolation(msg));
        if self.size_cols > n_cols {
            return fail(format!(
                "coloring has {} columns, the NLP block only {}",
                self.size_cols, n_cols
            ));
        }
        if self.color_cols.len() != self.size_cols
            || self.lead_index.len() != self.size_cols
            || self.seed_vars.len() != self.size_cols
        {
            return fail(format!(
                "coloring arrays do not match {} columns (colors {}, lead index {}, seeds {})",
                self.size_cols,
                self.color_cols.len(),
                self.lead_index.len(),
                self.seed_vars.len()
            ));
        }
        let mut prev = 0;
        for (col, &lead) in self.lead_index.iter().enumerate() {
            if lead < prev || lead > self.index.len() {
                return fail(format!("lead index of column {} is out of order", col));
            }
            prev = lead;
        }
        if let Some((col, &c)) = self
            .color_cols
            .iter()
            .enumerate()
            .find(|&(_, &c)| c == 0 || c > self.max_colors)
        {
            return fail(format!(
                "column {} has color {} outside 1..={}",
                col, c, self.max_colors
            ));
        }
        if let Some(&row) = self.index.iter().find(|&&row| row >= n_rows) {
            return fail(format!(
                "row index {} exceeds the {} rows of the NLP block",
                row, n_rows
            ));
        }
        Ok(())
    }
}

/// The simulated model as seen by the NLP setup. Equation evaluation itself stays with the
/// solver callbacks and is not part of this trait.
pub trait OptimizationModel {
    fn n_states(&self) -> usize;
    fn n_inputs(&self) -> usize;
    /// number of path constraints
    fn n_constraints(&self) -> usize;

    /// declared attributes of the states, `n_states` entries
    fn state_attributes(&self) -> &[VariableAttributes];

    /// initial state used as starting trajectory and as fallback magnitude for scaling
    fn initial_states(&self) -> Vec<f64> {
        self.state_attributes().iter().map(|a| a.start).collect()
    }

    /// fills bounds, nominal hints, names and start values of the inputs
    fn input_bounds(&self, out: &mut InputBounds) -> Result<()>;

    /// Coloring metadata of the per-point Jacobian, `None` if the model has none.
    fn jacobian_coloring(&mut self) -> Option<&mut JacobianColoring>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JacobianColoring {
        // 3 rows, 3 columns: col0 -> {0, 2}, col1 -> {1}, col2 -> {0}
        JacobianColoring::from_columns(3, &[vec![0, 2], vec![1], vec![0]], &[1, 1, 2])
    }

    #[test]
    fn test_from_columns() {
        let c = sample();
        assert_eq!(c.lead_index, vec![2, 3, 4]);
        assert_eq!(c.index, vec![0, 2, 1, 0]);
        assert_eq!(c.max_colors, 2);
        assert_eq!(c.column_range(0), 0..2);
        assert_eq!(c.column_range(2), 3..4);
        assert!(c.validate(3, 3).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_rows() {
        let c = sample();
        assert!(matches!(
            c.validate(2, 3),
            Err(CollocationError::ModelContractViolation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unordered_lead_index() {
        let mut c = sample();
        c.lead_index = vec![2, 1, 4];
        assert!(matches!(
            c.validate(3, 3),
            Err(CollocationError::ModelContractViolation(_))
        ));
        let mut c = sample();
        c.lead_index = vec![2, 3, 5];
        assert!(c.validate(3, 3).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_colors() {
        let mut c = sample();
        c.color_cols[1] = 0;
        assert!(c.validate(3, 3).is_err());
        let mut c = sample();
        c.color_cols[1] = 3;
        assert!(c.validate(3, 3).is_err());
    }

    #[test]
    fn test_validate_rejects_too_many_columns() {
        let c = sample();
        assert!(c.validate(3, 2).is_err());
    }

    #[test]
    fn test_input_bounds_length_check() {
        let mut b = InputBounds::with_len(2);
        assert!(b.check_len(2).is_ok());
        b.names.pop();
        assert!(matches!(
            b.check_len(2),
            Err(CollocationError::ModelContractViolation(_))
        ));
    }
}
