//! Models given by tables: declared attributes, input bounds and a hand-made coloring.
//! Used by the demo binary, the benches and the tests.
use crate::numerical::Collocation_NLP::NLP_errors::Result;
use crate::numerical::Collocation_NLP::model::{
    InputBounds, JacobianColoring, OptimizationModel, VariableAttributes,
};

/// Declared data of one input
#[derive(Debug, Clone, PartialEq)]
pub struct InputAttributes {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub nominal: Option<f64>,
    pub start: f64,
}

impl InputAttributes {
    pub fn new(name: &str, min: f64, max: f64, start: f64) -> Self {
        InputAttributes {
            name: name.to_string(),
            min,
            max,
            nominal: None,
            start,
        }
    }

    pub fn with_nominal(mut self, nominal: f64) -> Self {
        self.nominal = Some(nominal);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedModel {
    pub states: Vec<VariableAttributes>,
    pub inputs: Vec<InputAttributes>,
    pub n_constraints: usize,
    /// initial state; the declared start values are used if `None`
    pub x0: Option<Vec<f64>>,
    pub coloring: Option<JacobianColoring>,
}

impl TabulatedModel {
    pub fn new(
        states: Vec<VariableAttributes>,
        inputs: Vec<InputAttributes>,
        n_constraints: usize,
    ) -> Self {
        TabulatedModel {
            states,
            inputs,
            n_constraints,
            x0: None,
            coloring: None,
        }
    }

    /// per-point Jacobian given column by column (rows `0..nx` are state derivatives,
    /// then path constraints) with a coloring of the columns
    pub fn with_coloring(mut self, columns: &[Vec<usize>], colors: &[usize]) -> Self {
        let rows = self.states.len() + self.n_constraints;
        self.coloring = Some(JacobianColoring::from_columns(rows, columns, colors));
        self
    }

    pub fn with_initial_states(mut self, x0: Vec<f64>) -> Self {
        self.x0 = Some(x0);
        self
    }
}

impl OptimizationModel for TabulatedModel {
    fn n_states(&self) -> usize {
        self.states.len()
    }

    fn n_inputs(&self) -> usize {
        self.inputs.len()
    }

    fn n_constraints(&self) -> usize {
        self.n_constraints
    }

    fn state_attributes(&self) -> &[VariableAttributes] {
        &self.states
    }

    fn initial_states(&self) -> Vec<f64> {
        match &self.x0 {
            Some(x0) => x0.clone(),
            None => self.states.iter().map(|a| a.start).collect(),
        }
    }

    fn input_bounds(&self, out: &mut InputBounds) -> Result<()> {
        for (k, input) in self.inputs.iter().enumerate() {
            out.umin[k] = input.min;
            out.umax[k] = input.max;
            out.names[k] = input.name.clone();
            out.start[k] = input.start;
            if let Some(nominal) = input.nominal {
                out.nominal[k] = nominal;
                out.nominal_set[k] = true;
            }
        }
        Ok(())
    }

    fn jacobian_coloring(&mut self) -> Option<&mut JacobianColoring> {
        self.coloring.as_mut()
    }
}

/// `x' = v, v' = u` with `|u| <= 1` and a bounded position.
/// Columns x, v, u touch rows {}, {x'}, {v'}; one color suffices.
pub fn double_integrator() -> TabulatedModel {
    TabulatedModel::new(
        vec![
            VariableAttributes::new("x", -10.0, 10.0),
            VariableAttributes::new("v", -1e30, 1e30).with_start(1.0),
        ],
        vec![InputAttributes::new("u", -1.0, 1.0, 0.0)],
        0,
    )
    .with_coloring(&[vec![], vec![0], vec![1]], &[1, 1, 1])
}

/// `x1' = x2, x2' = -x1 + u` with the path constraint `g = x1 + u - 1 <= 0`.
/// Columns x1, x2, u touch rows {x2', g}, {x1'}, {x2', g}; x1 and u need different colors.
pub fn constrained_oscillator() -> TabulatedModel {
    TabulatedModel::new(
        vec![
            VariableAttributes::new("x1", -2.0, 2.0).with_start(1.0),
            VariableAttributes::new("x2", -1e30, 1e30).with_nominal(0.5),
        ],
        vec![InputAttributes::new("u", -5.0, 5.0, 0.5)],
        1,
    )
    .with_coloring(&[vec![1, 2], vec![0], vec![1, 2]], &[1, 1, 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorings_are_valid() {
        let mut m = double_integrator();
        assert!(m.jacobian_coloring().unwrap().validate(2, 3).is_ok());
        let mut m = constrained_oscillator();
        assert!(m.jacobian_coloring().unwrap().validate(3, 3).is_ok());
    }

    #[test]
    fn test_input_bounds_filled() {
        let m = constrained_oscillator().with_initial_states(vec![0.5, 0.0]);
        let mut b = InputBounds::with_len(1);
        m.input_bounds(&mut b).unwrap();
        assert_eq!(b.umin, vec![-5.0]);
        assert_eq!(b.names, vec!["u".to_string()]);
        assert!(!b.nominal_set[0]);
        assert_eq!(m.initial_states(), vec![0.5, 0.0]);
    }
}
