//! Nominal values, scale factors and scaled bounds of the decision vector.
//!
//! Every per-point variable gets a nominal magnitude `vnom[i]` and a scale `scalVar[i] =
//! 1/vnom[i]`; bounds and starting values are multiplied by the scale so that the solver
//! works with quantities of order one. The declared bounds do not depend on time and are
//! replicated over all collocation points.
use crate::numerical::Collocation_NLP::NLP_errors::{CollocationError, Result};
use crate::numerical::Collocation_NLP::arena::ProblemArena;
use crate::numerical::Collocation_NLP::diagnostics::{
    DiagnosticsSink, VariableKind, VariableReport,
};
use crate::numerical::Collocation_NLP::model::{InputBounds, OptimizationModel};
use log::debug;

/// smallest admissible nominal value
pub const NOMINAL_FLOOR: f64 = 1e-16;
/// bounds beyond this magnitude are treated as absent
pub const UNBOUNDED: f64 = 1e12;

/// Heuristic nominal magnitude of a variable.
///
/// An explicit nominal wins. Otherwise the larger bound magnitude is used unless it is
/// effectively unbounded, in which case the smaller one (but not less than `fallback`) is
/// used, or `1 + fallback` if both bounds are unbounded.
pub fn check_nominal(min: f64, max: f64, nominal: f64, nominal_is_set: bool, fallback: f64) -> f64 {
    if nominal_is_set {
        return nominal.abs().max(NOMINAL_FLOOR);
    }
    let amax = max.abs();
    let amin = min.abs();
    let mut vnom = amax.max(amin);
    if vnom > UNBOUNDED {
        let smaller = amax.min(amin);
        vnom = if smaller < UNBOUNDED {
            smaller.max(fallback)
        } else {
            1.0 + fallback
        };
    }
    vnom.max(NOMINAL_FLOOR)
}

pub struct BoundsScaler;

impl BoundsScaler {
    /// Computes nominal values and scaled bounds of states and inputs, merges them into
    /// `vmin/vmax`, replicates them into `Vmin/Vmax` and fills the initial decision vector.
    pub fn optimizer_bounds_settings<M: OptimizationModel + ?Sized>(
        arena: &mut ProblemArena,
        model: &M,
        sink: Option<&mut dyn DiagnosticsSink>,
    ) -> Result<()> {
        let nx = arena.dims.nx;
        let nu = arena.dims.nu;

        let attributes = model.state_attributes();
        if attributes.len() != nx {
            return Err(CollocationError::ModelContractViolation(format!(
                "model declares {} state attributes, expected {}",
                attributes.len(),
                nx
            )));
        }
        let x0 = model.initial_states();
        if x0.len() != nx {
            return Err(CollocationError::ModelContractViolation(format!(
                "model returned {} initial states, expected {}",
                x0.len(),
                nx
            )));
        }

        for (i, attr) in attributes.iter().enumerate() {
            if attr.min > attr.max {
                return Err(CollocationError::ModelContractViolation(format!(
                    "state '{}' has min {} > max {}",
                    attr.name, attr.min, attr.max
                )));
            }
            arena.vnom[i] = check_nominal(attr.min, attr.max, attr.nominal, attr.use_nominal, x0[i].abs());
            arena.scalVar[i] = 1.0 / arena.vnom[i];
            arena.scalf[i] = arena.scalVar[i];
            arena.xmin[i] = attr.min * arena.scalVar[i];
            arena.xmax[i] = attr.max * arena.scalVar[i];
            arena.x0[i] = x0[i];
            arena.state_names[i] = attr.name.clone();
        }

        let mut inputs = InputBounds::with_len(nu);
        model.input_bounds(&mut inputs)?;
        inputs.check_len(nu)?;

        for k in 0..nu {
            let j = nx + k;
            if inputs.umin[k] > inputs.umax[k] {
                return Err(CollocationError::ModelContractViolation(format!(
                    "input '{}' has min {} > max {}",
                    inputs.names[k], inputs.umin[k], inputs.umax[k]
                )));
            }
            arena.vnom[j] = check_nominal(
                inputs.umin[k],
                inputs.umax[k],
                inputs.nominal[k],
                inputs.nominal_set[k],
                inputs.start[k].abs(),
            );
            arena.scalVar[j] = 1.0 / arena.vnom[j];
            arena.umin[k] = inputs.umin[k] * arena.scalVar[j];
            arena.umax[k] = inputs.umax[k] * arena.scalVar[j];
            arena.start_u[k] = (inputs.start[k] * arena.scalVar[j])
                .max(arena.umin[k])
                .min(arena.umax[k]);
            arena.input_names[k] = inputs.names[k].clone();
        }

        if let Some(sink) = sink {
            Self::report(arena, model, &inputs, sink);
        }

        Self::replicate_bounds(arena);
        Self::initial_guess(arena);
        debug!("scaling factors: {:?}", arena.scalVar.as_slice());
        Ok(())
    }

    fn report<M: OptimizationModel + ?Sized>(
        arena: &ProblemArena,
        model: &M,
        inputs: &InputBounds,
        sink: &mut dyn DiagnosticsSink,
    ) {
        for (i, attr) in model.state_attributes().iter().enumerate() {
            sink.report_variable(&VariableReport {
                kind: VariableKind::State,
                index: i,
                name: attr.name.clone(),
                start: attr.start,
                nominal: arena.vnom[i],
                min: attr.min,
                max: attr.max,
                init: arena.x0[i],
            });
        }
        let nx = arena.dims.nx;
        for k in 0..arena.dims.nu {
            sink.report_variable(&VariableReport {
                kind: VariableKind::Input,
                index: nx + k,
                name: inputs.names[k].clone(),
                start: inputs.start[k],
                nominal: arena.vnom[nx + k],
                min: inputs.umin[k],
                max: inputs.umax[k],
                init: arena.start_u[k] * arena.vnom[nx + k],
            });
        }
        sink.report_constraints(arena.dims.nc);
    }

    /// `vmin = [xmin; umin]`, copied to every collocation point of `Vmin` (same for max)
    pub fn replicate_bounds(arena: &mut ProblemArena) {
        let nx = arena.dims.nx;
        let nv = arena.dims.nv;
        arena.vmin.rows_mut(0, nx).copy_from(&arena.xmin);
        arena.vmin.rows_mut(nx, nv - nx).copy_from(&arena.umin);
        arena.vmax.rows_mut(0, nx).copy_from(&arena.xmax);
        arena.vmax.rows_mut(nx, nv - nx).copy_from(&arena.umax);

        for point in 0..arena.dims.n_points {
            let offset = arena.dims.var_index(point, 0);
            arena.Vmin.rows_mut(offset, nv).copy_from(&arena.vmin);
            arena.Vmax.rows_mut(offset, nv).copy_from(&arena.vmax);
        }
    }

    /// constant initial trajectory: scaled `x0` (clamped into the state bounds) and the
    /// scaled input guess at every point
    pub fn initial_guess(arena: &mut ProblemArena) {
        let nx = arena.dims.nx;
        for point in 0..arena.dims.n_points {
            for i in 0..nx {
                let idx = arena.dims.var_index(point, i);
                arena.v[idx] = (arena.x0[i] * arena.scalVar[i])
                    .max(arena.xmin[i])
                    .min(arena.xmax[i]);
            }
            for k in 0..arena.dims.nu {
                let idx = arena.dims.var_index(point, nx + k);
                arena.v[idx] = arena.start_u[k];
            }
        }
    }
}
