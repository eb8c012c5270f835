//! Setup of the collocation NLP for one optimization run.
//!
//! `CollocationNLP::build` runs the whole pipeline once: dimensions from the model, arena
//! allocation, interval lengths, sparsity discovery, nominal values and scaled bounds,
//! collocation instants and, if requested, the CSV path files. The finished arena holds
//! everything an interior-point solver needs to allocate its structures: bounds, initial
//! point, Jacobian/Hessian patterns with their nonzero counts and the time mesh.
//!
//! ```ignore
//! let mut model = double_integrator();
//! let settings = OptimizerSettings::new(0.0, 2.0, 10);
//! let nlp = CollocationNLP::build(&mut model, settings)?;
//! let jac = nlp.jacobian_structure();
//! nlp.free()?;
//! ```
use crate::numerical::Collocation_NLP::NLP_errors::{CollocationError, Result};
use crate::numerical::Collocation_NLP::NLP_settings::OptimizerSettings;
use crate::numerical::Collocation_NLP::arena::ProblemArena;
use crate::numerical::Collocation_NLP::bounds_scaling::BoundsScaler;
use crate::numerical::Collocation_NLP::diagnostics::{
    DiagnosticsExporter, DiagnosticsSink, LogSink,
};
use crate::numerical::Collocation_NLP::dimensions::ProblemDimensions;
use crate::numerical::Collocation_NLP::model::OptimizationModel;
use crate::numerical::Collocation_NLP::sparsity::SparsityAnalyzer;
use log::{debug, info};
use nalgebra::DVector;
use sprs::CsMat;
use std::time::{Duration, Instant};
use tabled::{Table, Tabled, settings::Style};

#[derive(Tabled)]
struct SummaryRow {
    quantity: &'static str,
    value: String,
}

pub struct CollocationNLP {
    pub settings: OptimizerSettings,
    pub arena: ProblemArena,
    /// nonzeros of the full constraint Jacobian
    pub njac: usize,
    /// nonzeros of the lower triangle of the full Lagrangian Hessian
    pub nhess: usize,
    pub setup_time: Duration,
}

/// `njac = deg*(nlocalJac - nx + nsi*nlocalJac + deg*nsi*nx) - deg*nng`,
/// `nhess = nv*(nv+1)/2 * (1 + deg*nsi)`
pub fn nonzero_counts(dims: &ProblemDimensions, nlocal_jac: usize, nng: usize) -> Result<(usize, usize)> {
    let overflow = || CollocationError::OutOfMemory {
        buffer: "nonzero counts",
        len: usize::MAX,
    };
    let deg = dims.deg;
    let nsi = dims.nsi;
    let per_interval = nlocal_jac
        .checked_add(nsi.checked_mul(nlocal_jac).ok_or_else(overflow)?)
        .and_then(|n| n.checked_add(deg * nsi * dims.nx))
        .ok_or_else(overflow)?;
    let njac = per_interval
        .checked_sub(dims.nx)
        .and_then(|n| n.checked_mul(deg))
        .and_then(|n| n.checked_sub(deg * nng))
        .ok_or_else(|| {
            CollocationError::ModelContractViolation(format!(
                "{} local nonzeros ({} from path constraints) cannot cover {} states",
                nlocal_jac, nng, dims.nx
            ))
        })?;
    let nhess = (dims.nv * (dims.nv + 1) / 2)
        .checked_mul(1 + deg * nsi)
        .ok_or_else(overflow)?;
    Ok((njac, nhess))
}

impl CollocationNLP {
    /// Builds the NLP of `model` on `[settings.t0, settings.tf]`. The bounds report goes to the
    /// log if `settings.print_bounds` is set.
    pub fn build<M: OptimizationModel + ?Sized>(
        model: &mut M,
        settings: OptimizerSettings,
    ) -> Result<Self> {
        let mut log_sink = LogSink;
        let sink: Option<&mut dyn DiagnosticsSink> = if settings.print_bounds {
            Some(&mut log_sink)
        } else {
            None
        };
        Self::build_with_sink(model, settings, sink)
    }

    /// same as [`CollocationNLP::build`] with the bounds report sent to `sink`
    pub fn build_with_sink<M: OptimizationModel + ?Sized>(
        model: &mut M,
        settings: OptimizerSettings,
        sink: Option<&mut dyn DiagnosticsSink>,
    ) -> Result<Self> {
        let start = Instant::now();
        let dims = ProblemDimensions::new(
            model.n_states(),
            model.n_inputs(),
            model.n_constraints(),
            settings.degree,
            settings.steps,
        )?;
        let mut arena = ProblemArena::allocate(&dims)?;
        arena.mesh.move_grid(settings.t0, settings.tf)?;

        let analyzer = SparsityAnalyzer::new(settings.jacobian);
        let nng = analyzer.analyze(&mut arena.pattern, dims.nx, dims.nc, model.jacobian_coloring())?;
        let (njac, nhess) = nonzero_counts(&dims, arena.pattern.nlocal_jac, nng)?;

        BoundsScaler::optimizer_bounds_settings(&mut arena, &*model, sink)?;
        arena.mesh.set_time_points(&arena.scheme)?;

        if settings.trace {
            arena.diagnostics = Some(DiagnosticsExporter::create(
                &settings.trace_dir,
                &arena.state_names,
                dims.nu,
                dims.n_points,
            )?);
        }

        let nlp = CollocationNLP {
            settings,
            arena,
            njac,
            nhess,
            setup_time: start.elapsed(),
        };
        if nlp.settings.print_structure {
            nlp.print_structure();
        }
        info!("\n{}", nlp.summary());
        Ok(nlp)
    }

    /// Runs the sparsity discovery again on the current model; returns `nng`.
    pub fn reanalyze_sparsity<M: OptimizationModel + ?Sized>(&mut self, model: &mut M) -> Result<usize> {
        let dims = &self.arena.dims;
        let analyzer = SparsityAnalyzer::new(self.settings.jacobian);
        let nng = analyzer.analyze(
            &mut self.arena.pattern,
            dims.nx,
            dims.nc,
            model.jacobian_coloring(),
        )?;
        let (njac, nhess) = nonzero_counts(dims, self.arena.pattern.nlocal_jac, nng)?;
        self.njac = njac;
        self.nhess = nhess;
        Ok(nng)
    }

    pub fn dims(&self) -> &ProblemDimensions {
        &self.arena.dims
    }

    pub fn time(&self) -> &DVector<f64> {
        &self.arena.mesh.time
    }

    /// scaled lower and upper bounds of the whole decision vector
    pub fn bounds(&self) -> (&DVector<f64>, &DVector<f64>) {
        (&self.arena.Vmin, &self.arena.Vmax)
    }

    /// scaled initial decision vector
    pub fn initial_point(&self) -> &DVector<f64> {
        &self.arena.v
    }

    pub fn nng(&self) -> usize {
        self.arena.pattern.nng
    }

    pub fn nlocal_jac(&self) -> usize {
        self.arena.pattern.nlocal_jac
    }

    pub fn jacobian_structure(&self) -> CsMat<f64> {
        self.arena.pattern.jacobian_csr()
    }

    pub fn hessian_structure(&self) -> CsMat<f64> {
        self.arena.pattern.hessian_lower_csr()
    }

    /// Writes iterate `v` (scaled) to the path files; does nothing if tracing is off.
    pub fn append_iteration(&mut self, iteration: usize, v: &[f64]) -> Result<()> {
        let vnom = self.arena.vnom.as_slice();
        match self.arena.diagnostics.as_mut() {
            Some(exporter) => exporter.append_iteration(iteration, v, vnom),
            None => Ok(()),
        }
    }

    pub fn print_structure(&self) {
        let (jac, hess) = self.arena.pattern.structure_tables();
        debug!("Jacobian structure:\n{}", jac);
        debug!("Hessian structure:\n{}", hess);
    }

    pub fn summary(&self) -> String {
        let d = &self.arena.dims;
        let rows = vec![
            SummaryRow { quantity: "states", value: d.nx.to_string() },
            SummaryRow { quantity: "inputs", value: d.nu.to_string() },
            SummaryRow { quantity: "path constraints", value: d.nc.to_string() },
            SummaryRow {
                quantity: "intervals x degree",
                value: format!("{} x {}", d.nsi, d.deg),
            },
            SummaryRow { quantity: "variables", value: d.NV.to_string() },
            SummaryRow { quantity: "constraints", value: d.ng.to_string() },
            SummaryRow {
                quantity: "jacobian strategy",
                value: self.settings.jacobian.to_string(),
            },
            SummaryRow { quantity: "jacobian nonzeros", value: self.njac.to_string() },
            SummaryRow { quantity: "hessian nonzeros", value: self.nhess.to_string() },
            SummaryRow {
                quantity: "setup time",
                value: format!("{:?}", self.setup_time),
            },
        ];
        let mut table = Table::new(rows);
        table.with(Style::modern_rounded());
        table.to_string()
    }

    /// Releases the run: path files are flushed and closed, I/O errors are returned.
    pub fn free(self) -> Result<()> {
        self.arena.free()
    }
}
