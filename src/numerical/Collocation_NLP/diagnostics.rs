//! Optional diagnostics: a report sink for bounds/scaling and CSV path files the solver loop
//! appends to.
use crate::numerical::Collocation_NLP::NLP_errors::{CollocationError, Result};
use csv::Writer;
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};
use strum_macros::Display;

/// bounds with a magnitude at or beyond this are reported as infinite
pub const INFINITE_BOUND: f64 = 1e20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum VariableKind {
    State,
    Input,
}

/// Bounds, scaling and start values of one per-point variable, in physical units
#[derive(Debug, Clone, PartialEq)]
pub struct VariableReport {
    pub kind: VariableKind,
    pub index: usize,
    pub name: String,
    pub start: f64,
    pub nominal: f64,
    pub min: f64,
    pub max: f64,
    pub init: f64,
}

impl VariableReport {
    fn bound_str(value: f64, inf: &str) -> String {
        if value.abs() >= INFINITE_BOUND {
            inf.to_string()
        } else {
            format!("{}", value)
        }
    }
}

impl std::fmt::Display for VariableReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{}]:{}(start = {}, nominal = {}, min = {}, max = {}, init = {})",
            self.kind,
            self.index,
            self.name,
            self.start,
            self.nominal,
            Self::bound_str(self.min, "-Inf"),
            Self::bound_str(self.max, "+Inf"),
            self.init
        )
    }
}

/// Receiver of the setup reports; the build pipeline works without one.
pub trait DiagnosticsSink {
    fn report_variable(&mut self, report: &VariableReport);

    fn report_constraints(&mut self, _nc: usize) {}
}

/// writes the reports to the `log` facade
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn report_variable(&mut self, report: &VariableReport) {
        info!("{}", report);
    }

    fn report_constraints(&mut self, nc: usize) {
        if nc > 0 {
            info!("number of constraints: {}", nc);
        }
    }
}

/// keeps the reports in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub reports: Vec<VariableReport>,
    pub n_constraints: Option<usize>,
}

impl DiagnosticsSink for CollectingSink {
    fn report_variable(&mut self, report: &VariableReport) {
        self.reports.push(report.clone());
    }

    fn report_constraints(&mut self, nc: usize) {
        self.n_constraints = Some(nc);
    }
}

/// One CSV file per per-point variable: header `iteration,<name>_0,...,<name>_<deg*nsi>`, then
/// one row per solver iteration holding the unscaled trajectory of that variable.
pub struct DiagnosticsExporter {
    writers: Vec<Writer<File>>,
    paths: Vec<PathBuf>,
    nv: usize,
    n_points: usize,
}

impl DiagnosticsExporter {
    /// column name stems: state names, then `u` (single input) or `u0, u1, ...`
    pub fn stems(state_names: &[String], nu: usize) -> Vec<(String, String)> {
        let mut stems: Vec<(String, String)> = state_names
            .iter()
            .map(|name| (name.clone(), format!("{}_path_states.csv", name)))
            .collect();
        for k in 0..nu {
            let name = if nu == 1 {
                "u".to_string()
            } else {
                format!("u{}", k)
            };
            let file = format!("{}_path_input.csv", name);
            stems.push((name, file));
        }
        stems
    }

    pub fn create(dir: &Path, state_names: &[String], nu: usize, n_points: usize) -> Result<Self> {
        let stems = Self::stems(state_names, nu);
        let mut writers = Vec::with_capacity(stems.len());
        let mut paths = Vec::with_capacity(stems.len());
        for (name, file) in stems {
            let path = dir.join(file);
            let mut writer = Writer::from_path(&path)?;
            let mut header = Vec::with_capacity(n_points + 1);
            header.push("iteration".to_string());
            header.extend((0..n_points).map(|k| format!("{}_{}", name, k)));
            writer.write_record(&header)?;
            writers.push(writer);
            paths.push(path);
        }
        info!("optimizer path files created in {}", dir.display());
        Ok(DiagnosticsExporter {
            nv: writers.len(),
            writers,
            paths,
            n_points,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Appends the current iterate; `v` is the scaled decision vector, `vnom` the nominal
    /// value of every per-point variable.
    pub fn append_iteration(&mut self, iteration: usize, v: &[f64], vnom: &[f64]) -> Result<()> {
        if v.len() != self.nv * self.n_points || vnom.len() != self.nv {
            return Err(CollocationError::InvalidConfiguration(format!(
                "iterate of length {} (nominals {}) does not match {} variables at {} points",
                v.len(),
                vnom.len(),
                self.nv,
                self.n_points
            )));
        }
        for (var, writer) in self.writers.iter_mut().enumerate() {
            let mut row = Vec::with_capacity(self.n_points + 1);
            row.push(iteration.to_string());
            row.extend((0..self.n_points).map(|k| (v[k * self.nv + var] * vnom[var]).to_string()));
            writer.write_record(&row)?;
        }
        Ok(())
    }

    /// flushes every file; the first error is returned after all files were attempted
    pub fn close(self) -> Result<()> {
        let mut first_err = None;
        for mut writer in self.writers {
            if let Err(e) = writer.flush() {
                if first_err.is_none() {
                    first_err = Some(CollocationError::Io(e));
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
