//! Settings of the collocation setup and their task-file form.
//!
//! A task file is a [`TaskDocument`]: section titles followed by `key: value` pairs.
//! ```text
//! optimizer
//!   t0: 0.0 tf: 2.0 steps: 20 degree: 3
//!   jacobian: SYM
//!   print_bounds: true print_structure: false
//!   trace: false trace_dir: .
//! logging
//!   level: info console: true
//! ```
//! Unknown keys are ignored, values of the wrong type are rejected.
use crate::Utils::logger::{init_logger, level_from_str};
use crate::Utils::task_parser::TaskDocument;
use crate::numerical::Collocation_NLP::NLP_errors::{CollocationError, Result};
use crate::numerical::Collocation_NLP::sparsity::JacobianStrategy;
use log::LevelFilter;
use std::fs;
use std::path::{Path, PathBuf};

const OPTIMIZER: &str = "optimizer";
const LOGGING: &str = "logging";

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerSettings {
    pub t0: f64,
    pub tf: f64,
    /// number of mesh intervals
    pub steps: usize,
    /// collocation degree
    pub degree: usize,
    pub jacobian: JacobianStrategy,
    /// report bounds, nominal values and start values of every variable
    pub print_bounds: bool,
    /// dump the Jacobian and Hessian structure at debug level
    pub print_structure: bool,
    /// write per-variable CSV path files
    pub trace: bool,
    pub trace_dir: PathBuf,
    pub log_level: LevelFilter,
    pub log_to_file: Option<String>,
    pub log_to_console: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        OptimizerSettings {
            t0: 0.0,
            tf: 1.0,
            steps: 20,
            degree: 3,
            jacobian: JacobianStrategy::default(),
            print_bounds: false,
            print_structure: false,
            trace: false,
            trace_dir: PathBuf::from("."),
            log_level: LevelFilter::Info,
            log_to_file: None,
            log_to_console: true,
        }
    }
}

fn config_error(msg: String) -> CollocationError {
    CollocationError::InvalidConfiguration(msg)
}

impl OptimizerSettings {
    pub fn new(t0: f64, tf: f64, steps: usize) -> Self {
        OptimizerSettings {
            t0,
            tf,
            steps,
            ..Default::default()
        }
    }

    pub fn with_jacobian(mut self, jacobian: JacobianStrategy) -> Self {
        self.jacobian = jacobian;
        self
    }

    pub fn with_trace(mut self, dir: &Path) -> Self {
        self.trace = true;
        self.trace_dir = dir.to_path_buf();
        self
    }

    /// Settings from a task document; absent keys keep their defaults.
    pub fn from_task(input: &str) -> Result<Self> {
        let doc = TaskDocument::parse(input).map_err(config_error)?;
        let mut s = OptimizerSettings::default();

        if let Some(t0) = doc.get_f64(OPTIMIZER, "t0").map_err(config_error)? {
            s.t0 = t0;
        }
        if let Some(tf) = doc.get_f64(OPTIMIZER, "tf").map_err(config_error)? {
            s.tf = tf;
        }
        if let Some(steps) = doc.get_usize(OPTIMIZER, "steps").map_err(config_error)? {
            s.steps = steps;
        }
        if let Some(degree) = doc.get_usize(OPTIMIZER, "degree").map_err(config_error)? {
            s.degree = degree;
        }
        let flag = doc.get_string(OPTIMIZER, "jacobian").map_err(config_error)?;
        s.jacobian = JacobianStrategy::from_flag(flag.as_deref());
        if let Some(b) = doc.get_bool(OPTIMIZER, "print_bounds").map_err(config_error)? {
            s.print_bounds = b;
        }
        if let Some(b) = doc
            .get_bool(OPTIMIZER, "print_structure")
            .map_err(config_error)?
        {
            s.print_structure = b;
        }
        if let Some(b) = doc.get_bool(OPTIMIZER, "trace").map_err(config_error)? {
            s.trace = b;
        }
        if let Some(dir) = doc.get_string(OPTIMIZER, "trace_dir").map_err(config_error)? {
            s.trace_dir = PathBuf::from(dir);
        }

        if let Some(level) = doc.get_string(LOGGING, "level").map_err(config_error)? {
            s.log_level = level_from_str(&level)
                .ok_or_else(|| config_error(format!("unknown log level '{}'", level)))?;
        }
        s.log_to_file = doc.get_string(LOGGING, "file").map_err(config_error)?;
        if let Some(b) = doc.get_bool(LOGGING, "console").map_err(config_error)? {
            s.log_to_console = b;
        }
        Ok(s)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let input = fs::read_to_string(path)?;
        Self::from_task(&input)
    }

    /// commented task file with every recognised key at its default value
    pub fn template() -> String {
        let d = OptimizerSettings::default();
        format!(
            "// collocation setup\n\
             optimizer\n\
             \x20 t0: {:?} tf: {:?}\n\
             // number of mesh intervals and collocation degree\n\
             \x20 steps: {} degree: {}\n\
             // SYM, NUM or NUMDENSE\n\
             \x20 jacobian: {}\n\
             \x20 print_bounds: {} print_structure: {}\n\
             // per-variable CSV path files\n\
             \x20 trace: {} trace_dir: {}\n\
             logging\n\
             // off, error, warn, info, debug or trace\n\
             \x20 level: {} console: {}\n",
            d.t0,
            d.tf,
            d.steps,
            d.degree,
            d.jacobian.as_flag(),
            d.print_bounds,
            d.print_structure,
            d.trace,
            d.trace_dir.display(),
            d.log_level.as_str().to_lowercase(),
            d.log_to_console
        )
    }

    pub fn init_logger(&self) -> Result<()> {
        init_logger(
            self.log_level,
            self.log_to_file.as_deref(),
            self.log_to_console,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = OptimizerSettings::default();
        assert_eq!(s.degree, 3);
        assert_eq!(s.jacobian, JacobianStrategy::Symbolic);
        assert!(!s.trace);
    }

    #[test]
    fn test_from_task() {
        let task = "optimizer\n  t0: 0 tf: 2.5 steps: 4\n  jacobian: NUMDENSE\n  print_bounds: true trace_dir: out\nlogging\n  level: debug console: false\n";
        let s = OptimizerSettings::from_task(task).unwrap();
        assert_eq!(s.t0, 0.0);
        assert_eq!(s.tf, 2.5);
        assert_eq!(s.steps, 4);
        assert_eq!(s.jacobian, JacobianStrategy::DenseFallback);
        assert!(s.print_bounds);
        assert_eq!(s.trace_dir, PathBuf::from("out"));
        assert_eq!(s.log_level, LevelFilter::Debug);
        assert!(!s.log_to_console);
        assert_eq!(s.log_to_file, None);
    }

    #[test]
    fn test_unknown_jacobian_flag_falls_back() {
        let s = OptimizerSettings::from_task("optimizer jacobian: SPARSE").unwrap();
        assert_eq!(s.jacobian, JacobianStrategy::Symbolic);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let s = OptimizerSettings::from_task("optimizer steps: 7 tolerance: 1e-6\nextra foo: bar").unwrap();
        assert_eq!(s.steps, 7);
    }

    #[test]
    fn test_wrong_types() {
        for task in [
            "optimizer steps: 2.5",
            "optimizer tf: late",
            "optimizer trace: yes",
            "logging level: loud",
        ] {
            assert!(matches!(
                OptimizerSettings::from_task(task),
                Err(CollocationError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_template_round_trip() {
        let s = OptimizerSettings::from_task(&OptimizerSettings::template()).unwrap();
        assert_eq!(s, OptimizerSettings::default());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.txt");
        std::fs::write(&path, "optimizer steps: 3 degree: 3").unwrap();
        let s = OptimizerSettings::from_file(&path).unwrap();
        assert_eq!(s.steps, 3);
        assert!(OptimizerSettings::from_file(&dir.path().join("missing.txt")).is_err());
    }
}
