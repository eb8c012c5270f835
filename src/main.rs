#![allow(non_snake_case)]
use RustedOCP::Utils::logger::init_logger;
use RustedOCP::numerical::Collocation_NLP::NLP_main::CollocationNLP;
use RustedOCP::numerical::Collocation_NLP::NLP_settings::OptimizerSettings;
use RustedOCP::numerical::Collocation_NLP::model_examples::{
    constrained_oscillator, double_integrator,
};
use RustedOCP::numerical::Collocation_NLP::sparsity::JacobianStrategy;
use log::LevelFilter;

fn main() {
    let example = 0;
    match example {
        0 => {
            // double integrator on [0, 2] with 4 intervals, bounds report in the log
            let _ = init_logger(LevelFilter::Info, None, true);
            let mut model = double_integrator();
            let mut settings = OptimizerSettings::new(0.0, 2.0, 4);
            settings.print_bounds = true;
            let nlp = CollocationNLP::build(&mut model, settings).unwrap();
            println!("time = {:?}", nlp.time().as_slice());
            println!("initial point = {:?}", nlp.initial_point().as_slice());
            let (vmin, vmax) = nlp.bounds();
            println!("Vmin = {:?}\nVmax = {:?}", vmin.as_slice(), vmax.as_slice());
            nlp.free().unwrap();
        }
        1 => {
            // path constraint, structure tables at debug level
            let _ = init_logger(LevelFilter::Debug, None, true);
            let mut model = constrained_oscillator();
            let mut settings = OptimizerSettings::new(0.0, 5.0, 3);
            settings.print_structure = true;
            let nlp = CollocationNLP::build(&mut model, settings).unwrap();
            let jac = nlp.jacobian_structure();
            println!("local jacobian: {} x {}, {} nonzeros", jac.rows(), jac.cols(), jac.nnz());
            println!("njac = {}, nhess = {}, nng = {}", nlp.njac, nlp.nhess, nlp.nng());
            nlp.free().unwrap();
        }
        2 => {
            // dense fallback, no coloring needed
            let _ = init_logger(LevelFilter::Info, None, true);
            let mut model = constrained_oscillator();
            model.coloring = None;
            let settings =
                OptimizerSettings::new(0.0, 5.0, 3).with_jacobian(JacobianStrategy::DenseFallback);
            let nlp = CollocationNLP::build(&mut model, settings).unwrap();
            println!("{}", nlp.summary());
            nlp.free().unwrap();
        }
        3 => {
            // settings from a task document, CSV path files written to the current directory
            let task = "optimizer\n  t0: 0.0 tf: 1.0 steps: 5\n  jacobian: SYM trace: true trace_dir: .\nlogging\n  level: info console: true\n";
            let settings = OptimizerSettings::from_task(task).unwrap();
            settings.init_logger().unwrap();
            let mut model = constrained_oscillator();
            let mut nlp = CollocationNLP::build(&mut model, settings).unwrap();
            let v = nlp.initial_point().as_slice().to_vec();
            for iteration in 0..3 {
                nlp.append_iteration(iteration, &v).unwrap();
            }
            nlp.free().unwrap();
        }
        4 => {
            // template of a task file
            println!("{}", OptimizerSettings::template());
        }
        _ => {
            println!("example {} does not exist", example);
        }
    }
}
