/// Direct collocation setup of optimal-control problems for interior-point NLP solvers.
/// Example
/// ```ignore
/// use RustedOCP::numerical::Collocation_NLP::NLP_main::CollocationNLP;
/// use RustedOCP::numerical::Collocation_NLP::NLP_settings::OptimizerSettings;
/// use RustedOCP::numerical::Collocation_NLP::model_examples::double_integrator;
///
/// let mut model = double_integrator();
/// let nlp = CollocationNLP::build(&mut model, OptimizerSettings::new(0.0, 2.0, 10)).unwrap();
/// println!("{}", nlp.summary());
/// let (vmin, vmax) = nlp.bounds();
/// let jac = nlp.jacobian_structure();
/// nlp.free().unwrap();
/// ```
pub mod Collocation_NLP;
