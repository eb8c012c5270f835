//! Direct collocation setup of optimal-control problems: turns states, inputs and path
//! constraints on `[t0, tf]` into the decision vector, scaled bounds, initial point, time mesh
//! and derivative sparsity an interior-point NLP solver works with.

/// errors of the setup pipeline
pub mod NLP_errors;
/// driver: builds the whole NLP for one optimization run
pub mod NLP_main;
/// settings and their task-file form
pub mod NLP_settings;
/// buffers of one run, allocated from the problem dimensions
pub mod arena;
/// nominal values, scale factors and scaled bounds
pub mod bounds_scaling;
/// Radau collocation constants
pub mod collocation_coeffs;
/// bounds report and CSV path files
pub mod diagnostics;
/// sizes of the decision vector and of the constraint blocks
pub mod dimensions;
/// what the setup needs from the simulated model
pub mod model;
/// small models used by the demo, the benches and the tests
pub mod model_examples;
/// Jacobian and Hessian patterns
pub mod sparsity;
/// interval lengths and collocation instants
pub mod time_grid;
