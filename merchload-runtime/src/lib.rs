//! Virtual user runtime for merchload
//!
//! A [`Scenario`] is registered with an [`Engine`], which ramps a pool of
//! virtual users up and down along a [`Schedule`] and returns the run's
//! summary once every VU has stopped.

pub mod engine;
pub mod error;
pub mod scenario;
pub mod shutdown;
pub mod stage;

pub use engine::Engine;
pub use error::{RuntimeError, RuntimeResult};
pub use scenario::{Scenario, VuContext};
pub use shutdown::{ShutdownCoordinator, ShutdownError, ShutdownSignal};
pub use stage::{Schedule, Stage};
