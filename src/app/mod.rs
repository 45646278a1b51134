// Application layer - Use case interactors

pub mod batch_runner;
pub mod container;
pub mod plan_interactor;

// Re-export interactors
pub use batch_runner::{BatchHandle, BatchRunner};
pub use container::{AppContainer, DefaultAppContainer};
pub use plan_interactor::{PlanInteractor, PlanPreview};
