pub mod batch;
pub mod supervisor;

pub use batch::BatchAccumulator;
pub use supervisor::IngestionSupervisor;
