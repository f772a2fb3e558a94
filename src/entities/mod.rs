//! Record types stored in an rcatrack project

pub mod action;
pub mod incident;
pub mod rca;

pub use action::{ActionStatus, Evidence, RejectionRecord, RemedialAction};
pub use incident::IncidentReport;
pub use rca::{Environment, ExtractionSnapshot, RcaDocument};
