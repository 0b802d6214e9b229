pub mod gateway;
pub mod sequence;

pub use gateway::{RequisitionStore, SaveOutcome};
pub use sequence::next_requisition_number;
