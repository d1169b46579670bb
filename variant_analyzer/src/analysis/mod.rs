pub mod batch;
pub mod calibration;
pub mod roc;
pub mod stripplot;

pub use batch::{BatchJob, BatchReport, VariantRecord};
pub use calibration::{run_calibration, CalibrationReport};
