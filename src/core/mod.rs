pub mod pairing;
pub mod planner;
pub mod preview;

pub use crate::domain::model::{ClassOffering, Enrollment, Rosters};
pub use crate::domain::ports::{ConfigProvider, Query, RecordStore};
pub use crate::utils::error::Result;
