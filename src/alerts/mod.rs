pub mod model;
pub mod monitor;
pub mod repository;

pub use model::{AlertCondition, UserAlert};
pub use monitor::AlertMonitor;
pub use repository::{AlertRepository, SqlxAlertRepository};
