pub mod backup;
pub mod context;
pub mod logging;
pub mod report;
