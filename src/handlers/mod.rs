pub mod analysis_handlers;
pub mod health_handlers;
pub mod scan_handlers;

pub use analysis_handlers::analyze;
pub use health_handlers::{health_check, root, tools_status};
pub use scan_handlers::{active_scans, execute_scan, scan_history};
