pub mod analysis;
pub mod reputation;
pub mod scan;
pub mod vuln;

pub use analysis::{AnalysisRequest, AnalysisResult, SeverityLabel};
pub use reputation::{ReputationLabel, ReputationVerdict};
pub use scan::{
    HostRecord, HostState, OsMatch, PortRecord, PortState, RunStatus, ScanProfile, ScanRequest,
    ScanResult, ScanRun, ScanSummary, Transport,
};
pub use vuln::{Severity, VulnScanSection, VulnerabilityFinding};
