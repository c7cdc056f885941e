//! frontguard harness - front-end crash regression checking
//!
//! Provides a corpus pass that:
//! - Discovers fixtures and parses their directives
//! - Runs each fixture in a fresh, isolated front-end process with a time budget
//! - Classifies the result (crash, timeout, clean diagnostic, clean success)
//! - Aggregates verdicts into a regression report

pub mod classifier;
pub mod config;
pub mod corpus;
pub mod error;
pub mod invoker;
pub mod loader;
pub mod metrics;
pub mod obs;
pub mod reporter;
pub mod reporting;
pub mod telemetry;

// Re-export key types
pub use classifier::{classify, ClassifierPolicy, PolicyTable};
pub use config::{FrontendConfig, HarnessConfig, CONFIG_FILE_NAME};
pub use corpus::CorpusRun;
pub use error::{HarnessError, Result};
pub use invoker::{FrontendInvoker, ProcessInvoker};
pub use loader::{discover, fixture_id, load_checked, load_fixture};
pub use metrics::METRICS;
pub use reporter::{CorpusReport, Regression, ReportMeta, ReportSummary, Reporter};
pub use reporting::{render_summary_text, write_report_json};
pub use telemetry::init_tracing;

pub use frontguard_domain::{ExecutionResult, Fixture, Outcome, RegressionSeverity, Verdict};
