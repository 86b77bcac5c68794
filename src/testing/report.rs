//! Run reports and progress reporters

use colored::Colorize;
use serde::Serialize;

/// Outcome of a single case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CaseOutcome {
    Passed,
    /// The expectation did not hold
    Failed { message: String },
    /// The case could not be evaluated
    Errored { message: String },
}

impl CaseOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    pub label: String,
    #[serde(flatten)]
    pub outcome: CaseOutcome,
}

/// A hook (setup, call, teardown or save) that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookFailure {
    pub hook: Hook,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    Setup,
    Call,
    Teardown,
    SaveToState,
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Call => "call endpoint",
            Self::Teardown => "teardown",
            Self::SaveToState => "save to state",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub description: String,
    pub cases: Vec<CaseReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_failure: Option<HookFailure>,
}

impl ScenarioReport {
    pub fn is_success(&self) -> bool {
        self.hook_failure.is_none() && self.cases.iter().all(|c| c.outcome.is_passed())
    }

    pub fn case(&self, label: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.label == label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointReport {
    pub label: String,
    pub scenarios: Vec<ScenarioReport>,
}

impl EndpointReport {
    pub fn is_success(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::is_success)
    }

    pub fn scenario(&self, description: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.description == description)
    }
}

/// Totals across a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub hook_failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    pub name: String,
    pub endpoints: Vec<EndpointReport>,
}

impl SuiteReport {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for scenario in self.endpoints.iter().flat_map(|e| &e.scenarios) {
            if scenario.hook_failure.is_some() {
                summary.hook_failures += 1;
            }
            for case in &scenario.cases {
                match case.outcome {
                    CaseOutcome::Passed => summary.passed += 1,
                    CaseOutcome::Failed { .. } => summary.failed += 1,
                    CaseOutcome::Errored { .. } => summary.errored += 1,
                }
            }
        }
        summary
    }

    pub fn is_success(&self) -> bool {
        self.endpoints.iter().all(EndpointReport::is_success)
    }

    pub fn endpoint(&self, label: &str) -> Option<&EndpointReport> {
        self.endpoints.iter().find(|e| e.label == label)
    }
}

/// Receives progress while a suite runs
pub trait Reporter: Send {
    fn suite_started(&mut self, _name: &str) {}
    fn endpoint_started(&mut self, _label: &str) {}
    fn scenario_started(&mut self, _description: &str) {}
    fn case_finished(&mut self, _case: &CaseReport) {}
    fn hook_failed(&mut self, _failure: &HookFailure) {}
    fn suite_finished(&mut self, _report: &SuiteReport) {}
}

/// Reporter that prints nothing
#[derive(Debug, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {}

/// Colored, indented console output
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn suite_started(&mut self, name: &str) {
        println!("\n{} {}", "Running Suite:".blue().bold(), name.white().bold());
    }

    fn endpoint_started(&mut self, label: &str) {
        println!("\n  {}", label.cyan());
    }

    fn scenario_started(&mut self, description: &str) {
        println!("    {}", description);
    }

    fn case_finished(&mut self, case: &CaseReport) {
        match &case.outcome {
            CaseOutcome::Passed => println!("      {} {}", "✓".green(), case.label.dimmed()),
            CaseOutcome::Failed { message } => {
                println!("      {} {}", "✗".red(), case.label);
                println!("        {}", message.red());
            }
            CaseOutcome::Errored { message } => {
                println!("      {} {}", "!".yellow(), case.label);
                println!("        {}", message.yellow());
            }
        }
    }

    fn hook_failed(&mut self, failure: &HookFailure) {
        println!(
            "      {} {} hook failed: {}",
            "!".yellow(),
            failure.hook,
            failure.message.yellow()
        );
    }

    fn suite_finished(&mut self, report: &SuiteReport) {
        let summary = report.summary();
        let line = format!(
            "{} passing, {} failing, {} errored",
            summary.passed, summary.failed, summary.errored
        );
        if report.is_success() {
            println!("\n{} {}\n", "✓".green().bold(), line.green().bold());
        } else {
            println!("\n{} {}\n", "✗".red().bold(), line.red().bold());
        }
    }
}
