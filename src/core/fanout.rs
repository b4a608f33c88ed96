// StockSync - core/fanout.rs
//
// Analytic fan-out: run every implemented module of a group concurrently
// against one input file and collect the meaningful payloads.
//
// Two aggregation policies are offered:
//   - all-or-nothing: the first module failure fails the whole run and the
//     other results are discarded (`run_fanout`, `try_join_all`);
//   - tolerate-failures: every module settles, failures are reported next
//     to whatever data the others produced (`run_fanout_settled`, `join_all`).
//
// Planned modules carry no fetcher and are never reached from here.

use crate::core::analytics::{has_data, AnalyticsGroup};
use crate::core::model::InputFile;
use futures::future::{join_all, try_join_all};
use serde_json::Value;
use std::collections::BTreeMap;

/// Payloads keyed by module id. Modules without data are absent.
pub type AnalyticResults = BTreeMap<String, Value>;

/// A single module's failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFailure {
    pub module_id: String,
    pub message: String,
}

/// Aggregated result of one analytics run.
#[derive(Debug, Clone, PartialEq)]
pub enum FanoutOutcome {
    /// At least one module produced data.
    ///
    /// `failures` is always empty under the all-or-nothing policy.
    Completed {
        results: AnalyticResults,
        failures: Vec<ModuleFailure>,
    },
    /// Every module settled without data. Not an error.
    NoData { failures: Vec<ModuleFailure> },
    /// The run failed as a whole.
    Failed(ModuleFailure),
}

impl FanoutOutcome {
    pub fn results(&self) -> Option<&AnalyticResults> {
        match self {
            Self::Completed { results, .. } => Some(results),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// How module failures affect the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanoutPolicy {
    #[default]
    AllOrNothing,
    TolerateFailures,
}

impl FanoutPolicy {
    /// Parse the config spelling (`all-or-nothing` / `tolerate-failures`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all-or-nothing" | "all_or_nothing" => Some(Self::AllOrNothing),
            "tolerate-failures" | "tolerate_failures" | "tolerate" => {
                Some(Self::TolerateFailures)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllOrNothing => "all-or-nothing",
            Self::TolerateFailures => "tolerate-failures",
        }
    }
}

/// Run the group's implemented modules concurrently; first failure wins.
pub async fn run_fanout(group: &AnalyticsGroup, file: &InputFile) -> FanoutOutcome {
    let fetches = group.implemented().map(|(info, fetcher)| async move {
        fetcher
            .fetch(file)
            .await
            .map(|payload| (info.id, payload))
            .map_err(|e| ModuleFailure {
                module_id: info.id.to_string(),
                message: e.to_string(),
            })
    });

    match try_join_all(fetches).await {
        Ok(payloads) => collect(payloads, Vec::new()),
        Err(failure) => {
            tracing::warn!(
                group = group.id,
                module = %failure.module_id,
                error = %failure.message,
                "Analytics run failed"
            );
            FanoutOutcome::Failed(failure)
        }
    }
}

/// Per-module result of a settled run.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleResult {
    Data(Value),
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleOutcome {
    pub module_id: String,
    pub result: ModuleResult,
}

/// Every implemented module's outcome, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettledFanout {
    pub outcomes: Vec<ModuleOutcome>,
}

/// Run the group's implemented modules concurrently and wait for all of them.
pub async fn run_fanout_settled(group: &AnalyticsGroup, file: &InputFile) -> SettledFanout {
    let fetches = group.implemented().map(|(info, fetcher)| async move {
        let result = match fetcher.fetch(file).await {
            Ok(payload) if has_data(&payload) => ModuleResult::Data(payload),
            Ok(_) => ModuleResult::Empty,
            Err(e) => ModuleResult::Failed(e.to_string()),
        };
        ModuleOutcome {
            module_id: info.id.to_string(),
            result,
        }
    });

    SettledFanout {
        outcomes: join_all(fetches).await,
    }
}

impl SettledFanout {
    /// Fold the settled outcomes into a run outcome under `policy`.
    ///
    /// All-or-nothing fails with the first failing module in declaration
    /// order. Tolerate-failures only fails when no module produced data and
    /// at least one failed.
    pub fn resolve(self, policy: FanoutPolicy) -> FanoutOutcome {
        let mut results = AnalyticResults::new();
        let mut failures = Vec::new();
        for outcome in self.outcomes {
            match outcome.result {
                ModuleResult::Data(payload) => {
                    results.insert(outcome.module_id, payload);
                }
                ModuleResult::Empty => {}
                ModuleResult::Failed(message) => failures.push(ModuleFailure {
                    module_id: outcome.module_id,
                    message,
                }),
            }
        }

        match policy {
            FanoutPolicy::AllOrNothing if !failures.is_empty() => {
                FanoutOutcome::Failed(failures.swap_remove(0))
            }
            FanoutPolicy::TolerateFailures if results.is_empty() && !failures.is_empty() => {
                FanoutOutcome::Failed(failures.swap_remove(0))
            }
            _ if results.is_empty() => FanoutOutcome::NoData { failures },
            _ => FanoutOutcome::Completed { results, failures },
        }
    }
}

/// Run under `policy`.
pub async fn run_with_policy(
    group: &AnalyticsGroup,
    file: &InputFile,
    policy: FanoutPolicy,
) -> FanoutOutcome {
    let outcome = match policy {
        FanoutPolicy::AllOrNothing => run_fanout(group, file).await,
        FanoutPolicy::TolerateFailures => run_fanout_settled(group, file).await.resolve(policy),
    };
    tracing::info!(
        group = group.id,
        policy = policy.as_str(),
        modules = outcome.results().map_or(0, |r| r.len()),
        failed = outcome.is_failed(),
        "Analytics run settled"
    );
    outcome
}

fn collect(payloads: Vec<(&'static str, Value)>, failures: Vec<ModuleFailure>) -> FanoutOutcome {
    let results: AnalyticResults = payloads
        .into_iter()
        .filter(|(_, payload)| has_data(payload))
        .map(|(id, payload)| (id.to_string(), payload))
        .collect();
    if results.is_empty() {
        FanoutOutcome::NoData { failures }
    } else {
        FanoutOutcome::Completed { results, failures }
    }
}
