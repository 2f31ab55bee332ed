//! Task routing policy
//!
//! Each task maps to a primary provider and an ordered fallback list. A
//! single safety-net provider closes every chain. The table is plain data;
//! the router in the application layer walks it.

use crate::core::provider::ProviderKind;
use crate::pipeline::phase::PhaseTask;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Large-context providers, in fallback preference order
const LARGE_CONTEXT_ORDER: [ProviderKind; 3] =
    [ProviderKind::Claude, ProviderKind::Gemini, ProviderKind::ChatGpt];

/// Route for one task (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub primary: ProviderKind,
    #[serde(default)]
    pub fallbacks: Vec<ProviderKind>,
}

impl RouteEntry {
    pub fn new(primary: ProviderKind, fallbacks: Vec<ProviderKind>) -> Self {
        Self { primary, fallbacks }
    }

    /// Default chain for `primary`: other large-context providers first,
    /// then the search-oriented one. The safety net is left out because it
    /// always closes the chain.
    pub fn default_for(primary: ProviderKind, safety_net: ProviderKind) -> Self {
        let mut fallbacks: Vec<ProviderKind> = LARGE_CONTEXT_ORDER
            .into_iter()
            .filter(|p| *p != primary && *p != safety_net)
            .collect();
        fallbacks.extend(
            ProviderKind::ALL
                .into_iter()
                .filter(|p| p.is_search_oriented() && *p != primary && *p != safety_net),
        );
        Self { primary, fallbacks }
    }
}

/// Routing table: task -> route, plus the safety net
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    routes: BTreeMap<PhaseTask, RouteEntry>,
    safety_net: ProviderKind,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::with_defaults(ProviderKind::Claude)
    }
}

impl RoutingTable {
    /// Every task routed to its own provider, with default fallbacks
    pub fn with_defaults(safety_net: ProviderKind) -> Self {
        let routes = PhaseTask::ALL
            .into_iter()
            .map(|task| (task, RouteEntry::default_for(task.default_provider(), safety_net)))
            .collect();
        Self { routes, safety_net }
    }

    /// Override the route for one task
    pub fn with_route(mut self, task: PhaseTask, entry: RouteEntry) -> Self {
        self.routes.insert(task, entry);
        self
    }

    pub fn safety_net(&self) -> ProviderKind {
        self.safety_net
    }

    /// Route for `task`; tasks without an entry get the default chain
    pub fn route(&self, task: PhaseTask) -> RouteEntry {
        self.routes
            .get(&task)
            .cloned()
            .unwrap_or_else(|| RouteEntry::default_for(task.default_provider(), self.safety_net))
    }

    /// Upper bound on provider calls for one dispatch of `task` with
    /// `attempts` calls allowed against the primary.
    pub fn max_attempts(&self, task: PhaseTask, attempts: u32) -> u32 {
        attempts + self.route(task).fallbacks.len() as u32 + 1
    }

    /// Validate the table and return a list of problems (empty if valid).
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (task, entry) in &self.routes {
            if entry.fallbacks.contains(&entry.primary) {
                issues.push(format!(
                    "{task}: fallback list repeats primary provider {}",
                    entry.primary
                ));
            }
            let mut seen = Vec::new();
            for p in &entry.fallbacks {
                if seen.contains(p) {
                    issues.push(format!("{task}: fallback {p} listed more than once"));
                }
                seen.push(*p);
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_routes_every_task_to_its_provider() {
        let table = RoutingTable::default();
        for task in PhaseTask::ALL {
            assert_eq!(table.route(task).primary, task.default_provider());
        }
        assert_eq!(table.safety_net(), ProviderKind::Claude);
        assert!(table.validate().is_empty());
    }

    #[test]
    fn test_large_context_fallbacks_precede_search() {
        let entry = RouteEntry::default_for(ProviderKind::Gemini, ProviderKind::Claude);
        assert_eq!(
            entry.fallbacks,
            vec![ProviderKind::ChatGpt, ProviderKind::Perplexity]
        );
    }

    #[test]
    fn test_claude_primary_falls_back_without_safety_net_duplicate() {
        let entry = RouteEntry::default_for(ProviderKind::Claude, ProviderKind::Claude);
        assert_eq!(
            entry.fallbacks,
            vec![
                ProviderKind::Gemini,
                ProviderKind::ChatGpt,
                ProviderKind::Perplexity
            ]
        );
    }

    #[test]
    fn test_search_primary_has_no_search_fallback() {
        let entry = RouteEntry::default_for(ProviderKind::Perplexity, ProviderKind::Claude);
        assert_eq!(entry.fallbacks, vec![ProviderKind::Gemini, ProviderKind::ChatGpt]);
    }

    #[test]
    fn test_override_and_bound() {
        let table = RoutingTable::default().with_route(
            PhaseTask::DeepSearchGemini,
            RouteEntry::new(ProviderKind::Gemini, vec![ProviderKind::Claude]),
        );
        assert_eq!(table.max_attempts(PhaseTask::DeepSearchGemini, 2), 4);
    }

    #[test]
    fn test_validate_reports_bad_routes() {
        let table = RoutingTable::default().with_route(
            PhaseTask::SwotChatGpt,
            RouteEntry::new(
                ProviderKind::ChatGpt,
                vec![ProviderKind::ChatGpt, ProviderKind::Gemini, ProviderKind::Gemini],
            ),
        );
        let issues = table.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("swot_chatgpt"));
    }
}
