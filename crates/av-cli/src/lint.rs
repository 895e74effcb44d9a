//! # Rule Lint Subcommand
//!
//! Validates an evidence-rule set before it is imported: construction
//! invariants (positive day counts, positive `min_items`), duplicate rule
//! ids, and empty section scopes. Bad rules are a configuration defect
//! best caught before the status engine ever sees them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use av_model::{EvidenceRule, RuleScope};

/// Arguments for the lint-rules subcommand.
#[derive(Args, Debug)]
pub struct LintArgs {
    /// Path to a JSON array of evidence rules.
    #[arg(long)]
    pub rules: PathBuf,
}

/// Lint findings for one rule file.
#[derive(Debug, Default)]
pub struct LintReport {
    pub checked: usize,
    pub problems: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

pub fn run(args: &LintArgs) -> anyhow::Result<LintReport> {
    let report = lint_file(&args.rules)?;

    println!("Checked {} rules", report.checked);
    for problem in &report.problems {
        println!("  problem: {problem}");
    }
    if report.is_clean() {
        println!("Rule set is clean");
        Ok(report)
    } else {
        anyhow::bail!("{} problem(s) found", report.problems.len())
    }
}

pub fn lint_file(path: &Path) -> anyhow::Result<LintReport> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading rule file {}", path.display()))?;
    let rules: Vec<EvidenceRule> =
        serde_json::from_str(&raw).with_context(|| format!("parsing rule file {}", path.display()))?;
    Ok(lint_rules(&rules))
}

pub fn lint_rules(rules: &[EvidenceRule]) -> LintReport {
    let mut report = LintReport {
        checked: rules.len(),
        ..Default::default()
    };
    let mut seen = HashSet::new();

    for rule in rules {
        if !seen.insert(rule.id) {
            report.problems.push(format!("duplicate rule id {}", rule.id));
        }
        if let Err(e) = rule.validate() {
            report
                .problems
                .push(format!("rule {} ({}): {e}", rule.id, rule.kind.as_str()));
        }
        if let RuleScope::Section { section_code } = &rule.scope {
            if section_code.trim().is_empty() {
                report
                    .problems
                    .push(format!("rule {}: section scope with empty code", rule.id));
            }
        }
        if !rule.enabled {
            tracing::debug!(rule_id = %rule.id, "rule is disabled, skipping engine checks");
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use av_core::{ControlId, PackId};
    use av_model::RuleKind;

    fn valid_rule() -> EvidenceRule {
        EvidenceRule::new(
            PackId::new(),
            RuleScope::Control {
                control_id: ControlId::new(),
            },
            RuleKind::OneTime,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_clean_rule_set() {
        let report = lint_rules(&[valid_rule(), valid_rule()]);
        assert_eq!(report.checked, 2);
        assert!(report.is_clean());
    }

    #[test]
    fn test_invalid_parameters_reported() {
        let mut broken = valid_rule();
        broken.min_items = 0;
        broken.kind = RuleKind::Frequency { every_days: -3 };

        let report = lint_rules(&[broken]);
        assert_eq!(report.problems.len(), 1);
        assert!(report.problems[0].contains("min_items"));
    }

    #[test]
    fn test_duplicate_ids_reported() {
        let rule = valid_rule();
        let report = lint_rules(&[rule.clone(), rule]);
        assert_eq!(report.problems.len(), 1);
        assert!(report.problems[0].contains("duplicate rule id"));
    }

    #[test]
    fn test_empty_section_code_reported() {
        let mut rule = valid_rule();
        rule.scope = RuleScope::Section {
            section_code: "  ".to_string(),
        };
        let report = lint_rules(&[rule]);
        assert_eq!(report.problems.len(), 1);
    }

    #[test]
    fn test_lint_file_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(lint_file(&path).is_err());
    }
}
