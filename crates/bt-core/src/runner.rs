//! Runs checks against an opened bundle.

use crate::report::{CheckReport, RunReport};
use bt_bundle::Bundle;
use bt_checks::{Check, CheckRegistry, Status};
use tracing::{info, info_span};

/// Which checks a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    One(String),
}

/// Run the selected checks one after another, in name order.
pub fn run(
    registry: &CheckRegistry,
    bundle: &Bundle,
    selection: &Selection,
    run_id: &str,
) -> bt_checks::Result<RunReport> {
    let checks: Vec<&Check> = match selection {
        Selection::All => registry.list().collect(),
        Selection::One(name) => vec![registry.get(name)?],
    };
    Ok(run_checks(bundle, checks, run_id))
}

pub fn run_checks<'a, I>(bundle: &Bundle, checks: I, run_id: &str) -> RunReport
where
    I: IntoIterator<Item = &'a Check>,
{
    let span = info_span!("run", run_id);
    let _guard = span.enter();

    let reports: Vec<CheckReport> = checks
        .into_iter()
        .map(|check| CheckReport::new(check, check.run(bundle)))
        .collect();
    let report = RunReport::new(run_id, bundle.root().path(), reports);

    info!(
        checks = report.totals.total,
        problems = report.totals.problem,
        undefined = report.totals.undefined,
        ok = report.status == Status::Ok,
        "Run finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use bt_checks::{CheckFuncBuilder, CheckResult};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn bundle() -> (TempDir, Bundle) {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("10.0.0.1_master")).unwrap();
        std::fs::create_dir(tmp.path().join("10.0.1.1_agent")).unwrap();
        let bundle = Bundle::open(tmp.path()).unwrap();
        (tmp, bundle)
    }

    fn registry() -> CheckRegistry {
        let mut registry = CheckRegistry::new();
        let per_master = CheckFuncBuilder::new()
            .collect_from_masters(|_| CheckResult::problem("bad master"))
            .build()
            .unwrap();
        registry
            .register(Check::new(
                "masters",
                "Checks masters",
                "Replace the master.",
                per_master,
            ))
            .unwrap();
        registry
            .register(Check::new(
                "nothing",
                "Checks nothing",
                "Nothing to do.",
                Arc::new(|_| vec![CheckResult::ok("fine")]),
            ))
            .unwrap();
        registry
    }

    #[test]
    fn test_run_all_in_name_order() {
        let (_tmp, bundle) = bundle();
        let report = run(&registry(), &bundle, &Selection::All, "run-1").unwrap();

        let names: Vec<&str> = report.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["masters", "nothing"]);
        assert_eq!(report.status, Status::Problem);
        assert_eq!(report.checks[0].cure.as_deref(), Some("Replace the master."));
        assert_eq!(report.checks[0].summary, "Problems were found.");
        assert_eq!(report.checks[1].summary, "No problems were found.");
        assert_eq!(report.run_id, "run-1");
    }

    #[test]
    fn test_run_one() {
        let (_tmp, bundle) = bundle();
        let report = run(
            &registry(),
            &bundle,
            &Selection::One("nothing".into()),
            "run-2",
        )
        .unwrap();
        assert_eq!(report.checks.len(), 1);
        assert!(report.all_ok());
    }

    #[test]
    fn test_run_unknown_check() {
        let (_tmp, bundle) = bundle();
        let err = run(&registry(), &bundle, &Selection::One("nope".into()), "run-3").unwrap_err();
        assert!(matches!(err, bt_checks::CheckError::UnknownCheck(name) if name == "nope"));
    }
}
