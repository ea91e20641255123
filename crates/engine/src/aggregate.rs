use crate::error::SyncError;
use crate::model::{
    CsvSidecar, DuplicateLead, FailedLead, FieldMap, Outcome, PassedLead, RunReport, RunStatus,
    RunSummary,
};

/// Message for a run where no position was accounted at all.
pub const EMPTY_RUN_MESSAGE: &str = "no leads were created or updated";

/// Merge per-position outcomes into final buckets and the overall verdict.
///
/// `slots[i]` is position i's outcome. `None` marks a position the response
/// stream never covered; that cannot happen for a well-formed response
/// sequence, but the engine accounts for it defensively by folding the
/// count into the failed total rather than dropping the position.
pub fn aggregate(
    leads: &[FieldMap],
    slots: Vec<Option<Outcome>>,
    sidecar: Option<&CsvSidecar>,
) -> Result<RunReport, SyncError> {
    debug_assert_eq!(leads.len(), slots.len());
    let total = leads.len();

    let mut passed = Vec::new();
    let mut duplicates = Vec::new();
    let mut failed = Vec::new();
    let mut failed_positions = Vec::new();
    let mut unaccounted = 0usize;

    for (position, slot) in slots.into_iter().enumerate() {
        let lead = leads[position].clone();
        match slot {
            Some(Outcome::Passed { id, note }) => passed.push(PassedLead { lead, id, note }),
            Some(Outcome::Duplicate { id, message }) => {
                duplicates.push(DuplicateLead { lead, id, message })
            }
            Some(Outcome::Failed { message }) => {
                failed.push(FailedLead { lead, message });
                failed_positions.push(position);
            }
            None => unaccounted += 1,
        }
    }

    let accounted = passed.len() + duplicates.len() + failed.len();
    let summary = RunSummary {
        passed: passed.len(),
        duplicates: duplicates.len(),
        failed: failed.len() + unaccounted,
        total,
    };

    let export = match sidecar {
        Some(sidecar) => Some(build_export(sidecar, &failed_positions)?),
        None => None,
    };

    let (status, message, failed_export) = if accounted == 0 {
        (RunStatus::TotalFailure, EMPTY_RUN_MESSAGE.to_string(), None)
    } else if accounted < total {
        (
            RunStatus::PartialFailure,
            format!("only {accounted} of {total} leads were successfully sent"),
            export,
        )
    } else if summary.failed == 0 {
        (
            RunStatus::Success,
            format!(
                "successfully created or updated {} leads",
                summary.passed + summary.duplicates
            ),
            None,
        )
    } else {
        let status = if summary.passed + summary.duplicates == 0 {
            RunStatus::TotalFailure
        } else {
            RunStatus::PartialFailure
        };
        (
            status,
            format!("failed to create or update {} leads", summary.failed),
            export,
        )
    };

    Ok(RunReport {
        status,
        message,
        summary,
        passed,
        duplicates,
        failed,
        failed_export,
    })
}

/// Reassemble the original CSV rows for failed positions, seeded with the
/// header row. Failed positions with no source row are omitted from the
/// blob but stay counted in the failed bucket.
fn build_export(sidecar: &CsvSidecar, failed_positions: &[usize]) -> Result<String, SyncError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if !sidecar.header.is_empty() {
        writer
            .write_record(&sidecar.header)
            .map_err(|e| SyncError::ExportWrite(e.to_string()))?;
    }
    for &position in failed_positions {
        if let Some(row) = sidecar.rows.get(position) {
            writer
                .write_record(row)
                .map_err(|e| SyncError::ExportWrite(e.to_string()))?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| SyncError::ExportWrite(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| SyncError::ExportWrite(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(email: &str) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert("email".into(), email.into());
        map
    }

    fn passed() -> Option<Outcome> {
        Some(Outcome::Passed {
            id: Some(1),
            note: None,
        })
    }

    fn failed(message: &str) -> Option<Outcome> {
        Some(Outcome::Failed {
            message: message.into(),
        })
    }

    fn sidecar(rows: &[&[&str]]) -> CsvSidecar {
        CsvSidecar {
            header: vec!["email".into(), "name".into()],
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn all_passed_is_success() {
        let leads = vec![lead("a@x.co"), lead("b@x.co")];
        let report = aggregate(&leads, vec![passed(), passed()], None).unwrap();
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.summary.passed, 2);
        assert_eq!(report.summary.failed, 0);
        assert_eq!(report.message, "successfully created or updated 2 leads");
        assert!(report.failed_export.is_none());
    }

    #[test]
    fn duplicates_still_count_toward_success() {
        let leads = vec![lead("a@x.co"), lead("b@x.co")];
        let slots = vec![
            passed(),
            Some(Outcome::Duplicate {
                id: None,
                message: "multiple lead match lookup criteria".into(),
            }),
        ];
        let report = aggregate(&leads, slots, None).unwrap();
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.summary.duplicates, 1);
    }

    #[test]
    fn mixed_outcome_is_partial_failure() {
        let leads = vec![lead("a@x.co"), lead("b@x.co")];
        let report = aggregate(&leads, vec![passed(), failed("Invalid email")], None).unwrap();
        assert_eq!(report.status, RunStatus::PartialFailure);
        assert_eq!(report.message, "failed to create or update 1 leads");
        assert_eq!(report.failed[0].message, "Invalid email");
    }

    #[test]
    fn all_failed_is_total_failure() {
        let leads = vec![lead("a@x.co")];
        let report = aggregate(&leads, vec![failed("request failed")], None).unwrap();
        assert_eq!(report.status, RunStatus::TotalFailure);
        assert_eq!(report.summary.failed, 1);
    }

    #[test]
    fn empty_input_is_hard_failure() {
        let report = aggregate(&[], vec![], None).unwrap();
        assert_eq!(report.status, RunStatus::TotalFailure);
        assert_eq!(report.message, EMPTY_RUN_MESSAGE);
        assert_eq!(report.summary.total, 0);
    }

    #[test]
    fn unaccounted_positions_fold_into_failed_count() {
        let leads = vec![lead("a@x.co"), lead("b@x.co"), lead("c@x.co")];
        let report = aggregate(&leads, vec![passed(), None, None], None).unwrap();
        assert_eq!(report.status, RunStatus::PartialFailure);
        assert_eq!(report.message, "only 1 of 3 leads were successfully sent");
        assert_eq!(report.summary.failed, 2);
        // entries exist only for classified failures
        assert!(report.failed.is_empty());
        assert_eq!(report.summary.passed + report.summary.duplicates + report.summary.failed, 3);
    }

    #[test]
    fn export_contains_only_failed_rows_with_sources() {
        let leads = vec![lead("a@x.co"), lead("b@x.co"), lead("c@x.co")];
        let sidecar = sidecar(&[
            &["a@x.co", "Ann"],
            &["b@x.co", "Ben"],
            &["c@x.co", "Cal"],
        ]);
        let slots = vec![passed(), failed("Invalid email"), failed("bad state")];
        let report = aggregate(&leads, slots, Some(&sidecar)).unwrap();
        let export = report.failed_export.unwrap();
        assert_eq!(export, "email,name\nb@x.co,Ben\nc@x.co,Cal\n");
    }

    #[test]
    fn failed_position_without_source_row_is_omitted_from_export() {
        let leads = vec![lead("a@x.co"), lead("b@x.co")];
        // sidecar only covers position 0
        let sidecar = sidecar(&[&["a@x.co", "Ann"]]);
        let slots = vec![passed(), failed("Invalid email")];
        let report = aggregate(&leads, slots, Some(&sidecar)).unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed_export.unwrap(), "email,name\n");
    }

    #[test]
    fn success_attaches_no_export() {
        let leads = vec![lead("a@x.co")];
        let sidecar = sidecar(&[&["a@x.co", "Ann"]]);
        let report = aggregate(&leads, vec![passed()], Some(&sidecar)).unwrap();
        assert!(report.failed_export.is_none());
    }
}
