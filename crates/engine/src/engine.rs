use crate::aggregate;
use crate::api::LeadApi;
use crate::classify;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::{CsvSidecar, FieldMap, LeadId, Outcome, RunReport};
use crate::resolve;
use crate::walker;

/// Run the bulk create-or-update flow end to end: submit, walk the chunked
/// responses, classify every position, resolve ambiguous duplicates when
/// enabled, aggregate into the final report.
///
/// `Err` is reserved for engine-side problems (bad config, export
/// serialization). Platform-side problems come back inside the report: a
/// failed submit call as `RunStatus::Error`, everything else as per-lead
/// outcomes.
pub fn run_bulk(
    config: &SyncConfig,
    leads: &[FieldMap],
    sidecar: Option<&CsvSidecar>,
    api: &impl LeadApi,
) -> Result<RunReport, SyncError> {
    config.validate()?;

    let responses = match api.sync_leads(leads, config.partition_id) {
        Ok(responses) => responses,
        Err(e) => return Ok(RunReport::infra_error(e.to_string(), leads.len())),
    };

    if walker::partition_rejected(&responses) {
        return Ok(RunReport::rejected(
            format!("there is no partition with id {}", config.partition_id),
            leads.len(),
        ));
    }

    let mut slots: Vec<Option<Outcome>> = vec![None; leads.len()];
    for (position, item) in walker::walk(&responses, leads.len(), config.chunk_size) {
        slots[position] = Some(classify::classify(&item));
    }

    if config.update_most_recent_match {
        for (position, slot) in slots.iter_mut().enumerate() {
            if matches!(slot, Some(Outcome::Duplicate { .. })) {
                *slot = Some(resolve::resolve_duplicate(config, &leads[position], api));
            }
        }
    }

    aggregate::aggregate(leads, slots, sidecar)
}

/// Single-lead variant: the same classification and resolution flow
/// specialized to an input of size 1. No chunk walking, no CSV sidecar.
pub fn run_single(
    config: &SyncConfig,
    lead: &FieldMap,
    api: &impl LeadApi,
) -> Result<RunReport, SyncError> {
    config.validate()?;

    let response = match api.sync_one(lead, config.partition_id) {
        Ok(response) => response,
        Err(e) => return Ok(RunReport::infra_error(e.to_string(), 1)),
    };

    if walker::partition_rejected(std::slice::from_ref(&response)) {
        return Ok(RunReport::rejected(
            format!("there is no partition with id {}", config.partition_id),
            1,
        ));
    }

    let outcome = match response.items().and_then(|items| items.first()) {
        Some(item) => classify::classify_item(item),
        None => Outcome::Failed {
            message: classify::CHUNK_FAILED_MESSAGE.into(),
        },
    };

    let outcome = match outcome {
        Outcome::Duplicate { .. } if config.update_most_recent_match => {
            resolve::resolve_duplicate(config, lead, api)
        }
        other => other,
    };

    // A passed lead is re-fetched so the report carries the platform's
    // current field values; a lookup failure keeps the submitted values
    // without demoting the outcome.
    let lead_out = match &outcome {
        Outcome::Passed { id, .. } => {
            fetch_current(config, lead, *id, api).unwrap_or_else(|| lead.clone())
        }
        _ => lead.clone(),
    };

    aggregate::aggregate(&[lead_out], vec![Some(outcome)], None)
}

/// Fetch the stored lead after a successful upsert. Prefers the match with
/// the assigned identifier, falls back to the first match by key.
fn fetch_current(
    config: &SyncConfig,
    lead: &FieldMap,
    id: Option<LeadId>,
    api: &impl LeadApi,
) -> Option<FieldMap> {
    let key = resolve::key_value(lead, &config.key_field);
    let lookup = api.find_by_key(&key, None, config.partition_id).ok()?;
    if !lookup.success {
        return None;
    }

    let found = match id {
        Some(id) => lookup
            .result
            .iter()
            .find(|m| m.id == id)
            .or_else(|| lookup.result.first()),
        None => lookup.result.first(),
    }?;

    let mut fields = found.fields.clone();
    fields.insert("id".into(), serde_json::Value::from(found.id));
    Some(fields)
}
