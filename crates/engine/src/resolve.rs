use crate::api::{ApiError, LeadApi, LeadMatch};
use crate::config::SyncConfig;
use crate::model::{FieldMap, Outcome};

/// Failure message when the key lookup finds nothing to update.
pub const NO_MATCH_MESSAGE: &str = "Unable to find matching leads";

/// Fallback when the update is refused without a usable reason.
pub const UPDATE_FAILED_MESSAGE: &str = "Failed to update most recent matching lead";

/// Resolve one ambiguous-duplicate lead by updating the most recently
/// modified existing match.
///
/// Never escalates: every failure mode, including the API calls themselves
/// erroring, folds into a `Failed` outcome for this position alone, so one
/// bad resolution cannot abort the others.
pub fn resolve_duplicate(config: &SyncConfig, lead: &FieldMap, api: &impl LeadApi) -> Outcome {
    match try_resolve(config, lead, api) {
        Ok(outcome) => outcome,
        Err(e) => Outcome::Failed {
            message: format!("Error resolving multiple matches: {e}"),
        },
    }
}

fn try_resolve(
    config: &SyncConfig,
    lead: &FieldMap,
    api: &impl LeadApi,
) -> Result<Outcome, ApiError> {
    let key_value = key_value(lead, &config.key_field);
    let lookup = api.find_by_key(&key_value, None, config.partition_id)?;
    if !lookup.success || lookup.result.is_empty() {
        return Ok(Outcome::Failed {
            message: NO_MATCH_MESSAGE.into(),
        });
    }

    let canonical = most_recent(&lookup.result);
    let match_count = lookup.result.len();

    // Re-submit the original field values addressed at the canonical match.
    let mut update = lead.clone();
    update.insert("id".into(), serde_json::Value::from(canonical.id));
    let response =
        api.update_by_key(&update, "id", &canonical.id.to_string(), config.partition_id)?;

    let item = response.result.as_deref().and_then(|r| r.first());
    let updated = response.success && item.is_some_and(|i| i.status != "skipped");

    if updated {
        Ok(Outcome::Passed {
            id: Some(canonical.id),
            note: Some(format!(
                "Updated most recent of {match_count} matching leads"
            )),
        })
    } else {
        let message = item
            .and_then(|i| i.reasons.as_deref())
            .and_then(|r| r.first())
            .map(|r| r.message.clone())
            .unwrap_or_else(|| UPDATE_FAILED_MESSAGE.into());
        Ok(Outcome::Failed { message })
    }
}

/// The match to update: latest `updated_at`, falling back to `created_at`,
/// then the Unix epoch. Ties keep the platform's return order.
///
/// Callers guarantee `matches` is non-empty.
fn most_recent(matches: &[LeadMatch]) -> &LeadMatch {
    let mut best = &matches[0];
    for m in &matches[1..] {
        if m.last_touched() > best.last_touched() {
            best = m;
        }
    }
    best
}

/// The lead's lookup key as a plain string. Non-string values are rendered
/// through their JSON form; a missing field yields an empty key, which the
/// lookup then fails to match.
pub(crate) fn key_value(lead: &FieldMap, key_field: &str) -> String {
    match lead.get(key_field) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}
