//! Condition building and merging
//!
//! A condition's `lastTransitionTime` only moves when its status changes, so
//! observers can tell real state changes from reason/message churn.

use chrono::{DateTime, Utc};

use crate::crd::{get_condition, Condition, ConditionStatus, CONDITION_TYPE_CREATED};

const INITIALIZED_REASON: &str = "ConditionInitialized";
const INITIALIZED_MESSAGE: &str =
    "The condition has been initialized but its semantic check has not been performed yet.";

/// A function producing an updated condition set, applied by the status updater
pub type ConditionMutator = fn(&[Condition], DateTime<Utc>) -> Vec<Condition>;

/// Builds a condition, optionally on top of its previous version
#[derive(Clone, Debug)]
pub struct ConditionBuilder {
    type_: String,
    status: Option<ConditionStatus>,
    reason: Option<String>,
    message: Option<String>,
    old: Option<Condition>,
}

impl ConditionBuilder {
    pub fn new(type_: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            status: None,
            reason: None,
            message: None,
            old: None,
        }
    }

    /// Carry forward the previous version of the condition
    pub fn with_old_condition(mut self, old: Condition) -> Self {
        self.old = Some(old);
        self
    }

    pub fn with_status(mut self, status: ConditionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Build the condition and report whether it differs from the old one
    ///
    /// Unset or empty reason/message fall back to the old condition's values.
    pub fn build(self, now: DateTime<Utc>) -> (Condition, bool) {
        let old = self.old;

        let status = self
            .status
            .or_else(|| old.as_ref().map(|c| c.status))
            .unwrap_or(ConditionStatus::Unknown);
        let reason = pick(self.reason, old.as_ref().map(|c| &c.reason), INITIALIZED_REASON);
        let message = pick(self.message, old.as_ref().map(|c| &c.message), INITIALIZED_MESSAGE);

        let Some(old) = old else {
            let condition = Condition {
                type_: self.type_,
                status,
                last_transition_time: now,
                last_update_time: now,
                reason,
                message,
            };
            return (condition, true);
        };

        let status_changed = old.status != status;
        let changed = status_changed || old.reason != reason || old.message != message;

        let condition = Condition {
            type_: self.type_,
            status,
            last_transition_time: if status_changed {
                now
            } else {
                old.last_transition_time
            },
            last_update_time: if changed { now } else { old.last_update_time },
            reason,
            message,
        };
        (condition, changed)
    }
}

fn pick(new: Option<String>, old: Option<&String>, default: &str) -> String {
    match new {
        Some(v) if !v.is_empty() => v,
        _ => old.cloned().unwrap_or_else(|| default.to_string()),
    }
}

/// Replace the condition of the same type, or append it
pub fn merge_conditions(conditions: &[Condition], new: Condition) -> Vec<Condition> {
    let mut merged = conditions.to_vec();
    match merged.iter_mut().find(|c| c.type_ == new.type_) {
        Some(existing) => *existing = new,
        None => merged.push(new),
    }
    merged
}

/// Set `type_` to `status` on top of whatever version is already present
pub fn merge_condition(
    conditions: &[Condition],
    type_: &str,
    status: ConditionStatus,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Vec<Condition> {
    let mut builder = ConditionBuilder::new(type_)
        .with_status(status)
        .with_reason(reason)
        .with_message(message);
    if let Some(old) = get_condition(conditions, type_) {
        builder = builder.with_old_condition(old.clone());
    }
    let (condition, _) = builder.build(now);
    merge_conditions(conditions, condition)
}

fn update_created_condition(
    conditions: &[Condition],
    status: ConditionStatus,
    reason: &str,
    message: &str,
    update_if_existing: bool,
    now: DateTime<Utc>,
) -> Vec<Condition> {
    if let Some(existing) = get_condition(conditions, CONDITION_TYPE_CREATED) {
        if !update_if_existing || existing.status == status {
            return conditions.to_vec();
        }
    }
    merge_condition(conditions, CONDITION_TYPE_CREATED, status, reason, message, now)
}

/// Mark the record as created in the provider
pub fn created_condition_true(conditions: &[Condition], now: DateTime<Utc>) -> Vec<Condition> {
    update_created_condition(
        conditions,
        ConditionStatus::True,
        "Success",
        "Record was created successfully in infrastructure at least once",
        true,
        now,
    )
}

/// Record an initial creation failure
///
/// Never regresses an existing Created condition.
pub fn created_condition_false(conditions: &[Condition], now: DateTime<Utc>) -> Vec<Condition> {
    update_created_condition(
        conditions,
        ConditionStatus::False,
        "Error",
        "Error on initial record creation in infrastructure",
        false,
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn created(status: ConditionStatus, at: DateTime<Utc>) -> Condition {
        Condition {
            type_: CONDITION_TYPE_CREATED.to_string(),
            status,
            last_transition_time: at,
            last_update_time: at,
            reason: "Success".to_string(),
            message: "created".to_string(),
        }
    }

    #[test]
    fn new_condition_gets_current_timestamps() {
        let (c, changed) = ConditionBuilder::new("Ready")
            .with_status(ConditionStatus::True)
            .build(t0());
        assert!(changed);
        assert_eq!(c.last_transition_time, t0());
        assert_eq!(c.reason, INITIALIZED_REASON);
    }

    #[test]
    fn message_only_change_keeps_transition_time() {
        let later = t0() + Duration::minutes(5);
        let merged = merge_condition(
            &[created(ConditionStatus::True, t0())],
            CONDITION_TYPE_CREATED,
            ConditionStatus::True,
            "Success",
            "still there",
            later,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].last_transition_time, t0());
        assert_eq!(merged[0].last_update_time, later);
        assert_eq!(merged[0].message, "still there");
    }

    #[test]
    fn status_change_moves_transition_time() {
        let later = t0() + Duration::minutes(5);
        let merged = merge_condition(
            &[created(ConditionStatus::False, t0())],
            CONDITION_TYPE_CREATED,
            ConditionStatus::True,
            "Success",
            "created",
            later,
        );
        assert_eq!(merged[0].status, ConditionStatus::True);
        assert_eq!(merged[0].last_transition_time, later);
    }

    #[test]
    fn empty_reason_carries_old_reason_forward() {
        let (c, _) = ConditionBuilder::new(CONDITION_TYPE_CREATED)
            .with_old_condition(created(ConditionStatus::True, t0()))
            .with_reason("")
            .build(t0() + Duration::seconds(1));
        assert_eq!(c.reason, "Success");
        assert_eq!(c.status, ConditionStatus::True);
    }

    #[test]
    fn merge_keeps_other_conditions_in_place() {
        let other = Condition {
            type_: "Other".to_string(),
            ..created(ConditionStatus::Unknown, t0())
        };
        let merged = merge_conditions(
            &[other.clone(), created(ConditionStatus::False, t0())],
            created(ConditionStatus::True, t0()),
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], other);
        assert_eq!(merged[1].status, ConditionStatus::True);
    }

    #[test]
    fn created_false_never_regresses_existing_condition() {
        let existing = vec![created(ConditionStatus::True, t0())];
        let result = created_condition_false(&existing, t0() + Duration::minutes(1));
        assert_eq!(result, existing);
    }

    #[test]
    fn created_false_is_set_on_first_failure() {
        let result = created_condition_false(&[], t0());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].status, ConditionStatus::False);
        assert_eq!(result[0].reason, "Error");
    }

    #[test]
    fn created_true_is_stable_when_already_true() {
        let existing = vec![created(ConditionStatus::True, t0())];
        let result = created_condition_true(&existing, t0() + Duration::hours(1));
        assert_eq!(result, existing);
    }

    #[test]
    fn created_true_overrides_false() {
        let later = t0() + Duration::hours(1);
        let result = created_condition_true(&[created(ConditionStatus::False, t0())], later);
        assert_eq!(result[0].status, ConditionStatus::True);
        assert_eq!(result[0].last_transition_time, later);
    }
}
