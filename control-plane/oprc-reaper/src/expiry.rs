use chrono::{DateTime, Utc};

use crate::resource::ObservedObject;

pub const DEFAULT_KILL_AFTER_ANNOTATION: &str = "reaper.oaas.io/kill-after";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Deletion already in progress.
    Deleting,
    /// No (or empty) expiry annotation.
    NotAnnotated,
    /// Annotated, but the deadline has not passed yet.
    NotExpired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Eligible { expired_at: DateTime<Utc> },
    NotEligible(SkipReason),
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Eligible { .. })
    }
}

#[derive(thiserror::Error, Debug)]
#[error("invalid expiry timestamp {value:?}: {source}")]
pub struct ExpiryError {
    pub value: String,
    #[source]
    pub source: chrono::ParseError,
}

/// Decides whether an object's expiry annotation has lapsed.
#[derive(Clone, Debug)]
pub struct ExpiryPolicy {
    annotation_key: String,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_KILL_AFTER_ANNOTATION)
    }
}

impl ExpiryPolicy {
    pub fn new(annotation_key: impl Into<String>) -> Self {
        Self {
            annotation_key: annotation_key.into(),
        }
    }

    pub fn annotation_key(&self) -> &str {
        &self.annotation_key
    }

    pub fn evaluate(
        &self,
        obj: &ObservedObject,
    ) -> Result<Verdict, ExpiryError> {
        self.evaluate_at(obj, Utc::now())
    }

    /// Deletion in progress beats everything; then a missing or empty
    /// annotation; then the RFC 3339 deadline, which must be strictly before
    /// `now`.
    pub fn evaluate_at(
        &self,
        obj: &ObservedObject,
        now: DateTime<Utc>,
    ) -> Result<Verdict, ExpiryError> {
        if obj.deletion_timestamp.is_some() {
            return Ok(Verdict::NotEligible(SkipReason::Deleting));
        }
        let raw = match obj.annotations.get(&self.annotation_key) {
            Some(v) if !v.is_empty() => v,
            _ => return Ok(Verdict::NotEligible(SkipReason::NotAnnotated)),
        };
        let expires_at = DateTime::parse_from_rfc3339(raw)
            .map_err(|source| ExpiryError {
                value: raw.clone(),
                source,
            })?
            .with_timezone(&Utc);
        if expires_at < now {
            Ok(Verdict::Eligible {
                expired_at: expires_at,
            })
        } else {
            Ok(Verdict::NotEligible(SkipReason::NotExpired))
        }
    }
}
