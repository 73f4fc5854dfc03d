//! Advisory lifecycle: dedup against open advisories, escalation, TTL
//! extension, and expiry.
//!
//! One `AdvisoryBook` exists per airport. Partitioning by airport is what
//! makes parallel per-airport analysis safe: a book is only ever mutated by
//! its own airport's tick, so there is no cross-airport locking.

use crate::models::{Advisory, AdvisoryState, Finding};
use crate::rules::EngineRules;
use chrono::{DateTime, Utc};

/// Advisories created and updated by one `ingest` call, in finding order.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub created: Vec<Advisory>,
    pub updated: Vec<Advisory>,
}

/// Per-airport advisory state machine. Advisories are Open while held here;
/// `sweep_expired` transitions them to Expired and drops them from the index.
/// Expired is terminal: a finding arriving after expiry creates a fresh
/// advisory under a new id.
#[derive(Debug)]
pub struct AdvisoryBook {
    airport: String,
    open: Vec<Advisory>,
    seq: u64,
}

impl AdvisoryBook {
    pub fn new(airport: impl Into<String>) -> Self {
        Self {
            airport: airport.into(),
            open: Vec::new(),
            seq: 0,
        }
    }

    pub fn airport(&self) -> &str {
        &self.airport
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Transition every advisory with `expires_at <= now` to Expired and
    /// remove it. Runs before `ingest` each tick so a finding arriving the
    /// same tick a prior advisory lapses creates a fresh advisory instead of
    /// reviving the old one.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<Advisory> {
        let mut expired = Vec::new();
        self.open.retain_mut(|advisory| {
            if advisory.expires_at <= now {
                advisory.state = AdvisoryState::Expired;
                expired.push(advisory.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    /// Fold this tick's findings into the book.
    ///
    /// A finding matching an open advisory (same category, overlapping track
    /// set) extends that advisory: expiry pushed out to `now + ttl`, severity
    /// raised to the max of old and new (it never silently decreases while
    /// the finding class persists), message replaced, track set widened by
    /// union so an aircraft joining an existing situation stays attributed.
    /// A finding with no match opens a new advisory.
    pub fn ingest(
        &mut self,
        findings: &[Finding],
        now: DateTime<Utc>,
        rules: &EngineRules,
    ) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();

        for finding in findings {
            if finding.airport != self.airport {
                continue;
            }
            let expires_at = now + rules.ttl(finding.category);

            if let Some(advisory) = self.open.iter_mut().find(|a| a.matches(finding)) {
                advisory.severity = advisory.severity.max(finding.severity);
                advisory.message = finding.message.clone();
                advisory.expires_at = expires_at;
                advisory.tracks.extend(finding.tracks.iter().cloned());
                outcome.updated.push(advisory.clone());
            } else {
                self.seq += 1;
                let advisory = Advisory {
                    id: format!("ADV-{}-{}-{}", self.airport, finding.category, self.seq),
                    airport: self.airport.clone(),
                    category: finding.category,
                    severity: finding.severity,
                    message: finding.message.clone(),
                    created_at: now,
                    expires_at,
                    tracks: finding.tracks.clone(),
                    state: AdvisoryState::Open,
                };
                self.open.push(advisory.clone());
                outcome.created.push(advisory);
            }
        }

        outcome
    }

    /// Open advisories ranked for display: severity descending, newest first,
    /// id ascending as the deterministic tie-break.
    pub fn active(&self) -> Vec<Advisory> {
        let mut advisories = self.open.clone();
        sort_ranked(&mut advisories);
        advisories
    }
}

/// Ranking shared by the per-airport and the merged cross-airport views.
pub fn sort_ranked(advisories: &mut [Advisory]) {
    advisories.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.created_at.cmp(&a.created_at))
            .then(a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Severity};
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn finding(category: Category, severity: Severity, ids: &[&str]) -> Finding {
        Finding {
            airport: "KRHV".into(),
            category,
            severity,
            tracks: set(ids),
            message: format!("{} aircraft involved", ids.len()),
        }
    }

    #[test]
    fn recurring_finding_updates_instead_of_duplicating() {
        let mut book = AdvisoryBook::new("KRHV");
        let rules = EngineRules::default();

        let first = book.ingest(
            &[finding(Category::Approach, Severity::Warning, &["a", "b"])],
            t0(),
            &rules,
        );
        assert_eq!(first.created.len(), 1);

        let second = book.ingest(
            &[finding(Category::Approach, Severity::Warning, &["a", "b"])],
            t0() + Duration::seconds(15),
            &rules,
        );
        assert!(second.created.is_empty());
        assert_eq!(second.updated.len(), 1);
        assert_eq!(book.open_count(), 1);
    }

    #[test]
    fn severity_never_decreases_on_update() {
        let mut book = AdvisoryBook::new("KRHV");
        let rules = EngineRules::default();

        book.ingest(
            &[finding(Category::Approach, Severity::Critical, &["a", "b"])],
            t0(),
            &rules,
        );
        let outcome = book.ingest(
            &[finding(Category::Approach, Severity::Caution, &["a", "b"])],
            t0() + Duration::seconds(15),
            &rules,
        );
        assert_eq!(outcome.updated[0].severity, Severity::Critical);
    }

    #[test]
    fn ttl_extension_never_moves_expiry_backwards() {
        let mut book = AdvisoryBook::new("KRHV");
        let rules = EngineRules::default();

        let created = book.ingest(
            &[finding(Category::Pattern, Severity::Warning, &["a", "b"])],
            t0(),
            &rules,
        );
        let initial_expiry = created.created[0].expires_at;

        let updated = book.ingest(
            &[finding(Category::Pattern, Severity::Warning, &["a", "b"])],
            t0() + Duration::seconds(30),
            &rules,
        );
        assert!(updated.updated[0].expires_at > initial_expiry);
    }

    #[test]
    fn expiry_is_terminal_and_same_tick_recurrence_opens_fresh() {
        let mut book = AdvisoryBook::new("KRHV");
        let rules = EngineRules::default();

        let created = book.ingest(
            &[finding(Category::Pattern, Severity::Warning, &["a", "b"])],
            t0(),
            &rules,
        );
        let original_id = created.created[0].id.clone();

        // Scenario B: TTL 10 minutes, query at t0+11min shows it gone.
        let later = t0() + Duration::minutes(11);
        let expired = book.sweep_expired(later);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].state, AdvisoryState::Expired);
        assert!(book.active().is_empty());

        // Same-tick recurrence after the sweep opens a new advisory.
        let reopened = book.ingest(
            &[finding(Category::Pattern, Severity::Warning, &["a", "b"])],
            later,
            &rules,
        );
        assert_eq!(reopened.created.len(), 1);
        assert_ne!(reopened.created[0].id, original_id);
    }

    #[test]
    fn unexpired_advisory_survives_sweep() {
        let mut book = AdvisoryBook::new("KRHV");
        let rules = EngineRules::default();
        book.ingest(
            &[finding(Category::Pattern, Severity::Warning, &["a", "b"])],
            t0(),
            &rules,
        );
        assert!(book.sweep_expired(t0() + Duration::minutes(9)).is_empty());
        assert_eq!(book.active().len(), 1);
    }

    #[test]
    fn disjoint_track_sets_open_separate_advisories() {
        let mut book = AdvisoryBook::new("KRHV");
        let rules = EngineRules::default();

        let outcome = book.ingest(
            &[
                finding(Category::Approach, Severity::Caution, &["a"]),
                finding(Category::Approach, Severity::Caution, &["b"]),
            ],
            t0(),
            &rules,
        );
        assert_eq!(outcome.created.len(), 2);
        assert_eq!(book.open_count(), 2);
    }

    #[test]
    fn escalation_widens_the_track_set() {
        // Scenario A: two on approach, then a third joins; one advisory
        // escalates rather than a second one opening.
        let mut book = AdvisoryBook::new("KRHV");
        let rules = EngineRules::default();

        book.ingest(
            &[finding(Category::Approach, Severity::Warning, &["a", "b"])],
            t0(),
            &rules,
        );
        let outcome = book.ingest(
            &[finding(Category::Approach, Severity::Critical, &["a", "b", "c"])],
            t0() + Duration::seconds(15),
            &rules,
        );

        assert!(outcome.created.is_empty());
        assert_eq!(book.open_count(), 1);
        let advisory = &outcome.updated[0];
        assert_eq!(advisory.severity, Severity::Critical);
        assert_eq!(advisory.tracks, set(&["a", "b", "c"]));
    }

    #[test]
    fn findings_for_other_airports_are_ignored() {
        let mut book = AdvisoryBook::new("KRHV");
        let rules = EngineRules::default();
        let mut foreign = finding(Category::Runway, Severity::Caution, &["a", "b"]);
        foreign.airport = "KPAO".into();
        let outcome = book.ingest(&[foreign], t0(), &rules);
        assert!(outcome.created.is_empty());
        assert_eq!(book.open_count(), 0);
    }

    #[test]
    fn active_ranks_severity_then_recency_then_id() {
        let mut book = AdvisoryBook::new("KRHV");
        let rules = EngineRules::default();

        book.ingest(
            &[finding(Category::Pattern, Severity::Warning, &["a", "b"])],
            t0(),
            &rules,
        );
        book.ingest(
            &[finding(Category::Approach, Severity::Critical, &["c"])],
            t0() + Duration::seconds(10),
            &rules,
        );
        book.ingest(
            &[finding(Category::Runway, Severity::Warning, &["d", "e"])],
            t0() + Duration::seconds(20),
            &rules,
        );

        let ranked = book.active();
        assert_eq!(ranked[0].severity, Severity::Critical);
        // The two warnings tie on severity; the newer one ranks first.
        assert_eq!(ranked[1].category, Category::Runway);
        assert_eq!(ranked[2].category, Category::Pattern);
    }

    #[test]
    fn ids_are_deterministic_per_partition() {
        let mut book = AdvisoryBook::new("KRHV");
        let rules = EngineRules::default();
        let outcome = book.ingest(
            &[finding(Category::Runway, Severity::Caution, &["a", "b"])],
            t0(),
            &rules,
        );
        assert_eq!(outcome.created[0].id, "ADV-KRHV-RUNWAY-1");
    }
}
