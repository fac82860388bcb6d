//! Property tests for the timeline layout engine.
//!
//! 1. Same inputs and `now` give byte-identical layouts.
//! 2. The domain contains every readable timestamp and `now`.
//! 3. Every resolvable link yields exactly one marker on its row; unlinked
//!    communications yield exactly one general-lane marker.
//! 4. Bars are never narrower than the configured minimum and run in time
//!    order with `now` at one end.

use chrono::{DateTime, Duration, TimeZone, Utc};
use habicase_core::timeline::{self, LayoutConfig, MarkerLane, TimelineLayout};
use habicase_core::{Communication, ContactMethod, Issue, IssueStatus, Severity};
use proptest::prelude::*;

// ── Strategies ──

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()
}

fn date_string(minutes: i64, millis: i64) -> String {
    (base() + Duration::minutes(minutes) + Duration::milliseconds(millis)).to_rfc3339()
}

fn issues_strategy() -> impl Strategy<Value = Vec<Issue>> {
    let spec = (0i64..2_000_000, 0i64..60_000, "[a-zA-Z ]{0,40}");
    prop::collection::vec(spec, 0..6).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (minutes, millis, title))| Issue {
                id: format!("i{i}"),
                title,
                category: "General".into(),
                room: "Unknown".into(),
                severity: Severity::Medium,
                status: IssueStatus::Ongoing,
                first_noticed_at: date_string(minutes, millis),
                description: String::new(),
                habitability_categories: vec![],
            })
            .collect()
    })
}

fn comms_strategy() -> impl Strategy<Value = Vec<Communication>> {
    prop::collection::vec(
        (
            0i64..2_000_000,
            0i64..60_000,
            prop::collection::vec(0usize..8, 0..4),
        ),
        0..6,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (minutes, millis, links))| Communication {
                id: format!("c{i}"),
                date: date_string(minutes, millis),
                method: ContactMethod::Phone,
                tenant_message: "status?".into(),
                landlord_response: String::new(),
                // Ids i6 and i7 never exist: dangling links.
                linked_issue_ids: links.into_iter().map(|n| format!("i{n}")).collect(),
                promises: vec![],
            })
            .collect()
    })
}

fn now_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    // Sub-second offsets exercise the day-boundary rounding of the domain.
    prop_oneof![
        (0i64..2_500_000, 0i64..60_000)
            .prop_map(|(m, ms)| base() + Duration::minutes(m) + Duration::milliseconds(ms)),
        (0i64..1_700, 1i64..1_000)
            .prop_map(|(d, ms)| base() + Duration::days(d) + Duration::milliseconds(ms)),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn layout_is_deterministic(
        issues in issues_strategy(),
        comms in comms_strategy(),
        now in now_strategy(),
    ) {
        let cfg = LayoutConfig::default();
        let a = serde_json::to_string(&timeline::layout(&issues, &comms, now, &cfg)).unwrap();
        let b = serde_json::to_string(&timeline::layout(&issues, &comms, now, &cfg)).unwrap();
        prop_assert_eq!(a, b);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Domain inclusion
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn domain_contains_all_inputs_and_now(
        issues in issues_strategy(),
        comms in comms_strategy(),
        now in now_strategy(),
    ) {
        let out = timeline::layout(&issues, &comms, now, &LayoutConfig::default());
        let TimelineLayout::Chart(chart) = out else {
            prop_assert!(issues.is_empty() && comms.is_empty());
            return Ok(());
        };
        let d = chart.domain;
        prop_assert!(d.start < d.end);
        prop_assert!(d.contains(now), "now {} outside {:?}", now, d);
        for t in issues.iter().map(|i| &i.first_noticed_at).chain(comms.iter().map(|c| &c.date)) {
            let t = timeline::parse_timestamp(t).unwrap();
            prop_assert!(d.contains(t), "{} outside {:?}", t, d);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Marker fan-out
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn markers_match_resolvable_links(
        issues in issues_strategy(),
        comms in comms_strategy(),
        now in now_strategy(),
    ) {
        let out = timeline::layout(&issues, &comms, now, &LayoutConfig::default());
        let Some(chart) = out.chart() else { return Ok(()); };

        for comm in &comms {
            let markers: Vec<_> = chart
                .markers()
                .filter(|m| m.communication_id == comm.id)
                .collect();
            if comm.linked_issue_ids.is_empty() {
                prop_assert_eq!(markers.len(), 1);
                prop_assert_eq!(&markers[0].lane, &MarkerLane::General);
            } else {
                let mut expected: Vec<&str> = comm
                    .linked_issue_ids
                    .iter()
                    .map(String::as_str)
                    .filter(|id| issues.iter().any(|i| i.id == *id))
                    .collect();
                expected.sort_unstable();
                expected.dedup();
                prop_assert_eq!(markers.len(), expected.len());
                for m in markers {
                    let MarkerLane::Issue { row, issue_id } = &m.lane else {
                        return Err(TestCaseError::fail("linked marker in general lane"));
                    };
                    prop_assert_eq!(&chart.rows[*row].issue_id, issue_id);
                }
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Minimum bar width
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn bars_respect_minimum_width(
        issues in issues_strategy(),
        now in now_strategy(),
    ) {
        let cfg = LayoutConfig::default();
        let out = timeline::layout(&issues, &[], now, &cfg);
        let Some(chart) = out.chart() else { return Ok(()); };
        prop_assert_eq!(chart.rows.len(), issues.len());
        for row in &chart.rows {
            prop_assert!(row.bar.width >= cfg.width * cfg.min_bar_fraction - 0.01);
            prop_assert!(row.bar.start <= row.bar.end);
            prop_assert!(row.bar.start == now || row.bar.end == now);
        }
    }
}
