//! Timeline layout: issues and communications on one shared time axis.
//!
//! [`layout`] is a pure function. It computes geometry and labels only; a
//! separate draw step (SVG, terminal, ...) consumes the [`TimelineLayout`].
//!
//! # Algorithm
//!
//! 1. One row per issue, in the order supplied. No issues and no
//!    communications → [`TimelineLayout::Empty`].
//! 2. Domain: min/max over every issue's `first_noticed_at`, every
//!    communication's `date`, and `now`. The domain is widened to whole days
//!    on an evenly spaced tick step taken from [`STEP_LADDER_DAYS`]; steps
//!    that are whole weeks start on a Monday.
//! 3. Each row's bar runs from `first_noticed_at` to `now`, whatever the
//!    issue's status. Bars never get narrower than
//!    [`LayoutConfig::min_bar_fraction`] of the plot width.
//! 4. A communication linked to issues puts one marker on each linked row
//!    that exists; unknown ids are skipped. An unlinked communication puts a
//!    single marker on the general lane above the rows.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::model::{Communication, ContactMethod, Issue, IssueStatus, Severity};

const SECS_PER_DAY: i64 = 86_400;

/// 1970-01-05, the first Monday after the Unix epoch, as a day number.
const MONDAY_ANCHOR_DAY: i64 = 4;

/// Candidate tick steps in days, smallest first. Beyond the last entry the
/// step grows in whole multiples of it.
pub const STEP_LADDER_DAYS: [i64; 9] = [1, 2, 7, 14, 28, 56, 91, 182, 364];

/// Space reserved around the plot area, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Layout constants. The defaults match a typical 960px-wide chart.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Width of the plot area (excluding margins).
    pub width: f64,
    pub margin: Margin,
    pub row_height: f64,
    pub general_lane_height: f64,
    pub bar_height: f64,
    /// Minimum bar width as a fraction of `width`.
    pub min_bar_fraction: f64,
    /// Row labels longer than this many characters are truncated...
    pub label_max_chars: usize,
    /// ...to this many characters plus an ellipsis.
    pub label_keep_chars: usize,
    pub preview_max_chars: usize,
    pub preview_keep_chars: usize,
    /// Upper bound on tick intervals before the next ladder step is used.
    pub max_ticks: usize,
    /// Height reported by [`TimelineLayout::Empty`].
    pub empty_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 760.0,
            margin: Margin {
                top: 20.0,
                right: 20.0,
                bottom: 30.0,
                left: 180.0,
            },
            row_height: 36.0,
            general_lane_height: 36.0,
            bar_height: 18.0,
            min_bar_fraction: 0.005,
            label_max_chars: 25,
            label_keep_chars: 22,
            preview_max_chars: 60,
            preview_keep_chars: 57,
            max_ticks: 10,
            empty_height: 120.0,
        }
    }
}

/// Computed layout, ready for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineLayout {
    /// Nothing to draw; the renderer shows a placeholder of this height.
    Empty { height: f64 },
    Chart(ChartLayout),
}

impl TimelineLayout {
    pub fn height(&self) -> f64 {
        match self {
            Self::Empty { height } => *height,
            Self::Chart(chart) => chart.height,
        }
    }

    pub fn chart(&self) -> Option<&ChartLayout> {
        match self {
            Self::Empty { .. } => None,
            Self::Chart(chart) => Some(chart),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLayout {
    /// Total width including margins.
    pub width: f64,
    /// Total height including margins.
    pub height: f64,
    pub plot: Rect,
    pub now: DateTime<Utc>,
    pub domain: TimeDomain,
    pub ticks: Vec<Tick>,
    pub general_lane: GeneralLane,
    pub rows: Vec<Row>,
    /// Issues whose `first_noticed_at` could not be read; their bars sit at `now`.
    pub undated_issue_ids: Vec<String>,
    /// Communications whose `date` could not be read; they have no markers.
    pub undated_communication_ids: Vec<String>,
}

impl ChartLayout {
    /// Every marker, general lane first, then row by row.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.general_lane
            .markers
            .iter()
            .chain(self.rows.iter().flat_map(|r| r.markers.iter()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The niced time domain of the x axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeDomain {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step_days: i64,
}

impl TimeDomain {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub at: DateTime<Utc>,
    pub x: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralLane {
    pub y: f64,
    pub height: f64,
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub index: usize,
    pub issue_id: String,
    /// Title, truncated for the axis.
    pub label: String,
    pub title: String,
    pub y: f64,
    pub height: f64,
    pub bar: Bar,
    pub markers: Vec<Marker>,
}

/// An issue's span. `start <= end` always holds: a `first_noticed_at` after
/// `now` becomes the end, with `now` as the start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub severity: Severity,
    pub status: IssueStatus,
    pub category: String,
    pub room: String,
}

/// Where a marker sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "lane", rename_all = "snake_case")]
pub enum MarkerLane {
    General,
    Issue { row: usize, issue_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub communication_id: String,
    pub lane: MarkerLane,
    pub date: DateTime<Utc>,
    pub x: f64,
    /// Vertical centre of the lane.
    pub y: f64,
    pub method: ContactMethod,
    pub preview: String,
    pub has_response: bool,
    pub promise_count: usize,
}

/// Compute the layout for one case's issues and communications.
pub fn layout(
    issues: &[Issue],
    communications: &[Communication],
    now: DateTime<Utc>,
    config: &LayoutConfig,
) -> TimelineLayout {
    if issues.is_empty() && communications.is_empty() {
        return TimelineLayout::Empty {
            height: config.empty_height,
        };
    }

    let issue_times: Vec<Option<DateTime<Utc>>> = issues
        .iter()
        .map(|i| parse_timestamp(&i.first_noticed_at))
        .collect();
    let comm_times: Vec<Option<DateTime<Utc>>> = communications
        .iter()
        .map(|c| parse_timestamp(&c.date))
        .collect();

    let domain = nice_domain(
        issue_times.iter().chain(comm_times.iter()).flatten().copied(),
        now,
        config.max_ticks,
    );

    let plot = Rect {
        x: config.margin.left,
        y: config.margin.top,
        width: config.width,
        height: config.general_lane_height + issues.len() as f64 * config.row_height,
    };
    let scale = Scale::new(&domain, &plot);

    let ticks = tick_days(&domain)
        .filter_map(day_start)
        .map(|at| Tick {
            at,
            x: scale.x(at),
            label: tick_label(at, domain.step_days),
        })
        .collect();

    let general_lane_y = plot.y;
    let mut rows: Vec<Row> = issues
        .iter()
        .zip(&issue_times)
        .enumerate()
        .map(|(index, (issue, start))| {
            let y = plot.y + config.general_lane_height + index as f64 * config.row_height;
            let start = start.unwrap_or(now);
            Row {
                index,
                issue_id: issue.id.clone(),
                label: truncate(&issue.title, config.label_max_chars, config.label_keep_chars),
                title: issue.title.clone(),
                y,
                height: config.row_height,
                bar: bar_for(issue, start, now, y, &scale, config),
                markers: Vec::new(),
            }
        })
        .collect();

    // First row wins when ids repeat.
    let mut row_of: HashMap<&str, usize> = HashMap::with_capacity(issues.len());
    for (i, issue) in issues.iter().enumerate() {
        row_of.entry(issue.id.as_str()).or_insert(i);
    }

    let mut general_markers = Vec::new();
    for (comm, date) in communications.iter().zip(&comm_times) {
        let Some(date) = *date else { continue };
        let marker = |lane: MarkerLane, lane_y: f64, lane_height: f64| Marker {
            communication_id: comm.id.clone(),
            lane,
            date,
            x: scale.x(date),
            y: round2(lane_y + lane_height / 2.0),
            method: comm.method,
            preview: truncate(
                &comm.tenant_message,
                config.preview_max_chars,
                config.preview_keep_chars,
            ),
            has_response: comm.has_response(),
            promise_count: comm.promises.len(),
        };

        if comm.is_general() {
            general_markers.push(marker(
                MarkerLane::General,
                general_lane_y,
                config.general_lane_height,
            ));
            continue;
        }

        let mut seen = HashSet::new();
        for id in &comm.linked_issue_ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let Some(&row) = row_of.get(id.as_str()) else {
                continue;
            };
            let lane = MarkerLane::Issue {
                row,
                issue_id: id.clone(),
            };
            let m = marker(lane, rows[row].y, config.row_height);
            rows[row].markers.push(m);
        }
    }

    let undated_issue_ids = issues
        .iter()
        .zip(&issue_times)
        .filter(|(_, t)| t.is_none())
        .map(|(i, _)| i.id.clone())
        .collect();
    let undated_communication_ids = communications
        .iter()
        .zip(&comm_times)
        .filter(|(_, t)| t.is_none())
        .map(|(c, _)| c.id.clone())
        .collect();

    TimelineLayout::Chart(ChartLayout {
        width: config.margin.left + config.width + config.margin.right,
        height: config.margin.top + plot.height + config.margin.bottom,
        plot,
        now,
        domain,
        ticks,
        general_lane: GeneralLane {
            y: general_lane_y,
            height: config.general_lane_height,
            markers: general_markers,
        },
        rows,
        undated_issue_ids,
        undated_communication_ids,
    })
}

fn bar_for(
    issue: &Issue,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    row_y: f64,
    scale: &Scale,
    config: &LayoutConfig,
) -> Bar {
    let (start, end) = (start.min(now), start.max(now));
    let (left, right) = (scale.x(start), scale.x(end));
    let min_width = config.width * config.min_bar_fraction;
    Bar {
        start,
        end,
        x: left,
        y: round2(row_y + (config.row_height - config.bar_height) / 2.0),
        width: round2((right - left).max(min_width)),
        height: config.bar_height,
        severity: issue.severity,
        status: issue.status,
        category: issue.category.clone(),
        room: issue.room.clone(),
    }
}

// ── Time domain ──

/// Linear map from the time domain onto the plot's x range.
struct Scale {
    start: i64,
    span: f64,
    x0: f64,
    width: f64,
}

impl Scale {
    fn new(domain: &TimeDomain, plot: &Rect) -> Self {
        let start = domain.start.timestamp();
        let span = (domain.end.timestamp() - start).max(1) as f64;
        Self {
            start,
            span,
            x0: plot.x,
            width: plot.width,
        }
    }

    fn x(&self, t: DateTime<Utc>) -> f64 {
        round2(self.x0 + (t.timestamp() - self.start) as f64 / self.span * self.width)
    }
}

/// Widen `[min(ts, now), max(ts, now)]` to whole days on an even tick step.
fn nice_domain(
    timestamps: impl Iterator<Item = DateTime<Utc>>,
    now: DateTime<Utc>,
    max_ticks: usize,
) -> TimeDomain {
    let (lo, hi) = timestamps.fold((now, now), |(lo, hi), t| (lo.min(t), hi.max(t)));

    let lo_day = lo.timestamp().div_euclid(SECS_PER_DAY);
    // Round a fractional second up so the end never falls short of `hi`.
    let hi_secs = hi.timestamp() + i64::from(hi.timestamp_subsec_nanos() > 0);
    let hi_day = -(-hi_secs).div_euclid(SECS_PER_DAY);
    let step = choose_step(hi_day - lo_day, max_ticks);

    let start_day = align_down(lo_day, step);
    let mut end_day = align_up(hi_day, step);
    if end_day <= start_day {
        end_day = start_day + step;
    }

    TimeDomain {
        start: day_start(start_day).unwrap_or(lo),
        end: day_start(end_day).unwrap_or(hi),
        step_days: step,
    }
}

fn choose_step(span_days: i64, max_ticks: usize) -> i64 {
    let span = span_days.max(1);
    let max_ticks = max_ticks.max(1) as i64;
    STEP_LADDER_DAYS
        .iter()
        .copied()
        .find(|step| (span + step - 1) / step <= max_ticks)
        .unwrap_or_else(|| {
            let year = STEP_LADDER_DAYS[STEP_LADDER_DAYS.len() - 1];
            let years = (span + year * max_ticks - 1) / (year * max_ticks);
            year * years
        })
}

fn anchor_for(step: i64) -> i64 {
    if step % 7 == 0 { MONDAY_ANCHOR_DAY } else { 0 }
}

fn align_down(day: i64, step: i64) -> i64 {
    day - (day - anchor_for(step)).rem_euclid(step)
}

fn align_up(day: i64, step: i64) -> i64 {
    let down = align_down(day, step);
    if down == day { day } else { down + step }
}

fn tick_days(domain: &TimeDomain) -> impl Iterator<Item = i64> {
    let start = domain.start.timestamp().div_euclid(SECS_PER_DAY);
    let end = domain.end.timestamp().div_euclid(SECS_PER_DAY);
    let step = domain.step_days.max(1) as usize;
    (start..=end).step_by(step)
}

fn day_start(day: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(day.checked_mul(SECS_PER_DAY)?, 0)
}

fn tick_label(at: DateTime<Utc>, step_days: i64) -> String {
    if step_days >= 28 {
        at.format("%b %Y").to_string()
    } else {
        at.format("%b %-d").to_string()
    }
}

/// Read a date or date-time string. Bare dates are midnight UTC.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]`, `YYYY-MM-DD HH:MM[:SS]` and
/// `YYYY-MM-DD`. Anything else yields `None`.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Shorten `s` to `keep` characters plus `...` when it exceeds `max` characters.
pub fn truncate(s: &str, max: usize, keep: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(keep).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
