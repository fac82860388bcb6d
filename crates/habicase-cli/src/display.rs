//! Text rendering for the terminal: the case card and the timeline chart.

use std::fmt;

use habicase_core::timeline::{ChartLayout, Marker, truncate};
use habicase_core::{Case, Severity, TimelineLayout};

const MAX_LIST_ITEMS: usize = 10;
const LABEL_WIDTH: usize = 26;

// ── Case card ──

/// The whole case as a vertical card grouped by section.
pub struct CaseCard<'a>(pub &'a Case);

impl fmt::Display for CaseCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_case_card(f, self.0)
    }
}

fn write_case_card(f: &mut fmt::Formatter<'_>, case: &Case) -> fmt::Result {
    let md = &case.metadata;

    let title = if md.property_address.is_empty() {
        "(no address)"
    } else {
        &md.property_address
    };
    writeln!(f, "=== {title} ===")?;
    if !md.id.is_empty() {
        writeln!(f, "{}", md.id)?;
    }
    writeln!(f)?;

    let contact = &md.landlord_contact;
    section(
        f,
        "Landlord",
        &[
            ("name", &contact.name),
            ("phone", &contact.phone),
            ("email", &contact.email),
            ("other", &contact.other),
        ],
    )?;
    section(
        f,
        "Lease",
        &[
            ("start_date", &md.lease.start_date),
            ("end_date", &md.lease.end_date),
        ],
    )?;

    if !case.issues.is_empty() {
        writeln!(f, "Issues ({})", case.issues.len())?;
        for issue in &case.issues {
            writeln!(
                f,
                "  {:<LABEL_WIDTH$} {} [{} / {}]",
                truncate(&issue.title, 25, 22),
                issue.id,
                issue.severity,
                issue.status
            )?;
            writeln!(
                f,
                "    {} · {} · since {}",
                issue.category, issue.room, issue.first_noticed_at
            )?;
            if !issue.habitability_categories.is_empty() {
                writeln!(f, "    tags: {}", issue.habitability_categories.join(", "))?;
            }
            for (i, item) in case.evidence_for(&issue.id).enumerate() {
                if i == MAX_LIST_ITEMS {
                    let more = case.evidence_for(&issue.id).count() - MAX_LIST_ITEMS;
                    writeln!(f, "    ... and {more} more")?;
                    break;
                }
                let caption = match item.display_caption() {
                    "" => "(no caption)",
                    c => c,
                };
                writeln!(f, "    photo {}: {}", item.id, caption)?;
            }
        }
        writeln!(f)?;
    }

    if !case.communications.is_empty() {
        writeln!(f, "Communications ({})", case.communications.len())?;
        for comm in &case.communications {
            let links = if comm.is_general() {
                "general".to_string()
            } else {
                comm.linked_issue_ids
                    .iter()
                    .map(|id| match case.issue(id) {
                        Some(issue) => truncate(&issue.title, 25, 22),
                        None => format!("{id} (missing)"),
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            writeln!(
                f,
                "  {:<LABEL_WIDTH$} {} → {}",
                comm.date, comm.method, links
            )?;
            writeln!(f, "    tenant:   {}", truncate(&comm.tenant_message, 60, 57))?;
            if comm.has_response() {
                writeln!(
                    f,
                    "    landlord: {}",
                    truncate(&comm.landlord_response, 60, 57)
                )?;
            }
            for p in &comm.promises {
                let due = if p.promised_completion_date.is_empty() {
                    "no date".to_string()
                } else {
                    format!("by {}", p.promised_completion_date)
                };
                writeln!(
                    f,
                    "    promise:  {} ({due}, {}, {})",
                    p.description, p.promised_by, p.status
                )?;
            }
        }
        writeln!(f)?;
    }

    if case.is_empty() {
        writeln!(f, "(empty case)")?;
    }
    Ok(())
}

fn section(f: &mut fmt::Formatter<'_>, header: &str, fields: &[(&str, &String)]) -> fmt::Result {
    if fields.iter().all(|(_, v)| v.is_empty()) {
        return Ok(());
    }
    writeln!(f, "{header}")?;
    for (name, value) in fields {
        if !value.is_empty() {
            writeln!(f, "  {name:<LABEL_WIDTH$} {value}")?;
        }
    }
    writeln!(f)
}

// ── Timeline ──

/// A computed layout drawn as a character chart `cols` columns wide.
///
/// Bars use a glyph per severity; markers are `o` (no response) or `*`
/// (landlord responded). A marker legend follows the chart.
pub struct TimelineChart<'a> {
    pub layout: &'a TimelineLayout,
    pub cols: usize,
}

impl fmt::Display for TimelineChart<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.layout.chart() {
            Some(chart) => write_chart(f, chart, self.cols.max(10)),
            None => writeln!(f, "No issues or communications yet."),
        }
    }
}

fn write_chart(f: &mut fmt::Formatter<'_>, chart: &ChartLayout, cols: usize) -> fmt::Result {
    let grid = Grid { chart, cols };

    writeln!(
        f,
        "{} → {}  (ticks every {} day{})",
        chart.domain.start.format("%Y-%m-%d"),
        chart.domain.end.format("%Y-%m-%d"),
        chart.domain.step_days,
        if chart.domain.step_days == 1 { "" } else { "s" }
    )?;

    let (labels, axis) = grid.axis();
    writeln!(f, "{:<LABEL_WIDTH$} {labels}", "")?;
    writeln!(f, "{:<LABEL_WIDTH$} {axis}", "")?;

    let mut lane = vec![' '; cols];
    grid.put_markers(&mut lane, &chart.general_lane.markers);
    writeln!(
        f,
        "{:<LABEL_WIDTH$} {}",
        "(general)",
        lane.iter().collect::<String>()
    )?;

    for row in &chart.rows {
        let mut line = vec![' '; cols];
        let from = grid.col(row.bar.x);
        let to = grid.col(row.bar.x + row.bar.width);
        for cell in &mut line[from..=to.max(from)] {
            *cell = severity_glyph(row.bar.severity);
        }
        grid.put_markers(&mut line, &row.markers);
        writeln!(
            f,
            "{:<LABEL_WIDTH$} {}",
            row.label,
            line.iter().collect::<String>()
        )?;
    }

    let now_col = grid.col(grid.x_of(chart.now));
    writeln!(f, "{:<LABEL_WIDTH$} {}^ now", "", " ".repeat(now_col))?;

    let markers: Vec<&Marker> = chart.markers().collect();
    if !markers.is_empty() {
        writeln!(f)?;
        for m in markers {
            let where_ = match &m.lane {
                habicase_core::timeline::MarkerLane::General => "general".to_string(),
                habicase_core::timeline::MarkerLane::Issue { row, .. } => {
                    chart.rows[*row].label.clone()
                }
            };
            let promises = match m.promise_count {
                0 => String::new(),
                1 => " [1 promise]".to_string(),
                n => format!(" [{n} promises]"),
            };
            writeln!(
                f,
                "  {} {} {:<9} {:<24} {}{}",
                if m.has_response { '*' } else { 'o' },
                m.date.format("%Y-%m-%d"),
                m.method.as_str(),
                where_,
                m.preview,
                promises
            )?;
        }
    }

    if !chart.undated_issue_ids.is_empty() {
        writeln!(
            f,
            "\nUnreadable dates (shown at now): {}",
            chart.undated_issue_ids.join(", ")
        )?;
    }
    if !chart.undated_communication_ids.is_empty() {
        writeln!(
            f,
            "Communications not shown (unreadable date): {}",
            chart.undated_communication_ids.join(", ")
        )?;
    }
    Ok(())
}

fn severity_glyph(severity: Severity) -> char {
    match severity {
        Severity::Low => '-',
        Severity::Medium => '=',
        Severity::High => '#',
        Severity::Emergency => '!',
    }
}

/// Maps layout x positions onto character columns.
struct Grid<'a> {
    chart: &'a ChartLayout,
    cols: usize,
}

impl Grid<'_> {
    fn col(&self, x: f64) -> usize {
        let plot = &self.chart.plot;
        let frac = ((x - plot.x) / plot.width).clamp(0.0, 1.0);
        (frac * (self.cols - 1) as f64).round() as usize
    }

    fn x_of(&self, t: chrono::DateTime<chrono::Utc>) -> f64 {
        let d = &self.chart.domain;
        let span = (d.end - d.start).num_seconds().max(1) as f64;
        let frac = (t - d.start).num_seconds() as f64 / span;
        self.chart.plot.x + frac * self.chart.plot.width
    }

    fn put_markers(&self, line: &mut [char], markers: &[Marker]) {
        for m in markers {
            let c = self.col(m.x);
            // A responded marker wins a shared cell.
            if line[c] != '*' {
                line[c] = if m.has_response { '*' } else { 'o' };
            }
        }
    }

    /// Tick label line and axis line. Labels that would collide are dropped.
    fn axis(&self) -> (String, String) {
        let mut labels = vec![' '; self.cols];
        let mut axis = vec!['-'; self.cols];
        let mut free_from = 0;
        for tick in &self.chart.ticks {
            let c = self.col(tick.x);
            axis[c] = '+';
            let label: Vec<char> = tick.label.chars().collect();
            if c >= free_from && c + label.len() <= self.cols {
                labels[c..c + label.len()].copy_from_slice(&label);
                free_from = c + label.len() + 1;
            }
        }
        (
            labels.into_iter().collect::<String>().trim_end().to_string(),
            axis.into_iter().collect(),
        )
    }
}
