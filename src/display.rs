//! Plain-text rendering of the fleet table

use std::collections::HashSet;
use std::fmt::Write;

use crate::{
    models::{category_description, Mmsi, VesselRecord},
    tracker::FleetState,
    view::{SortDirection, SortKey, ViewModel, ViewState},
};

const COLUMNS: [(SortKey, &str, usize); 6] = [
    (SortKey::Mmsi, "MMSI", 10),
    (SortKey::Name, "Name", 22),
    (SortKey::Latitude, "Latitude", 10),
    (SortKey::Longitude, "Longitude", 10),
    (SortKey::ReportTime, "MsgTime", 20),
    (SortKey::Category, "ShipType", 18),
];

/// Header line: last update, new-vessel badge and loading marker
pub fn status_line(state: &FleetState) -> String {
    let mut line = String::from("AIS watch");
    if let Some(snapshot) = &state.snapshot {
        let _ = write!(line, " | Last updated: {}", snapshot.last_updated());
    }
    if !state.new_vessels.is_empty() {
        let _ = write!(line, " | New vessels: {}", state.new_vessels.len());
    }
    if state.is_loading {
        line.push_str(" | Loading...");
    }
    line
}

/// Inline banner for a failed fetch
pub fn error_banner(state: &FleetState) -> Option<String> {
    state.error.as_ref().map(|e| format!("!! {}", e))
}

/// Render one page. Rows of vessels in `new_vessels` are marked with `*`.
pub fn render_table(
    view: &ViewModel<'_>,
    state: &ViewState,
    new_vessels: &[VesselRecord],
) -> String {
    let new_ids: HashSet<Mmsi> = new_vessels.iter().map(|v| v.mmsi).collect();
    let mut out = String::from("  ");

    for (key, title, width) in COLUMNS {
        let marker = match (key == state.sort_key, state.direction) {
            (false, _) => "",
            (true, SortDirection::Ascending) => " ^",
            (true, SortDirection::Descending) => " v",
        };
        let _ = write!(out, "{:<width$} ", format!("{}{}", title, marker), width = width);
    }
    out.truncate(out.trim_end().len());
    out.push('\n');

    for vessel in &view.rows {
        out.push_str(if new_ids.contains(&vessel.mmsi) { "* " } else { "  " });
        out.push_str(&render_row(vessel));
        out.push('\n');
    }

    let _ = write!(
        out,
        "{}Page {} of {} ({} vessels){}",
        if view.has_prev() { "< " } else { "" },
        view.page,
        view.page_count,
        view.total,
        if view.has_next() { " >" } else { "" },
    );
    out
}

fn render_row(vessel: &VesselRecord) -> String {
    let cells = [
        vessel.mmsi.to_string(),
        vessel.name.clone().unwrap_or_default(),
        vessel.latitude.map(|v| format!("{:.5}", v)).unwrap_or_default(),
        vessel.longitude.map(|v| format!("{:.5}", v)).unwrap_or_default(),
        vessel
            .report_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        category_description(vessel.category).to_string(),
    ];

    let mut row = String::new();
    for (cell, (_, _, width)) in cells.iter().zip(COLUMNS) {
        let _ = write!(row, "{:<width$} ", cell, width = width);
    }
    row.truncate(row.trim_end().len());
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FleetSnapshot;
    use crate::view;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    #[test]
    fn status_with_new_vessels() {
        let captured_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let state = FleetState {
            snapshot: Some(Arc::new(FleetSnapshot::new(Vec::new(), captured_at))),
            new_vessels: Arc::new(vec![VesselRecord::new(Mmsi::try_from(1u32).unwrap())]),
            error: Some("HTTP 503".to_string()),
            is_loading: false,
        };

        assert_eq!(
            status_line(&state),
            "AIS watch | Last updated: 2024-05-01 12:00:00 UTC | New vessels: 1"
        );
        assert_eq!(error_banner(&state).as_deref(), Some("!! HTTP 503"));
    }

    fn vessel(id: u32, name: &str, category: u16) -> VesselRecord {
        let mut vessel = VesselRecord::new(Mmsi::try_from(id).unwrap());
        vessel.name = Some(name.to_string());
        vessel.category = Some(category);
        vessel
    }

    #[test]
    fn table_rows_and_footer() {
        let vessels = vec![vessel(257123450, "RAUMA", 30)];

        let state = ViewState::default();
        let text = render_table(&view::build(&vessels, &state), &state, &[]);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("  MMSI ^"));
        assert!(lines[1].starts_with("  257123450  RAUMA"));
        assert!(lines[1].ends_with("Fishing"));
        assert_eq!(lines[2], "Page 1 of 1 (1 vessels)");
    }

    #[test]
    fn new_vessels_are_marked() {
        let vessels = vec![vessel(257000001, "ALPHA", 70), vessel(257000002, "BRAVO", 70)];
        let new_vessels = vec![vessels[1].clone()];

        let state = ViewState::default();
        let text = render_table(&view::build(&vessels, &state), &state, &new_vessels);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[1].starts_with("  257000001"));
        assert!(lines[2].starts_with("* 257000002"));
    }
}
