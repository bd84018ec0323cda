//! Filtered, sorted and paginated projection of a fleet snapshot.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::models::VesselRecord;

pub const PAGE_SIZE: usize = 20;

/// Column the table is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Mmsi,
    Name,
    Latitude,
    Longitude,
    ReportTime,
    Category,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mmsi" | "id" => Ok(Self::Mmsi),
            "name" => Ok(Self::Name),
            "lat" | "latitude" => Ok(Self::Latitude),
            "lon" | "longitude" => Ok(Self::Longitude),
            "time" | "msgtime" => Ok(Self::ReportTime),
            "type" | "shiptype" | "category" => Ok(Self::Category),
            other => Err(format!("Unknown column '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Presentation state owned by the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub query: String,
    pub sort_key: SortKey,
    pub direction: SortDirection,
    /// 1-based
    pub page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            query: String::new(),
            sort_key: SortKey::default(),
            direction: SortDirection::default(),
            page: 1,
        }
    }
}

impl ViewState {
    /// Sort by `key`; selecting the current key again flips the direction
    pub fn toggle_sort(&mut self, key: SortKey) {
        if key == self.sort_key {
            self.direction = self.direction.flipped();
        } else {
            self.sort_key = key;
            self.direction = SortDirection::Ascending;
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.page = 1;
    }

    pub fn next_page(&mut self, page_count: usize) {
        self.page = (self.page + 1).min(page_count.max(1));
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    /// Pull the page back into range after the data shrank
    pub fn clamp_page(&mut self, page_count: usize) {
        self.page = self.page.clamp(1, page_count.max(1));
    }
}

/// One page of the table
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel<'a> {
    pub rows: Vec<&'a VesselRecord>,
    pub page: usize,
    pub page_count: usize,
    /// Number of records matching the query
    pub total: usize,
}

impl ViewModel<'_> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }
}

/// Build the page described by `state` from `vessels`.
///
/// The page number is used as given; keeping it in range is the caller's job.
pub fn build<'a>(vessels: &'a [VesselRecord], state: &ViewState) -> ViewModel<'a> {
    let mut rows = filter(vessels, &state.query);
    sort(&mut rows, state.sort_key, state.direction);

    let total = rows.len();
    let start = state.page.saturating_sub(1).saturating_mul(PAGE_SIZE);
    let rows = rows.into_iter().skip(start).take(PAGE_SIZE).collect();

    ViewModel {
        rows,
        page: state.page,
        page_count: page_count(total),
        total,
    }
}

pub fn page_count(total: usize) -> usize {
    total.div_ceil(PAGE_SIZE).max(1)
}

/// Records whose name contains `query` (ignoring case) or whose MMSI
/// contains it
pub fn filter<'a>(vessels: &'a [VesselRecord], query: &str) -> Vec<&'a VesselRecord> {
    let query = query.to_lowercase();
    vessels
        .iter()
        .filter(|v| {
            query.is_empty()
                || v.mmsi.to_string().contains(&query)
                || v
                    .name
                    .as_ref()
                    .is_some_and(|name| name.to_lowercase().contains(&query))
        })
        .collect()
}

/// Stable sort; ties keep their input order in both directions
pub fn sort(rows: &mut [&VesselRecord], key: SortKey, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let ordering = compare(a, b, key);
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

fn compare(a: &VesselRecord, b: &VesselRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Mmsi => a.mmsi.cmp(&b.mmsi),
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Latitude => compare_f64(a.latitude, b.latitude),
        SortKey::Longitude => compare_f64(a.longitude, b.longitude),
        SortKey::ReportTime => a.report_time.cmp(&b.report_time),
        SortKey::Category => a.category.cmp(&b.category),
    }
}

// Absent values first, like Option's own ordering
fn compare_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}
