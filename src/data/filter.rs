use chrono::NaiveDate;

use super::model::{Dataset, Value};

// ---------------------------------------------------------------------------
// Date-range predicate over the timestamp column
// ---------------------------------------------------------------------------

/// Inclusive calendar-day window. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Window spanning every timestamp in the column, or open if there are none.
    pub fn covering(dataset: &Dataset, column: &str) -> Self {
        let dates = dataset
            .column(column)
            .into_iter()
            .flat_map(|c| c.values.iter())
            .filter_map(Value::as_timestamp)
            .map(|t| t.date());
        let (start, end) = dates.fold((None, None), |(lo, hi): (Option<NaiveDate>, Option<NaiveDate>), d| {
            (
                Some(lo.map_or(d, |x| x.min(d))),
                Some(hi.map_or(d, |x| x.max(d))),
            )
        });
        DateRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Return indices of rows whose timestamp falls inside `range`.
///
/// * An open range keeps every row, including rows without a timestamp.
/// * Otherwise rows with a missing timestamp are dropped.
/// * A dataset without the column is never filtered.
pub fn filtered_indices(dataset: &Dataset, column: &str, range: &DateRange) -> Vec<usize> {
    let Some(col) = dataset.column(column) else {
        return (0..dataset.len()).collect();
    };
    if range.is_open() {
        return (0..dataset.len()).collect();
    }
    col.values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.as_timestamp().is_some_and(|t| range.contains(t.date())))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn ds() -> Dataset {
        Dataset::new(vec![Column::new(
            "Timestamp",
            vec![
                Value::parse_timestamp("2021-08-09 10:00"),
                Value::parse_timestamp("2021-08-10 10:00"),
                Value::Null,
                Value::parse_timestamp("2021-08-12 10:00"),
            ],
        )])
        .unwrap()
    }

    #[test]
    fn covering_spans_all_dates() {
        let r = DateRange::covering(&ds(), "Timestamp");
        assert_eq!(r.start, NaiveDate::from_ymd_opt(2021, 8, 9));
        assert_eq!(r.end, NaiveDate::from_ymd_opt(2021, 8, 12));
    }

    #[test]
    fn bounded_range_drops_outside_and_missing() {
        let r = DateRange {
            start: NaiveDate::from_ymd_opt(2021, 8, 10),
            end: None,
        };
        assert_eq!(filtered_indices(&ds(), "Timestamp", &r), vec![1, 3]);
    }

    #[test]
    fn open_range_keeps_everything() {
        assert_eq!(
            filtered_indices(&ds(), "Timestamp", &DateRange::default()),
            vec![0, 1, 2, 3]
        );
    }
}
