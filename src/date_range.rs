// Booking date range selection
// Turns calendar gestures into an ordered check-in/check-out pair, never earlier than today

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("{date} is before the first selectable day {today}")]
    BeforeToday { date: NaiveDate, today: NaiveDate },
}

// A possibly partial stay. Once both ends are set, check_out > check_in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
}

impl DateRange {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.check_in.is_none() && self.check_out.is_none()
    }

    pub fn is_complete(&self) -> bool {
        matches!((self.check_in, self.check_out), (Some(from), Some(to)) if to > from)
    }

    // Both endpoints, but only for a range that satisfies the ordering invariant
    pub fn complete(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.check_in, self.check_out) {
            (Some(from), Some(to)) if to > from => Some((from, to)),
            _ => None,
        }
    }

    pub fn nights(&self) -> Option<u32> {
        self.complete()
            .and_then(|(from, to)| u32::try_from((to - from).num_days()).ok())
    }
}

// What the calendar widget hands us for one interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeCandidate {
    Day(NaiveDate),
    Span { from: NaiveDate, to: NaiveDate },
}

#[derive(Debug, Clone)]
pub struct DateRangeSelector {
    today: NaiveDate,
    range: DateRange,
}

impl DateRangeSelector {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            range: DateRange::empty(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn is_selectable(&self, day: NaiveDate) -> bool {
        day >= self.today
    }

    pub fn select_range(&mut self, candidate: RangeCandidate) -> Result<DateRange, SelectionError> {
        let next = match candidate {
            RangeCandidate::Day(day) => {
                self.ensure_selectable(day)?;
                match (self.range.check_in, self.range.check_out) {
                    // second click of a two-click gesture closes the range
                    (Some(from), None) if day > from => DateRange {
                        check_in: Some(from),
                        check_out: Some(day),
                    },
                    _ => DateRange {
                        check_in: Some(day),
                        check_out: None,
                    },
                }
            }
            RangeCandidate::Span { from, to } => {
                self.ensure_selectable(from)?;
                self.ensure_selectable(to)?;
                if from < to {
                    DateRange {
                        check_in: Some(from),
                        check_out: Some(to),
                    }
                } else if from > to {
                    DateRange {
                        check_in: Some(to),
                        check_out: Some(from),
                    }
                } else {
                    DateRange {
                        check_in: Some(from),
                        check_out: None,
                    }
                }
            }
        };

        debug!(?candidate, check_in = ?next.check_in, check_out = ?next.check_out, "date range selected");
        self.range = next;
        Ok(next)
    }

    pub fn clear(&mut self) -> DateRange {
        self.range = DateRange::empty();
        self.range
    }

    fn ensure_selectable(&self, date: NaiveDate) -> Result<(), SelectionError> {
        if self.is_selectable(date) {
            Ok(())
        } else {
            Err(SelectionError::BeforeToday {
                date,
                today: self.today,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_today_is_selectable_but_yesterday_is_not() {
        let mut selector = DateRangeSelector::new(day(10));

        assert!(selector.select_range(RangeCandidate::Day(day(10))).is_ok());

        let err = selector
            .select_range(RangeCandidate::Day(day(9)))
            .unwrap_err();
        assert_eq!(
            err,
            SelectionError::BeforeToday {
                date: day(9),
                today: day(10)
            }
        );
        // rejected gesture leaves the previous selection alone
        assert_eq!(selector.range().check_in, Some(day(10)));
    }

    #[test]
    fn test_two_clicks_build_a_range() {
        let mut selector = DateRangeSelector::new(day(1));
        selector.select_range(RangeCandidate::Day(day(10))).unwrap();
        let range = selector.select_range(RangeCandidate::Day(day(15))).unwrap();

        assert_eq!(range.complete(), Some((day(10), day(15))));
        assert_eq!(range.nights(), Some(5));
    }

    #[test]
    fn test_click_before_check_in_restarts_selection() {
        let mut selector = DateRangeSelector::new(day(1));
        selector.select_range(RangeCandidate::Day(day(10))).unwrap();
        let range = selector.select_range(RangeCandidate::Day(day(5))).unwrap();

        assert_eq!(range.check_in, Some(day(5)));
        assert_eq!(range.check_out, None);
    }

    #[test]
    fn test_click_after_complete_range_starts_over() {
        let mut selector = DateRangeSelector::new(day(1));
        selector
            .select_range(RangeCandidate::Span {
                from: day(10),
                to: day(12),
            })
            .unwrap();
        let range = selector.select_range(RangeCandidate::Day(day(20))).unwrap();

        assert_eq!(range.check_in, Some(day(20)));
        assert!(range.check_out.is_none());
    }

    #[test_case(day(10), day(15), Some(day(10)), Some(day(15)) ; "ordered span kept")]
    #[test_case(day(15), day(10), Some(day(10)), Some(day(15)) ; "reversed span swapped")]
    #[test_case(day(10), day(10), Some(day(10)), None ; "same day span keeps check in only")]
    fn test_span_normalisation(
        from: NaiveDate,
        to: NaiveDate,
        check_in: Option<NaiveDate>,
        check_out: Option<NaiveDate>,
    ) {
        let mut selector = DateRangeSelector::new(day(1));
        let range = selector
            .select_range(RangeCandidate::Span { from, to })
            .unwrap();

        assert_eq!(range.check_in, check_in);
        assert_eq!(range.check_out, check_out);
        if let (Some(a), Some(b)) = (range.check_in, range.check_out) {
            assert!(b > a);
        }
    }

    #[test]
    fn test_span_with_past_endpoint_rejected() {
        let mut selector = DateRangeSelector::new(day(10));
        let result = selector.select_range(RangeCandidate::Span {
            from: day(12),
            to: day(8),
        });

        assert!(result.is_err());
        assert!(selector.range().is_empty());
    }

    #[test]
    fn test_clear_resets_to_empty() {
        let mut selector = DateRangeSelector::new(day(1));
        selector
            .select_range(RangeCandidate::Span {
                from: day(2),
                to: day(4),
            })
            .unwrap();

        assert!(selector.clear().is_empty());
        assert!(!selector.range().is_complete());
    }
}
