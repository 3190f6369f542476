//! `start_at` / `limit` admission over the ordered date listing.

/// Decision for one date directory in listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Before `start_at`; not eligible.
    Skip,
    /// Eligible and under the limit; dispatch it.
    Dispatch,
    /// The limit is reached; stop scanning.
    Stop,
}

/// Stateful filter applied to date names in lexicographic order.
#[derive(Debug, Clone)]
pub struct DateFilter {
    start_at: Option<String>,
    limit: Option<u64>,
    started: bool,
    dispatched: u64,
}

impl DateFilter {
    /// Build a filter. `None` for `start_at` makes every date eligible;
    /// `None` for `limit` means unlimited.
    #[must_use]
    pub fn new(start_at: Option<String>, limit: Option<u64>) -> Self {
        let started = start_at.is_none();
        Self {
            start_at,
            limit,
            started,
            dispatched: 0,
        }
    }

    /// Decide what to do with the next date name.
    pub fn admit(&mut self, name: &str) -> Admission {
        if !self.started {
            if self.start_at.as_deref() == Some(name) {
                self.started = true;
            } else {
                return Admission::Skip;
            }
        }
        if self.limit.is_some_and(|limit| self.dispatched >= limit) {
            return Admission::Stop;
        }
        self.dispatched += 1;
        Admission::Dispatch
    }

    /// Number of dates admitted so far.
    #[must_use]
    pub const fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATES: [&str; 5] = [
        "2024-01-01",
        "2024-01-02",
        "2024-01-03",
        "2024-01-04",
        "2024-01-05",
    ];

    fn admitted(start_at: Option<&str>, limit: Option<u64>) -> Vec<&'static str> {
        let mut filter = DateFilter::new(start_at.map(str::to_string), limit);
        let mut picked = Vec::new();
        for date in DATES {
            match filter.admit(date) {
                Admission::Skip => {}
                Admission::Dispatch => picked.push(date),
                Admission::Stop => break,
            }
        }
        picked
    }

    #[test]
    fn no_constraints_admits_everything() {
        assert_eq!(admitted(None, None), DATES);
    }

    #[test]
    fn start_at_and_limit_select_contiguous_window() {
        for (start, skip) in DATES.iter().zip(0..) {
            for limit in 0..=6_u64 {
                let expected: Vec<_> = DATES
                    .iter()
                    .copied()
                    .skip(skip)
                    .take(usize::try_from(limit).unwrap_or(usize::MAX))
                    .collect();
                assert_eq!(
                    admitted(Some(*start), Some(limit)),
                    expected,
                    "start_at={start} limit={limit}"
                );
            }
        }
    }

    #[test]
    fn unknown_start_at_admits_nothing() {
        assert!(admitted(Some("2023-12-31"), None).is_empty());
    }

    #[test]
    fn zero_limit_stops_immediately() {
        let mut filter = DateFilter::new(None, Some(0));
        assert_eq!(filter.admit("2024-01-01"), Admission::Stop);
        assert_eq!(filter.dispatched(), 0);
    }
}
