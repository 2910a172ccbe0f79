use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;

use crate::model::stats::Completion;

/// Width of a statistics bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bucket {
    #[default]
    Day,
    /// Weeks start on Monday
    Week,
    Month,
}

impl Bucket {
    pub fn parse(s: &str) -> Option<Bucket> {
        match s {
            "day" | "daily" => Some(Bucket::Day),
            "week" | "weekly" => Some(Bucket::Week),
            "month" | "monthly" => Some(Bucket::Month),
            _ => None,
        }
    }

    /// First day of the bucket containing `date`
    pub fn start_of(self, date: NaiveDate) -> NaiveDate {
        match self {
            Bucket::Day => date,
            Bucket::Week => date - Days::new(date.weekday().num_days_from_monday() as u64),
            Bucket::Month => date.with_day(1).unwrap_or(date),
        }
    }

    fn next(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Bucket::Day => start.checked_add_days(Days::new(1)),
            Bucket::Week => start.checked_add_days(Days::new(7)),
            Bucket::Month => start.checked_add_months(Months::new(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub start: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreakSummary {
    /// Consecutive days with a completion, ending today (or yesterday if
    /// nothing has been completed yet today)
    pub current: u32,
    pub longest: u32,
    pub total_completions: usize,
    pub active_days: usize,
}

/// Calendar days (UTC) with at least one completion
pub fn completion_days(completions: &[Completion]) -> BTreeSet<NaiveDate> {
    completions
        .iter()
        .map(|c| c.completed_at.date_naive())
        .collect()
}

pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut cursor = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };
    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}

pub fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for &day in days {
        run = match prev {
            Some(p) if p.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }
    longest
}

pub fn summarize(completions: &[Completion], today: NaiveDate) -> StreakSummary {
    let days = completion_days(completions);
    StreakSummary {
        current: current_streak(&days, today),
        longest: longest_streak(&days),
        total_completions: completions.len(),
        active_days: days.len(),
    }
}

/// Count completions per bucket between `from` and `to` (inclusive). Every
/// bucket in the range is present, empty ones with a zero count.
pub fn bucket_counts(
    completions: &[Completion],
    from: NaiveDate,
    to: NaiveDate,
    bucket: Bucket,
) -> Vec<BucketCount> {
    if to < from {
        return Vec::new();
    }
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut cursor = Some(bucket.start_of(from));
    let last = bucket.start_of(to);
    while let Some(start) = cursor {
        if start > last {
            break;
        }
        counts.insert(start, 0);
        cursor = bucket.next(start);
    }

    for completion in completions {
        let day = completion.completed_at.date_naive();
        if day < from || day > to {
            continue;
        }
        if let Some(count) = counts.get_mut(&bucket.start_of(day)) {
            *count += 1;
        }
    }

    counts
        .into_iter()
        .map(|(start, count)| BucketCount { start, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn done(s: &str) -> Completion {
        let d = date(s);
        Completion {
            task_id: 1,
            completed_at: Utc
                .with_ymd_and_hms(d.year(), d.month(), d.day(), 12, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_current_streak_includes_today() {
        let days = completion_days(&[done("2026-10-14"), done("2026-10-15"), done("2026-10-16")]);
        assert_eq!(current_streak(&days, date("2026-10-16")), 3);
    }

    #[test]
    fn test_current_streak_alive_from_yesterday() {
        let days = completion_days(&[done("2026-10-14"), done("2026-10-15")]);
        assert_eq!(current_streak(&days, date("2026-10-16")), 2);
    }

    #[test]
    fn test_current_streak_broken() {
        let days = completion_days(&[done("2026-10-13")]);
        assert_eq!(current_streak(&days, date("2026-10-16")), 0);
    }

    #[test]
    fn test_longest_streak_across_gap() {
        let days = completion_days(&[
            done("2026-09-01"),
            done("2026-09-02"),
            done("2026-09-03"),
            done("2026-09-10"),
            done("2026-09-11"),
        ]);
        assert_eq!(longest_streak(&days), 3);
    }

    #[test]
    fn test_summary_counts_multiple_per_day() {
        let completions = vec![done("2026-10-16"), done("2026-10-16"), done("2026-10-15")];
        let summary = summarize(&completions, date("2026-10-16"));
        assert_eq!(
            summary,
            StreakSummary {
                current: 2,
                longest: 2,
                total_completions: 3,
                active_days: 2,
            }
        );
    }

    #[test]
    fn test_daily_buckets_zero_filled() {
        let completions = vec![done("2026-10-01"), done("2026-10-03"), done("2026-10-03")];
        let buckets = bucket_counts(&completions, date("2026-10-01"), date("2026-10-04"), Bucket::Day);
        let counts: Vec<usize> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 0, 2, 0]);
    }

    #[test]
    fn test_weekly_buckets_start_monday() {
        // 2026-10-16 is a Friday
        assert_eq!(Bucket::Week.start_of(date("2026-10-16")), date("2026-10-12"));
        let completions = vec![done("2026-10-12"), done("2026-10-18"), done("2026-10-19")];
        let buckets =
            bucket_counts(&completions, date("2026-10-12"), date("2026-10-25"), Bucket::Week);
        assert_eq!(
            buckets,
            vec![
                BucketCount { start: date("2026-10-12"), count: 2 },
                BucketCount { start: date("2026-10-19"), count: 1 },
            ]
        );
    }

    #[test]
    fn test_monthly_buckets_ignore_out_of_range() {
        let completions = vec![done("2026-08-31"), done("2026-09-15"), done("2026-11-02")];
        let buckets =
            bucket_counts(&completions, date("2026-09-01"), date("2026-10-31"), Bucket::Month);
        let counts: Vec<(NaiveDate, usize)> = buckets.iter().map(|b| (b.start, b.count)).collect();
        assert_eq!(
            counts,
            vec![(date("2026-09-01"), 1), (date("2026-10-01"), 0)]
        );
    }

    #[test]
    fn test_reversed_range_is_empty() {
        assert!(bucket_counts(&[], date("2026-10-02"), date("2026-10-01"), Bucket::Day).is_empty());
    }
}
