use chrono::NaiveDate;

use super::{StoreError, StoreResult, record};
use crate::api::Api;
use crate::model::Completion;
use crate::ops::streak::{self, Bucket, BucketCount, StreakSummary};

/// Completion history for a date range
pub struct StatsStore<'a> {
    api: &'a dyn Api,
    completions: Vec<Completion>,
    range: Option<(NaiveDate, NaiveDate)>,
    error: Option<String>,
}

impl<'a> StatsStore<'a> {
    pub fn new(api: &'a dyn Api) -> Self {
        StatsStore {
            api,
            completions: Vec::new(),
            range: None,
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn completions(&self) -> &[Completion] {
        &self.completions
    }

    pub fn range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.range
    }

    /// Fetch completions between `from` and `to`, both inclusive.
    pub fn load(&mut self, from: NaiveDate, to: NaiveDate) -> StoreResult<()> {
        self.error = None;
        if to < from {
            return Err(record(
                &mut self.error,
                StoreError::Validation(format!("range end {} is before start {}", to, from)),
            ));
        }
        self.completions = self
            .api
            .list_completions(from, to)
            .map_err(|e| record(&mut self.error, e))?;
        self.range = Some((from, to));
        Ok(())
    }

    pub fn summary(&self, today: NaiveDate) -> StreakSummary {
        streak::summarize(&self.completions, today)
    }

    /// Completion counts over the loaded range. Empty before the first load.
    pub fn buckets(&self, bucket: Bucket) -> Vec<BucketCount> {
        match self.range {
            Some((from, to)) => streak::bucket_counts(&self.completions, from, to, bucket),
            None => Vec::new(),
        }
    }
}
