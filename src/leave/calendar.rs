use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{Datelike, NaiveDate, Weekday};
use moka::future::Cache;
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    model::holiday::{Holiday, NewHoliday},
    store::Store,
};

/// Longest date range a single request may cover.
pub const MAX_SPAN_DAYS: i64 = 366;

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Inclusive list of dates; callers bound the span first.
pub fn dates_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Holiday lookups keyed by year. Writes go through here so the cache is
/// invalidated with them.
///
/// Entries are also keyed by a write generation that is bumped after each
/// store write. A load that started before a write may still finish and be
/// cached, but under the old generation, where no later reader looks.
pub struct HolidayCalendar {
    store: Arc<dyn Store>,
    generation: AtomicU64,
    by_year: Cache<(u64, i32), Arc<Vec<Holiday>>>,
}

impl HolidayCalendar {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            generation: AtomicU64::new(0),
            by_year: Cache::builder()
                .max_capacity(32)
                .time_to_live(Duration::from_secs(3600))
                .build(),
        }
    }

    pub async fn year(&self, year: i32) -> AppResult<Arc<Vec<Holiday>>> {
        let store = self.store.clone();
        let generation = self.generation.load(Ordering::Acquire);
        self.by_year
            .try_get_with((generation, year), async move {
                let from = NaiveDate::from_ymd_opt(year, 1, 1)
                    .ok_or_else(|| AppError::validation(format!("invalid year {year}")))?;
                let to = NaiveDate::from_ymd_opt(year, 12, 31)
                    .ok_or_else(|| AppError::validation(format!("invalid year {year}")))?;
                debug!(year, "Loading holidays");
                store.holidays_between(from, to).await.map(Arc::new)
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Holidays of `year` visible to an identity in `department_id`.
    /// `None` sees only company-wide holidays.
    pub async fn for_scope(&self, year: i32, department_id: Option<u64>) -> AppResult<Vec<Holiday>> {
        Ok(self
            .year(year)
            .await?
            .iter()
            .filter(|h| h.applies_to(department_id))
            .cloned()
            .collect())
    }

    pub async fn holiday_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        department_id: Option<u64>,
    ) -> AppResult<HashSet<NaiveDate>> {
        let mut dates = HashSet::new();
        for year in start.year()..=end.year() {
            for holiday in self.year(year).await?.iter() {
                if holiday.date >= start && holiday.date <= end && holiday.applies_to(department_id)
                {
                    dates.insert(holiday.date);
                }
            }
        }
        Ok(dates)
    }

    /// Dates in the range that are neither weekends nor holidays in scope.
    pub async fn working_days(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        department_id: Option<u64>,
    ) -> AppResult<Vec<NaiveDate>> {
        let holidays = self.holiday_dates(start, end, department_id).await?;
        Ok(dates_between(start, end)
            .into_iter()
            .filter(|d| !is_weekend(*d) && !holidays.contains(d))
            .collect())
    }

    pub async fn add(&self, new: NewHoliday) -> AppResult<Holiday> {
        if new.label.trim().is_empty() {
            return Err(AppError::validation("holiday label must not be empty"));
        }
        let holiday = self.store.insert_holiday(new).await?;
        self.written();
        Ok(holiday)
    }

    pub async fn remove(&self, id: u64) -> AppResult<()> {
        if !self.store.delete_holiday(id).await? {
            return Err(AppError::not_found(format!("holiday {id}")));
        }
        self.written();
        Ok(())
    }

    fn written(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.by_year.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn holiday(date: NaiveDate, department_id: Option<u64>) -> NewHoliday {
        NewHoliday {
            date,
            label: "Day off".into(),
            department_id,
        }
    }

    #[test]
    fn weekend_detection() {
        // 2026-01-03 is a Saturday
        assert!(is_weekend(date(2026, 1, 3)));
        assert!(is_weekend(date(2026, 1, 4)));
        assert!(!is_weekend(date(2026, 1, 5)));
        assert_eq!(dates_between(date(2026, 1, 30), date(2026, 2, 2)).len(), 4);
    }

    #[actix_web::test]
    async fn working_days_skip_weekends_and_scoped_holidays() {
        let calendar = HolidayCalendar::new(Arc::new(MemoryStore::new()));
        calendar.add(holiday(date(2026, 1, 6), None)).await.unwrap();
        calendar.add(holiday(date(2026, 1, 7), Some(4))).await.unwrap();

        // Mon 5th .. Sun 11th
        let other_dept = calendar
            .working_days(date(2026, 1, 5), date(2026, 1, 11), Some(1))
            .await
            .unwrap();
        assert_eq!(other_dept.len(), 4);

        let own_dept = calendar
            .working_days(date(2026, 1, 5), date(2026, 1, 11), Some(4))
            .await
            .unwrap();
        assert_eq!(own_dept.len(), 3);
    }

    #[actix_web::test]
    async fn writes_invalidate_cached_year() {
        let calendar = HolidayCalendar::new(Arc::new(MemoryStore::new()));
        assert!(calendar.year(2026).await.unwrap().is_empty());

        let added = calendar.add(holiday(date(2026, 12, 25), None)).await.unwrap();
        assert_eq!(calendar.year(2026).await.unwrap().len(), 1);

        calendar.remove(added.id).await.unwrap();
        assert!(calendar.year(2026).await.unwrap().is_empty());
        assert!(matches!(
            calendar.remove(added.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn anonymous_scope_sees_only_global_holidays() {
        let calendar = HolidayCalendar::new(Arc::new(MemoryStore::new()));
        calendar.add(holiday(date(2026, 5, 1), None)).await.unwrap();
        calendar.add(holiday(date(2026, 5, 2), Some(3))).await.unwrap();

        assert_eq!(calendar.for_scope(2026, None).await.unwrap().len(), 1);
        assert_eq!(calendar.for_scope(2026, Some(3)).await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn load_started_before_a_write_is_not_served_after_it() {
        let calendar = HolidayCalendar::new(Arc::new(MemoryStore::new()));
        let before = calendar.generation.load(Ordering::Acquire);

        calendar.add(holiday(date(2026, 8, 15), None)).await.unwrap();

        // a read of the empty year completes only now
        calendar.by_year.insert((before, 2026), Arc::new(Vec::new())).await;

        let year = calendar.year(2026).await.unwrap();
        assert_eq!(year.len(), 1);
        assert_eq!(year[0].date, date(2026, 8, 15));
    }
}
