//! Storage abstraction for the scheduling core.
//!
//! The engines never reach into shared state directly: everything flows
//! through [`SchedulingStore`], constructed once at process start. The
//! bundled [`MemoryStore`] keeps indexed maps keyed by `(worker, date)` so
//! lookups stay constant-time, and range queries walk ordered indexes rather
//! than scanning every row.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;

use super::domain::{
    DateRange, Job, JobId, MasterBlockedDate, MasterDayPattern, WorkerDateOverride, WorkerId,
    WorkerProfile, WorkerWeeklyPattern,
};

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Repository interface over the three sources of truth the core reconciles:
/// master calendar rules, worker schedules, and the job ledger.
pub trait SchedulingStore: Send + Sync {
    // Master calendar rules.
    fn master_patterns(&self) -> Result<Vec<MasterDayPattern>, StoreError>;
    fn master_pattern(&self, day_of_week: u8) -> Result<Option<MasterDayPattern>, StoreError>;
    fn upsert_master_pattern(&self, pattern: MasterDayPattern) -> Result<(), StoreError>;
    fn blocked_date(&self, date: NaiveDate) -> Result<Option<MasterBlockedDate>, StoreError>;
    fn blocked_dates_in(&self, range: DateRange) -> Result<Vec<MasterBlockedDate>, StoreError>;
    /// At most one block exists per calendar date; inserting again replaces it.
    fn put_blocked_date(&self, blocked: MasterBlockedDate) -> Result<(), StoreError>;
    fn remove_blocked_date(&self, date: NaiveDate) -> Result<bool, StoreError>;

    // Worker profiles and schedules.
    fn workers(&self) -> Result<Vec<WorkerProfile>, StoreError>;
    fn worker(&self, id: &WorkerId) -> Result<Option<WorkerProfile>, StoreError>;
    fn upsert_worker(&self, profile: WorkerProfile) -> Result<(), StoreError>;
    fn weekly_pattern(
        &self,
        worker: &WorkerId,
        day_of_week: u8,
    ) -> Result<Option<WorkerWeeklyPattern>, StoreError>;
    fn weekly_patterns_for(&self, worker: &WorkerId)
        -> Result<Vec<WorkerWeeklyPattern>, StoreError>;
    fn upsert_weekly_pattern(&self, pattern: WorkerWeeklyPattern) -> Result<(), StoreError>;
    fn date_override(
        &self,
        worker: &WorkerId,
        date: NaiveDate,
    ) -> Result<Option<WorkerDateOverride>, StoreError>;
    fn overrides_for(
        &self,
        worker: &WorkerId,
        range: DateRange,
    ) -> Result<Vec<WorkerDateOverride>, StoreError>;
    /// Last write wins; a single record per `(worker, date)`.
    fn put_date_override(&self, entry: WorkerDateOverride) -> Result<(), StoreError>;
    fn delete_date_override(&self, worker: &WorkerId, date: NaiveDate)
        -> Result<bool, StoreError>;

    // Job ledger.
    fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError>;
    fn insert_job(&self, job: Job) -> Result<(), StoreError>;
    fn update_job(&self, job: Job) -> Result<(), StoreError>;
    fn jobs_in_range(
        &self,
        worker: Option<&WorkerId>,
        range: DateRange,
    ) -> Result<Vec<Job>, StoreError>;
    fn jobs_for_worker_on(
        &self,
        worker: &WorkerId,
        date: NaiveDate,
    ) -> Result<Vec<Job>, StoreError>;

    /// Batch-fetch everything an availability scan over `range` will touch,
    /// so a 60-day date picker issues a handful of reads instead of one query
    /// set per date per worker.
    fn snapshot(&self, range: DateRange) -> Result<ScheduleSnapshot, StoreError> {
        let mut day_patterns: [Option<MasterDayPattern>; 7] = Default::default();
        for pattern in self.master_patterns()? {
            if let Some(entry) = day_patterns.get_mut(pattern.day_of_week as usize) {
                *entry = Some(pattern);
            }
        }

        let blocked = self
            .blocked_dates_in(range)?
            .into_iter()
            .map(|b| (b.date, b))
            .collect();

        let workers = self.workers()?;

        let mut weekly = HashMap::new();
        let mut overrides = HashMap::new();
        let mut jobs: HashMap<(WorkerId, NaiveDate), Vec<Job>> = HashMap::new();

        for worker in &workers {
            for pattern in self.weekly_patterns_for(&worker.id)? {
                weekly.insert((worker.id.clone(), pattern.day_of_week), pattern);
            }
            for entry in self.overrides_for(&worker.id, range)? {
                overrides.insert((worker.id.clone(), entry.date), entry);
            }
        }

        for job in self.jobs_in_range(None, range)? {
            jobs.entry((job.worker_id.clone(), job.scheduled_date))
                .or_default()
                .push(job);
        }

        Ok(ScheduleSnapshot {
            range,
            day_patterns,
            blocked,
            workers,
            weekly,
            overrides,
            jobs,
        })
    }
}

/// Immutable snapshot of everything relevant to a date range. Availability
/// reads are pure functions over this value.
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    pub range: DateRange,
    pub day_patterns: [Option<MasterDayPattern>; 7],
    pub blocked: BTreeMap<NaiveDate, MasterBlockedDate>,
    pub workers: Vec<WorkerProfile>,
    pub weekly: HashMap<(WorkerId, u8), WorkerWeeklyPattern>,
    pub overrides: HashMap<(WorkerId, NaiveDate), WorkerDateOverride>,
    pub jobs: HashMap<(WorkerId, NaiveDate), Vec<Job>>,
}

impl ScheduleSnapshot {
    pub fn weekly_pattern(&self, worker: &WorkerId, day_of_week: u8) -> Option<&WorkerWeeklyPattern> {
        self.weekly.get(&(worker.clone(), day_of_week))
    }

    pub fn date_override(&self, worker: &WorkerId, date: NaiveDate) -> Option<&WorkerDateOverride> {
        self.overrides.get(&(worker.clone(), date))
    }

    pub fn jobs_for(&self, worker: &WorkerId, date: NaiveDate) -> &[Job] {
        self.jobs
            .get(&(worker.clone(), date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn jobs_on(&self, date: NaiveDate) -> impl Iterator<Item = &Job> {
        self.jobs
            .iter()
            .filter(move |((_, job_date), _)| *job_date == date)
            .flat_map(|(_, jobs)| jobs.iter())
    }
}

#[derive(Default)]
struct MemoryInner {
    master_patterns: HashMap<u8, MasterDayPattern>,
    blocked: BTreeMap<NaiveDate, MasterBlockedDate>,
    workers: BTreeMap<WorkerId, WorkerProfile>,
    weekly: HashMap<(WorkerId, u8), WorkerWeeklyPattern>,
    overrides: BTreeMap<(WorkerId, NaiveDate), WorkerDateOverride>,
    jobs: HashMap<JobId, Job>,
    // Ordered by date so range scans walk only the slice they need.
    jobs_by_date: BTreeMap<(NaiveDate, WorkerId), Vec<JobId>>,
}

/// In-memory store used by the service binary and the test suites. Suitable
/// for a single process; swapping in a persistent implementation only
/// requires another [`SchedulingStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    fn unindex_job(inner: &mut MemoryInner, job: &Job) {
        if let Some(ids) = inner
            .jobs_by_date
            .get_mut(&(job.scheduled_date, job.worker_id.clone()))
        {
            ids.retain(|id| *id != job.id);
            if ids.is_empty() {
                inner
                    .jobs_by_date
                    .remove(&(job.scheduled_date, job.worker_id.clone()));
            }
        }
    }

    fn index_job(inner: &mut MemoryInner, job: &Job) {
        inner
            .jobs_by_date
            .entry((job.scheduled_date, job.worker_id.clone()))
            .or_default()
            .push(job.id.clone());
    }
}

impl SchedulingStore for MemoryStore {
    fn master_patterns(&self) -> Result<Vec<MasterDayPattern>, StoreError> {
        let inner = self.lock()?;
        let mut patterns: Vec<_> = inner.master_patterns.values().cloned().collect();
        patterns.sort_by_key(|p| p.day_of_week);
        Ok(patterns)
    }

    fn master_pattern(&self, day_of_week: u8) -> Result<Option<MasterDayPattern>, StoreError> {
        Ok(self.lock()?.master_patterns.get(&day_of_week).cloned())
    }

    fn upsert_master_pattern(&self, pattern: MasterDayPattern) -> Result<(), StoreError> {
        self.lock()?
            .master_patterns
            .insert(pattern.day_of_week, pattern);
        Ok(())
    }

    fn blocked_date(&self, date: NaiveDate) -> Result<Option<MasterBlockedDate>, StoreError> {
        Ok(self.lock()?.blocked.get(&date).cloned())
    }

    fn blocked_dates_in(&self, range: DateRange) -> Result<Vec<MasterBlockedDate>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .blocked
            .range(range.start..=range.end)
            .map(|(_, b)| b.clone())
            .collect())
    }

    fn put_blocked_date(&self, blocked: MasterBlockedDate) -> Result<(), StoreError> {
        self.lock()?.blocked.insert(blocked.date, blocked);
        Ok(())
    }

    fn remove_blocked_date(&self, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.lock()?.blocked.remove(&date).is_some())
    }

    fn workers(&self) -> Result<Vec<WorkerProfile>, StoreError> {
        Ok(self.lock()?.workers.values().cloned().collect())
    }

    fn worker(&self, id: &WorkerId) -> Result<Option<WorkerProfile>, StoreError> {
        Ok(self.lock()?.workers.get(id).cloned())
    }

    fn upsert_worker(&self, profile: WorkerProfile) -> Result<(), StoreError> {
        self.lock()?.workers.insert(profile.id.clone(), profile);
        Ok(())
    }

    fn weekly_pattern(
        &self,
        worker: &WorkerId,
        day_of_week: u8,
    ) -> Result<Option<WorkerWeeklyPattern>, StoreError> {
        Ok(self
            .lock()?
            .weekly
            .get(&(worker.clone(), day_of_week))
            .cloned())
    }

    fn weekly_patterns_for(
        &self,
        worker: &WorkerId,
    ) -> Result<Vec<WorkerWeeklyPattern>, StoreError> {
        let inner = self.lock()?;
        let mut patterns: Vec<_> = inner
            .weekly
            .values()
            .filter(|p| p.worker_id == *worker)
            .cloned()
            .collect();
        patterns.sort_by_key(|p| p.day_of_week);
        Ok(patterns)
    }

    fn upsert_weekly_pattern(&self, pattern: WorkerWeeklyPattern) -> Result<(), StoreError> {
        self.lock()?
            .weekly
            .insert((pattern.worker_id.clone(), pattern.day_of_week), pattern);
        Ok(())
    }

    fn date_override(
        &self,
        worker: &WorkerId,
        date: NaiveDate,
    ) -> Result<Option<WorkerDateOverride>, StoreError> {
        Ok(self.lock()?.overrides.get(&(worker.clone(), date)).cloned())
    }

    fn overrides_for(
        &self,
        worker: &WorkerId,
        range: DateRange,
    ) -> Result<Vec<WorkerDateOverride>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .overrides
            .range((worker.clone(), range.start)..=(worker.clone(), range.end))
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    fn put_date_override(&self, entry: WorkerDateOverride) -> Result<(), StoreError> {
        self.lock()?
            .overrides
            .insert((entry.worker_id.clone(), entry.date), entry);
        Ok(())
    }

    fn delete_date_override(
        &self,
        worker: &WorkerId,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        Ok(self
            .lock()?
            .overrides
            .remove(&(worker.clone(), date))
            .is_some())
    }

    fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.lock()?.jobs.get(id).cloned())
    }

    fn insert_job(&self, job: Job) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.jobs.contains_key(&job.id) {
            return Err(StoreError::Conflict);
        }
        Self::index_job(&mut inner, &job);
        inner.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    fn update_job(&self, job: Job) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if let Some(previous) = inner.jobs.get(&job.id).cloned() {
            Self::unindex_job(&mut inner, &previous);
        }
        Self::index_job(&mut inner, &job);
        inner.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    fn jobs_in_range(
        &self,
        worker: Option<&WorkerId>,
        range: DateRange,
    ) -> Result<Vec<Job>, StoreError> {
        let inner = self.lock()?;
        let mut jobs = Vec::new();
        for ((_, job_worker), ids) in inner
            .jobs_by_date
            .range((range.start, WorkerId(String::new()))..)
            .take_while(|((date, _), _)| *date <= range.end)
        {
            if let Some(filter) = worker {
                if job_worker != filter {
                    continue;
                }
            }
            for id in ids {
                if let Some(job) = inner.jobs.get(id) {
                    jobs.push(job.clone());
                }
            }
        }
        Ok(jobs)
    }

    fn jobs_for_worker_on(
        &self,
        worker: &WorkerId,
        date: NaiveDate,
    ) -> Result<Vec<Job>, StoreError> {
        let inner = self.lock()?;
        let mut jobs = Vec::new();
        if let Some(ids) = inner.jobs_by_date.get(&(date, worker.clone())) {
            for id in ids {
                if let Some(job) = inner.jobs.get(id) {
                    jobs.push(job.clone());
                }
            }
        }
        Ok(jobs)
    }
}

/// Per-(worker, date) write serialization. Assignment acquires the cell
/// before creating a job and mutating availability so two simultaneous
/// bookings cannot both win the same half-day slot.
#[derive(Default)]
pub struct SlotLocks {
    table: Mutex<HashMap<(WorkerId, NaiveDate), Arc<Mutex<()>>>>,
}

impl SlotLocks {
    pub fn cell(&self, worker: &WorkerId, date: NaiveDate) -> Result<Arc<Mutex<()>>, StoreError> {
        let mut table = self
            .table
            .lock()
            .map_err(|_| StoreError::Unavailable("lock table poisoned".to_string()))?;
        Ok(table
            .entry((worker.clone(), date))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }
}
