//! # Background Maintenance
//!
//! Periodic housekeeping for a long-lived tab. The scheduler is cooperative and
//! single-threaded: the host loop calls [`Maintenance::tick`] with the current time
//! and every job that is due runs right there, through the same store entry points
//! as foreground operations.
//!
//! | Job | Interval (config key) | Work |
//! |-----|-----------------------|------|
//! | backup | `backup_interval_secs` | refresh the backup slot |
//! | sync | `sync_interval_secs` | re-announce the collection if the last sync is stale |
//! | cleanup | `cleanup_interval_secs` | trim dated backups, expired rate-limit entries, deleted-records cap |
//!
//! Each job first runs one full interval after [`Maintenance::start`]. A failing
//! job is logged and reported; it does not stop the others and is retried at its
//! next interval. Dropping the handle stops everything.

use chrono::{DateTime, Duration, Utc};

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;
use crate::validation::rate_limit::prune_persisted;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Backup,
    Sync,
    Cleanup,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::Backup => "backup",
            Job::Sync => "sync",
            Job::Cleanup => "cleanup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    BackedUp {
        tickets: usize,
    },
    Synced {
        announced: bool,
    },
    CleanedUp {
        backups_removed: usize,
        rate_limits_removed: usize,
        deleted_trimmed: usize,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job: Job,
    pub outcome: JobOutcome,
}

struct Schedule {
    job: Job,
    interval: Duration,
    next_due: DateTime<Utc>,
}

pub struct Maintenance {
    schedules: Vec<Schedule>,
    stale_after: Duration,
    rate_limit_window: Duration,
}

fn after(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    now.checked_add_signed(interval)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Maintenance {
    pub fn start(config: &TrackerConfig, now: DateTime<Utc>) -> Self {
        let schedules = [
            (Job::Backup, config.backup_interval()),
            (Job::Sync, config.sync_interval()),
            (Job::Cleanup, config.cleanup_interval()),
        ]
        .into_iter()
        .map(|(job, interval)| Schedule {
            job,
            interval,
            next_due: after(now, interval),
        })
        .collect();

        tracing::info!(
            backup_secs = config.backup_interval_secs,
            sync_secs = config.sync_interval_secs,
            cleanup_secs = config.cleanup_interval_secs,
            "Maintenance started"
        );

        Self {
            schedules,
            stale_after: config.stale_after(),
            rate_limit_window: config.rate_limit_window(),
        }
    }

    /// When the next job becomes due.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.schedules.iter().map(|s| s.next_due).min()
    }

    /// Runs every job due at `now`, in backup, sync, cleanup order.
    pub fn tick<B: StorageBackend>(
        &mut self,
        store: &RecordStore<B>,
        now: DateTime<Utc>,
    ) -> Vec<JobReport> {
        let mut reports = Vec::new();
        for i in 0..self.schedules.len() {
            if self.schedules[i].next_due > now {
                continue;
            }
            let job = self.schedules[i].job;
            let outcome = match self.run_job(job, store, now) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(job = job.name(), error = %e, "Maintenance job failed");
                    JobOutcome::Failed(e.to_string())
                }
            };
            let schedule = &mut self.schedules[i];
            schedule.next_due = after(now, schedule.interval);
            reports.push(JobReport { job, outcome });
        }
        reports
    }

    fn run_job<B: StorageBackend>(
        &self,
        job: Job,
        store: &RecordStore<B>,
        now: DateTime<Utc>,
    ) -> Result<JobOutcome> {
        match job {
            Job::Backup => {
                let snapshot = store.create_backup(None)?;
                Ok(JobOutcome::BackedUp {
                    tickets: snapshot.data.len(),
                })
            }
            Job::Sync => Ok(JobOutcome::Synced {
                announced: store.check_for_updates(now, self.stale_after)?,
            }),
            Job::Cleanup => {
                let outcome = JobOutcome::CleanedUp {
                    backups_removed: store.cleanup_old_backups()?,
                    rate_limits_removed: prune_persisted(
                        store.backend(),
                        self.rate_limit_window,
                        now,
                    )?,
                    deleted_trimmed: store.enforce_deleted_cap()?,
                };
                tracing::info!(?outcome, "Cleanup finished");
                Ok(outcome)
            }
        }
    }
}

impl Drop for Maintenance {
    fn drop(&mut self) {
        tracing::info!("Maintenance stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fault_ticket, make_store};
    use crate::store::BACKUP_KEY;
    use crate::validation::rate_limit::check_persisted;

    fn jobs(reports: &[JobReport]) -> Vec<Job> {
        reports.iter().map(|r| r.job).collect()
    }

    #[test]
    fn test_jobs_run_on_their_intervals() {
        let store = make_store();
        let t0 = Utc::now();
        let mut maintenance = Maintenance::start(&TrackerConfig::default(), t0);

        assert!(maintenance.tick(&store, t0).is_empty());
        assert_eq!(maintenance.next_due(), Some(t0 + Duration::seconds(30)));

        let reports = maintenance.tick(&store, t0 + Duration::seconds(30));
        assert_eq!(jobs(&reports), vec![Job::Sync]);

        let reports = maintenance.tick(&store, t0 + Duration::minutes(5));
        assert_eq!(jobs(&reports), vec![Job::Backup, Job::Sync]);

        let reports = maintenance.tick(&store, t0 + Duration::hours(24));
        assert_eq!(jobs(&reports), vec![Job::Backup, Job::Sync, Job::Cleanup]);
    }

    #[test]
    fn test_sync_announces_only_when_stale() {
        let store = make_store();
        let t0 = Utc::now();
        let mut maintenance = Maintenance::start(&TrackerConfig::default(), t0);

        let first = maintenance.tick(&store, t0 + Duration::seconds(30));
        assert_eq!(first[0].outcome, JobOutcome::Synced { announced: true });

        let second = maintenance.tick(&store, t0 + Duration::seconds(60));
        assert_eq!(second[0].outcome, JobOutcome::Synced { announced: false });
    }

    #[test]
    fn test_failed_job_does_not_stop_others() {
        let store = make_store();
        store.add(fault_ticket("10.0.0.1")).unwrap();
        let t0 = Utc::now();
        let mut maintenance = Maintenance::start(&TrackerConfig::default(), t0);

        store.backend().set_failing_key(Some(BACKUP_KEY));
        let reports = maintenance.tick(&store, t0 + Duration::minutes(5));
        store.backend().set_failing_key(None);

        assert!(matches!(reports[0].outcome, JobOutcome::Failed(_)));
        assert_eq!(reports[1].job, Job::Sync);
        assert!(!matches!(reports[1].outcome, JobOutcome::Failed(_)));

        let retry = maintenance.tick(&store, t0 + Duration::minutes(10));
        assert_eq!(retry[0].outcome, JobOutcome::BackedUp { tickets: 1 });
    }

    #[test]
    fn test_cleanup_prunes_rate_limits_and_deleted() {
        let store = make_store().with_max_deleted(Some(1));
        let t0 = Utc::now();
        check_persisted(store.backend(), "form_10.0.0.1", 3, Duration::seconds(60), t0).unwrap();

        let a = store.add(fault_ticket("10.0.0.1")).unwrap();
        let b = store.add(fault_ticket("10.0.0.1")).unwrap();
        store.delete(&a.id, "admin", "cli").unwrap();
        store.delete(&b.id, "admin", "cli").unwrap();

        let mut maintenance = Maintenance::start(&TrackerConfig::default(), t0);
        let reports = maintenance.tick(&store, t0 + Duration::hours(24));
        let cleanup = reports.iter().find(|r| r.job == Job::Cleanup).unwrap();

        assert_eq!(
            cleanup.outcome,
            JobOutcome::CleanedUp {
                backups_removed: 0,
                rate_limits_removed: 1,
                deleted_trimmed: 0,
            }
        );
        assert_eq!(store.deleted_records().unwrap().len(), 1);
    }
}
