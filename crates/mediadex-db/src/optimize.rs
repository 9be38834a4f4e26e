//! Background optimization lifecycle.
//!
//! A fixed step sequence (indexes → analyze → vacuum) runs at most once at
//! a time per database instance, persisting its status and current step in
//! DBConfig so an interrupted run resumes from its checkpoint at the next
//! open. Each step retries with exponential backoff; the sleeps are
//! cancellable so shutdown never waits out a backoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mediadex_common::{
    CancelToken, Error, OptimizationStatus, OptimizationStep, Result,
};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::config;
use crate::db_err;
use crate::pool::{get_conn, DbPool};

/// Search indexes are created here rather than in the migrations: bulk
/// indexing runs against a constraint-only schema and pays for the indexes
/// once, afterwards.
const SEARCH_INDEXES: &str = "\
    CREATE INDEX IF NOT EXISTS MediaTitles_Slug_idx ON MediaTitles (Slug);
    CREATE INDEX IF NOT EXISTS MediaTitles_SecondarySlug_idx ON MediaTitles (SecondarySlug);
    CREATE INDEX IF NOT EXISTS MediaTitles_SystemDBID_idx ON MediaTitles (SystemDBID);
    CREATE INDEX IF NOT EXISTS Media_MediaTitleDBID_idx ON Media (MediaTitleDBID);
    CREATE INDEX IF NOT EXISTS Media_SystemDBID_idx ON Media (SystemDBID);
    CREATE INDEX IF NOT EXISTS MediaTags_MediaDBID_idx ON MediaTags (MediaDBID);
    CREATE INDEX IF NOT EXISTS MediaTags_TagDBID_idx ON MediaTags (TagDBID);
    CREATE INDEX IF NOT EXISTS MediaTitleTags_MediaTitleDBID_idx ON MediaTitleTags (MediaTitleDBID);
    CREATE INDEX IF NOT EXISTS MediaTitleTags_TagDBID_idx ON MediaTitleTags (TagDBID);
    CREATE INDEX IF NOT EXISTS Tags_TypeDBID_idx ON Tags (TypeDBID);
    CREATE INDEX IF NOT EXISTS SupportingMedia_MediaTitleDBID_idx ON SupportingMedia (MediaTitleDBID);
    CREATE INDEX IF NOT EXISTS SlugResolutionCache_SystemID_idx ON SlugResolutionCache (SystemID);
    CREATE INDEX IF NOT EXISTS SlugResolutionCache_MediaDBID_idx ON SlugResolutionCache (MediaDBID);
";

/// Callback invoked exactly twice per background run: `true` on start,
/// `false` on the terminal outcome.
pub type OptimizeNotify = Box<dyn Fn(bool) + Send + Sync + 'static>;

struct StepSpec {
    step: OptimizationStep,
    max_retries: u32,
    base_delay: Duration,
}

fn default_steps() -> Vec<StepSpec> {
    vec![
        StepSpec {
            step: OptimizationStep::Indexes,
            max_retries: 2,
            base_delay: Duration::from_secs(10),
        },
        StepSpec {
            step: OptimizationStep::Analyze,
            max_retries: 2,
            base_delay: Duration::from_secs(10),
        },
        StepSpec {
            step: OptimizationStep::Vacuum,
            max_retries: 3,
            base_delay: Duration::from_secs(30),
        },
    ]
}

type StepRunner = Box<dyn Fn(&Connection, OptimizationStep) -> Result<()> + Send + Sync>;

fn run_step(conn: &Connection, step: OptimizationStep) -> Result<()> {
    match step {
        OptimizationStep::Indexes => conn
            .execute_batch(SEARCH_INDEXES)
            .map_err(|e| db_err("create search indexes", e)),
        OptimizationStep::Analyze => conn
            .execute_batch("ANALYZE")
            .map_err(|e| db_err("analyze", e)),
        OptimizationStep::Vacuum => conn
            .execute_batch("VACUUM")
            .map_err(|e| db_err("vacuum", e)),
    }
}

/// Whether the persisted status calls for a run at open: interrupted runs
/// resume, a failed run gets one retry, anything else is a no-op.
pub fn should_resume(status: OptimizationStatus) -> bool {
    matches!(
        status,
        OptimizationStatus::Pending | OptimizationStatus::Running | OptimizationStatus::Failed
    )
}

/// The optimization state machine. One instance per database; the gate and
/// cancel token are shared with the owning [`MediaDb`](crate::MediaDb).
pub struct Optimizer {
    pool: DbPool,
    gate: Arc<AtomicBool>,
    cancel: CancelToken,
    steps: Vec<StepSpec>,
    runner: StepRunner,
}

impl Optimizer {
    pub fn new(pool: DbPool, gate: Arc<AtomicBool>, cancel: CancelToken) -> Self {
        Self {
            pool,
            gate,
            cancel,
            steps: default_steps(),
            runner: Box::new(run_step),
        }
    }

    /// Run the sequence on the calling thread.
    ///
    /// Single-flight: when another run holds the gate this returns Ok
    /// immediately without touching persisted state or the callback.
    pub fn run(&self, notify: Option<OptimizeNotify>) -> Result<()> {
        if self
            .gate
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        if let Some(notify) = &notify {
            notify(true);
        }
        let result = self.run_sequence();
        // The terminal notification precedes the gate release so observers
        // never see two runs interleave.
        if let Some(notify) = &notify {
            notify(false);
        }
        self.gate.store(false, Ordering::Release);
        result
    }

    fn run_sequence(&self) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        config::set_optimization_status(&conn, OptimizationStatus::Running)?;

        // Resume from the persisted checkpoint, skipping completed steps.
        let start = config::optimization_step(&conn)?
            .and_then(|step| self.steps.iter().position(|spec| spec.step == step))
            .unwrap_or(0);

        for spec in &self.steps[start..] {
            config::set_optimization_step(&conn, Some(spec.step))?;
            self.run_step_with_retry(&conn, spec)?;
        }

        config::set_optimization_status(&conn, OptimizationStatus::Completed)?;
        config::set_optimization_step(&conn, None)?;
        info!("optimization completed");
        Ok(())
    }

    fn run_step_with_retry(&self, conn: &Connection, spec: &StepSpec) -> Result<()> {
        let mut attempt = 0u32;
        loop {
            match (self.runner)(conn, spec.step) {
                Ok(()) => {
                    info!(step = %spec.step, "optimization step completed");
                    return Ok(());
                }
                Err(e) if attempt < spec.max_retries => {
                    let delay = spec.base_delay * 2u32.pow(attempt);
                    warn!(
                        step = %spec.step,
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "optimization step failed, retrying"
                    );
                    // A cancelled sleep leaves status running and the step
                    // checkpoint in place; the next open resumes here.
                    if self.cancel.wait_timeout(delay) {
                        return Err(Error::Cancelled);
                    }
                    attempt += 1;
                }
                Err(e) => {
                    if let Err(we) =
                        config::set_optimization_status(conn, OptimizationStatus::Failed)
                    {
                        warn!(error = %we, "failed to persist optimization failure");
                    }
                    if let Err(we) = config::set_optimization_step(conn, None) {
                        warn!(error = %we, "failed to clear optimization step");
                    }
                    return Err(Error::optimization_failed(format!(
                        "step {} exhausted retries: {}",
                        spec.step, e
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use crate::pool::{get_conn, init_memory_pool, DbPool};

    fn fast_steps() -> Vec<StepSpec> {
        default_steps()
            .into_iter()
            .map(|spec| StepSpec {
                base_delay: Duration::from_millis(1),
                ..spec
            })
            .collect()
    }

    fn optimizer(pool: &DbPool) -> Optimizer {
        let mut opt = Optimizer::new(
            pool.clone(),
            Arc::new(AtomicBool::new(false)),
            CancelToken::new(),
        );
        opt.steps = fast_steps();
        opt
    }

    #[test]
    fn test_completed_run_persists_terminal_state() {
        let pool = init_memory_pool().unwrap();
        let opt = optimizer(&pool);
        opt.run(None).unwrap();

        let conn = get_conn(&pool).unwrap();
        assert_eq!(
            config::optimization_status(&conn).unwrap(),
            OptimizationStatus::Completed
        );
        assert_eq!(config::optimization_step(&conn).unwrap(), None);
        assert!(!opt.gate.load(Ordering::Acquire));

        // The indexes step really created the search indexes.
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master \
                 WHERE type='index' AND name='MediaTitles_Slug_idx'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_notify_called_twice() {
        let pool = init_memory_pool().unwrap();
        let opt = optimizer(&pool);

        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        opt.run(Some(Box::new(move |started| {
            seen.lock().unwrap().push(started);
        })))
        .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_failing_step_exhausts_retries_and_persists_failed() {
        let pool = init_memory_pool().unwrap();
        let mut opt = optimizer(&pool);

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        opt.runner = Box::new(move |conn, step| {
            if step == OptimizationStep::Analyze {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::storage("analyze: disk I/O error"))
            } else {
                run_step(conn, step)
            }
        });

        let err = opt.run(None).unwrap_err();
        assert!(matches!(err, Error::OptimizationFailed(_)));
        // analyze has max_retries = 2: three attempts in total.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let conn = get_conn(&pool).unwrap();
        assert_eq!(
            config::optimization_status(&conn).unwrap(),
            OptimizationStatus::Failed
        );
        assert_eq!(config::optimization_step(&conn).unwrap(), None);
        assert!(!opt.gate.load(Ordering::Acquire));
    }

    #[test]
    fn test_resume_skips_completed_steps() {
        let pool = init_memory_pool().unwrap();
        {
            let conn = get_conn(&pool).unwrap();
            config::set_optimization_status(&conn, OptimizationStatus::Running).unwrap();
            config::set_optimization_step(&conn, Some(OptimizationStep::Vacuum)).unwrap();
        }

        let mut opt = optimizer(&pool);
        let ran = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&ran);
        opt.runner = Box::new(move |conn, step| {
            seen.lock().unwrap().push(step);
            run_step(conn, step)
        });

        opt.run(None).unwrap();
        assert_eq!(*ran.lock().unwrap(), vec![OptimizationStep::Vacuum]);

        let conn = get_conn(&pool).unwrap();
        assert_eq!(
            config::optimization_status(&conn).unwrap(),
            OptimizationStatus::Completed
        );
    }

    #[test]
    fn test_single_flight_gate() {
        let pool = init_memory_pool().unwrap();
        let mut opt = optimizer(&pool);

        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        opt.runner = Box::new(move |conn, step| {
            if step == OptimizationStep::Indexes {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(200));
            }
            run_step(conn, step)
        });
        let opt = Arc::new(opt);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let opt = Arc::clone(&opt);
            handles.push(std::thread::spawn(move || opt.run(None)));
        }
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        // Exactly one invocation made it through the gate.
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!opt.gate.load(Ordering::Acquire));
    }

    #[test]
    fn test_cancelled_backoff_leaves_resumable_state() {
        let pool = init_memory_pool().unwrap();
        let cancel = CancelToken::new();
        let mut opt = Optimizer::new(
            pool.clone(),
            Arc::new(AtomicBool::new(false)),
            cancel.clone(),
        );
        opt.steps = default_steps(); // real (long) delays
        opt.runner = Box::new(|_, _| Err(Error::storage("boom")));

        cancel.cancel();
        let err = opt.run(None).unwrap_err();
        assert!(matches!(err, Error::Cancelled));

        let conn = get_conn(&pool).unwrap();
        assert_eq!(
            config::optimization_status(&conn).unwrap(),
            OptimizationStatus::Running
        );
        assert_eq!(
            config::optimization_step(&conn).unwrap(),
            Some(OptimizationStep::Indexes)
        );
    }

    #[test]
    fn test_should_resume() {
        assert!(should_resume(OptimizationStatus::Pending));
        assert!(should_resume(OptimizationStatus::Running));
        assert!(should_resume(OptimizationStatus::Failed));
        assert!(!should_resume(OptimizationStatus::Completed));
        assert!(!should_resume(OptimizationStatus::Unset));
    }
}
