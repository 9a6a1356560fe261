//! The scheduler itself: a registry of [`ScheduledTask`]s driven by a
//! single cron loop, guarded by one reader/writer lock over an
//! `Arc<RwLock<HashMap<String, ...>>>` task map.

use crate::error::{Error, Result};
use crate::handlers::TaskHandler;
use aegis_types::ScheduledTask;
use chrono::{DateTime, Duration, Utc};
use cron::Schedule as CronSchedule;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Run/error counters for a single task, as returned by [`Scheduler::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStats {
    /// Total completed runs, successful or not.
    pub run_count: u64,
    /// Total runs that returned an error.
    pub error_count: u64,
}

struct RegisteredTask {
    task: ScheduledTask,
    handler: Arc<dyn TaskHandler>,
    /// Guards at-most-one-concurrent-execution per task: only the cron
    /// driver or `execute_now` that wins the compare-exchange may run the
    /// handler; a trigger arriving while a prior run is still in flight is
    /// skipped rather than queued.
    running: Arc<AtomicBool>,
}

fn next_run_after(cron_expression: &str, from: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    let schedule = CronSchedule::from_str(cron_expression)
        .map_err(|e| Error::InvalidSchedule(cron_expression.to_string(), e.to_string()))?;
    Ok(schedule.after(&from).next())
}

/// Registry of periodic maintenance/escalation tasks, driven by a single
/// cron loop. See spec.md §4.2.
pub struct Scheduler {
    tasks: RwLock<HashMap<String, RegisteredTask>>,
    /// Deadline granted to every scheduled handler execution.
    handler_deadline: Duration,
    shutdown: CancellationToken,
    driver_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Construct an empty scheduler. Handlers are registered with [`Self::add`].
    pub fn new(handler_deadline: Duration) -> Arc<Self> {
        Arc::new(Self {
            tasks: RwLock::new(HashMap::new()),
            handler_deadline,
            shutdown: CancellationToken::new(),
            driver_handle: tokio::sync::Mutex::new(None),
        })
    }

    /// Register a new task. Rejects unknown cron expressions and duplicate
    /// ids.
    pub async fn add(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        cron_expression: impl Into<String>,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<()> {
        let id = id.into();
        let cron_expression = cron_expression.into();
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&id) {
            return Err(Error::DuplicateTask(id));
        }
        let next_run = next_run_after(&cron_expression, Utc::now())?;
        let mut task = ScheduledTask::new(id.clone(), name, cron_expression);
        task.next_run = next_run;
        tasks.insert(
            id,
            RegisteredTask {
                task,
                handler,
                running: Arc::new(AtomicBool::new(false)),
            },
        );
        Ok(())
    }

    /// Remove a registered task.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        tasks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound("scheduled_task", id.to_string()))
    }

    /// Enable a task, recomputing its next run from now.
    pub async fn enable(&self, id: &str) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let entry = tasks
            .get_mut(id)
            .ok_or_else(|| Error::NotFound("scheduled_task", id.to_string()))?;
        entry.task.enabled = true;
        entry.task.next_run = next_run_after(&entry.task.cron_expression, Utc::now())?;
        Ok(())
    }

    /// Disable a task; its next run is cleared until re-enabled.
    pub async fn disable(&self, id: &str) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let entry = tasks
            .get_mut(id)
            .ok_or_else(|| Error::NotFound("scheduled_task", id.to_string()))?;
        entry.task.enabled = false;
        entry.task.next_run = None;
        Ok(())
    }

    /// Replace a task's cron expression, recomputing its next run if
    /// currently enabled.
    pub async fn update_schedule(&self, id: &str, cron_expression: impl Into<String>) -> Result<()> {
        let cron_expression = cron_expression.into();
        let next_run = next_run_after(&cron_expression, Utc::now())?;
        let mut tasks = self.tasks.write().await;
        let entry = tasks
            .get_mut(id)
            .ok_or_else(|| Error::NotFound("scheduled_task", id.to_string()))?;
        entry.task.cron_expression = cron_expression;
        entry.task.next_run = if entry.task.enabled { next_run } else { None };
        Ok(())
    }

    /// Run a task's handler immediately, without altering its schedule.
    /// Skipped (returns `Ok(())` without executing) if the task is
    /// already running.
    pub async fn execute_now(&self, id: &str) -> Result<()> {
        let (handler, running) = {
            let tasks = self.tasks.read().await;
            let entry = tasks
                .get(id)
                .ok_or_else(|| Error::NotFound("scheduled_task", id.to_string()))?;
            (entry.handler.clone(), entry.running.clone())
        };
        self.run_guarded(id, handler, running).await;
        Ok(())
    }

    /// Read-only snapshot of every registered task.
    pub async fn tasks(&self) -> Vec<ScheduledTask> {
        self.tasks.read().await.values().map(|t| t.task.clone()).collect()
    }

    /// Read-only snapshot of every task's next scheduled run.
    pub async fn next_runs(&self) -> HashMap<String, Option<DateTime<Utc>>> {
        self.tasks
            .read()
            .await
            .values()
            .map(|t| (t.task.id.clone(), t.task.next_run))
            .collect()
    }

    /// Read-only snapshot of every task's run/error counters.
    pub async fn stats(&self) -> HashMap<String, TaskStats> {
        self.tasks
            .read()
            .await
            .values()
            .map(|t| {
                (
                    t.task.id.clone(),
                    TaskStats {
                        run_count: t.task.run_count,
                        error_count: t.task.error_count,
                    },
                )
            })
            .collect()
    }

    async fn run_guarded(&self, id: &str, handler: Arc<dyn TaskHandler>, running: Arc<AtomicBool>) {
        if running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(task = id, "skipping trigger: previous run still in flight");
            return;
        }

        let deadline = self.handler_deadline;
        let std_deadline = deadline.to_std().unwrap_or(std::time::Duration::from_secs(30 * 60));
        let outcome = tokio::time::timeout(std_deadline, handler.execute()).await;
        running.store(false, Ordering::SeqCst);

        let now = Utc::now();
        let mut tasks = self.tasks.write().await;
        if let Some(entry) = tasks.get_mut(id) {
            entry.task.last_run = Some(now);
            entry.task.run_count += 1;
            match outcome {
                Ok(Ok(())) => {
                    info!(task = id, "scheduled task completed");
                }
                Ok(Err(err)) => {
                    entry.task.error_count += 1;
                    warn!(task = id, error = %err, "scheduled task returned an error");
                }
                Err(_) => {
                    entry.task.error_count += 1;
                    error!(task = id, "scheduled task exceeded its deadline");
                }
            }
            if entry.task.enabled {
                entry.task.next_run = next_run_after(&entry.task.cron_expression, now).unwrap_or(None);
            }
        }
    }

    /// Spawn the cron driver and a statistics-logging task. Returns
    /// immediately; call [`Self::stop`] to await a clean shutdown.
    pub async fn start(self: &Arc<Self>) {
        let driver = {
            let scheduler = self.clone();
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = ticker.tick() => {
                            scheduler.tick().await;
                        }
                    }
                }
            })
        };
        *self.driver_handle.lock().await = Some(driver);
    }

    async fn tick(&self) {
        let now = Utc::now();
        let due: Vec<(String, Arc<dyn TaskHandler>, Arc<AtomicBool>)> = {
            let tasks = self.tasks.read().await;
            tasks
                .values()
                .filter(|t| t.task.enabled && t.task.next_run.is_some_and(|next| next <= now))
                .map(|t| (t.task.id.clone(), t.handler.clone(), t.running.clone()))
                .collect()
        };
        for (id, handler, running) in due {
            self.run_guarded(&id, handler, running).await;
        }
    }

    /// Signal the cron driver to stop and await its completion.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.driver_handle.lock().await.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ClosureHandler;
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

    fn counting_handler(counter: Arc<AtomicU32>) -> Arc<dyn TaskHandler> {
        Arc::new(ClosureHandler::new(move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, AtomicOrdering::SeqCst);
                Ok(())
            })
        }))
    }

    #[tokio::test]
    async fn add_rejects_duplicate_ids() {
        let scheduler = Scheduler::new(Duration::minutes(30));
        let counter = Arc::new(AtomicU32::new(0));
        scheduler
            .add("t1", "Task 1", "*/1 * * * *", counting_handler(counter.clone()))
            .await
            .unwrap();
        let err = scheduler
            .add("t1", "Task 1 again", "*/1 * * * *", counting_handler(counter))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateTask(_)));
    }

    #[tokio::test]
    async fn execute_now_runs_handler_without_touching_schedule() {
        let scheduler = Scheduler::new(Duration::minutes(30));
        let counter = Arc::new(AtomicU32::new(0));
        scheduler
            .add("t1", "Task 1", "0 0 * * *", counting_handler(counter.clone()))
            .await
            .unwrap();
        let before = scheduler.next_runs().await["t1"];
        scheduler.execute_now("t1").await.unwrap();
        let after = scheduler.next_runs().await["t1"];
        assert_eq!(counter.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(before, after);
        assert_eq!(scheduler.stats().await["t1"].run_count, 1);
    }

    #[tokio::test]
    async fn disable_then_enable_clears_and_restores_next_run() {
        let scheduler = Scheduler::new(Duration::minutes(30));
        let counter = Arc::new(AtomicU32::new(0));
        scheduler
            .add("t1", "Task 1", "0 0 * * *", counting_handler(counter))
            .await
            .unwrap();
        scheduler.disable("t1").await.unwrap();
        assert!(scheduler.next_runs().await["t1"].is_none());
        scheduler.enable("t1").await.unwrap();
        assert!(scheduler.next_runs().await["t1"].is_some());
    }

    #[tokio::test]
    async fn concurrent_trigger_is_skipped_while_a_run_is_in_flight() {
        let scheduler = Scheduler::new(Duration::minutes(30));
        let counter = Arc::new(AtomicU32::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());
        let handler: Arc<dyn TaskHandler> = {
            let counter = counter.clone();
            let gate = gate.clone();
            Arc::new(ClosureHandler::new(move || {
                let counter = counter.clone();
                let gate = gate.clone();
                Box::pin(async move {
                    counter.fetch_add(1, AtomicOrdering::SeqCst);
                    gate.notified().await;
                    Ok(())
                })
            }))
        };
        scheduler.add("t1", "Task 1", "0 0 * * *", handler).await.unwrap();

        let scheduler_clone = scheduler.clone();
        let first = tokio::spawn(async move { scheduler_clone.execute_now("t1").await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        scheduler.execute_now("t1").await.unwrap();
        gate.notify_one();
        first.await.unwrap().unwrap();

        assert_eq!(counter.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remove_unknown_task_is_not_found() {
        let scheduler = Scheduler::new(Duration::minutes(30));
        let err = scheduler.remove("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_, _)));
    }
}
