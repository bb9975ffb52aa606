//! 任务调度：每日定时与固定间隔作业
//!
//! 每个作业一个 tokio 任务，配子 CancellationToken 可单独移除；
//! 每日作业用 chrono 计算下一次触发点，当天时刻已过则滚到明天。

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, TimeZone};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 作业回调：每次触发返回一个新 future
pub type JobFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// 触发节奏
#[derive(Clone)]
enum Cadence {
    Daily { hour: u32, minute: u32 },
    Interval(Duration),
}

struct JobSpec {
    id: String,
    name: String,
    cadence: Cadence,
    job: JobFn,
}

/// 调度器契约：核心只要求「按节奏调用回调」
pub trait Scheduler: Send + Sync {
    fn add_daily_job(&self, name: &str, hour: u32, minute: u32, job: JobFn) -> String;

    fn add_interval_job(&self, name: &str, interval: Duration, job: JobFn) -> String;

    /// 启动所有已注册作业；start 之后注册的作业立即生效
    fn start(&self);

    /// 取消并移除作业；不存在时返回 false
    fn remove_job(&self, job_id: &str) -> bool;
}

/// 距下一次每日触发点的时长；当天时刻已过则取明天
pub fn next_daily_delay(now: DateTime<Local>, hour: u32, minute: u32) -> Duration {
    let target_time = NaiveTime::from_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    let mut target_date = now.date_naive();
    if now.time() >= target_time {
        target_date = target_date.succ_opt().unwrap_or(target_date);
    }
    let target = Local
        .from_local_datetime(&target_date.and_time(target_time))
        .earliest()
        .unwrap_or(now);
    (target - now).to_std().unwrap_or(Duration::ZERO)
}

/// 基于 tokio 的调度器实现
pub struct TokioScheduler {
    pending: Mutex<Vec<JobSpec>>,
    tokens: Mutex<HashMap<String, CancellationToken>>,
    root: CancellationToken,
    started: Mutex<bool>,
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            tokens: Mutex::new(HashMap::new()),
            root: CancellationToken::new(),
            started: Mutex::new(false),
        }
    }

    /// 停止所有作业
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    fn add_job(&self, name: &str, cadence: Cadence, job: JobFn) -> String {
        let id = Uuid::new_v4().to_string();
        let spec = JobSpec {
            id: id.clone(),
            name: name.to_string(),
            cadence,
            job,
        };
        let started = self.started.lock().map(|s| *s).unwrap_or(false);
        if started {
            self.spawn_job(spec);
        } else if let Ok(mut pending) = self.pending.lock() {
            pending.push(spec);
        }
        id
    }

    fn spawn_job(&self, spec: JobSpec) {
        let token = self.root.child_token();
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(spec.id.clone(), token.clone());
        }
        let JobSpec {
            id, name, cadence, job,
        } = spec;
        tracing::info!(job = %name, %id, "scheduling job");

        tokio::spawn(async move {
            loop {
                let delay = match &cadence {
                    Cadence::Daily { hour, minute } => {
                        next_daily_delay(Local::now(), *hour, *minute)
                    }
                    Cadence::Interval(interval) => *interval,
                };
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!(job = %name, "job cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {
                        tracing::info!(job = %name, "job firing");
                        job().await;
                    }
                }
            }
        });
    }
}

impl Scheduler for TokioScheduler {
    fn add_daily_job(&self, name: &str, hour: u32, minute: u32, job: JobFn) -> String {
        self.add_job(name, Cadence::Daily { hour, minute }, job)
    }

    fn add_interval_job(&self, name: &str, interval: Duration, job: JobFn) -> String {
        self.add_job(name, Cadence::Interval(interval), job)
    }

    fn start(&self) {
        if let Ok(mut started) = self.started.lock() {
            if *started {
                return;
            }
            *started = true;
        }
        let specs = self
            .pending
            .lock()
            .map(|mut p| p.drain(..).collect::<Vec<_>>())
            .unwrap_or_default();
        for spec in specs {
            self.spawn_job(spec);
        }
    }

    fn remove_job(&self, job_id: &str) -> bool {
        if let Ok(mut tokens) = self.tokens.lock() {
            if let Some(token) = tokens.remove(job_id) {
                token.cancel();
                return true;
            }
        }
        self.pending
            .lock()
            .map(|mut pending| {
                let before = pending.len();
                pending.retain(|spec| spec.id != job_id);
                pending.len() != before
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_next_daily_delay_rolls_to_tomorrow() {
        let now = Local.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        // 今天 09:30 已过，滚到明天
        let delay = next_daily_delay(now, 9, 30);
        assert_eq!(delay, Duration::from_secs(23 * 3600 + 30 * 60));

        // 今天 11:00 还没到
        let delay = next_daily_delay(now, 11, 0);
        assert_eq!(delay, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_interval_job_fires_and_can_be_removed() {
        let scheduler = TokioScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_in_job = Arc::clone(&counter);
        let job: JobFn = Arc::new(move || {
            let counter = Arc::clone(&counter_in_job);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });

        let id = scheduler.add_interval_job("tick", Duration::from_millis(10), job);
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(counter.load(Ordering::SeqCst) >= 2);

        assert!(scheduler.remove_job(&id));
        assert!(!scheduler.remove_job(&id));
        let after = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        // 移除后计数不再明显增长（允许一次在途触发）
        assert!(counter.load(Ordering::SeqCst) <= after + 1);
        scheduler.shutdown();
    }
}
