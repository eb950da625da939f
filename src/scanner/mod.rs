//! Scanner module - coordinates a concurrent port scan.
//!
//! A scan expands the request's addresses, cuts the (host, port) unit
//! sequence into one contiguous share per worker, runs every share on its own
//! tokio task through a [`PortProber`] and merges the worker buffers once all
//! tasks have returned.

pub mod aggregate;
pub mod expander;
pub mod job;
pub mod partition;
pub mod request;
pub mod tcp;
pub mod traits;

use crate::error::{EngineResult, ScanError};
use crate::resolver::{DnsResolver, HostnameResolver};
use crate::types::{CidrPolicy, JobId, TargetSpec};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, trace, warn, Instrument};

pub use aggregate::{sort_results, HostnameCache, ResultAggregator};
pub use expander::AddressExpander;
pub use job::{JobHandle, JobProgress, JobState};
pub use partition::{partition, ScanUnit, Share, UnitSequence};
pub use request::ScanRequest;
pub use tcp::TcpConnectProber;
pub use traits::{NoProgress, PortProber, PortStatus, ProgressObserver, ScanResult};

/// Number of logical processors, used by shells to suggest a worker count.
pub fn number_of_logical_processors() -> usize {
    num_cpus::get().max(1)
}

/// Engine-wide settings that are not part of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    /// Which addresses of a CIDR block are probed.
    pub cidr_policy: CidrPolicy,
    /// Largest CIDR block accepted, in addresses.
    pub max_cidr_hosts: u128,
    /// Attach reverse-DNS names to results.
    pub reverse_dns: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cidr_policy: CidrPolicy::AllAddresses,
            max_cidr_hosts: TargetSpec::MAX_CIDR_HOSTS,
            reverse_dns: true,
        }
    }
}

impl EngineConfig {
    /// Set the CIDR policy.
    pub fn with_cidr_policy(mut self, policy: CidrPolicy) -> Self {
        self.cidr_policy = policy;
        self
    }

    /// Set the CIDR size cap.
    pub fn with_max_cidr_hosts(mut self, max: u128) -> Self {
        self.max_cidr_hosts = max;
        self
    }

    /// Enable or disable reverse DNS.
    pub fn with_reverse_dns(mut self, enabled: bool) -> Self {
        self.reverse_dns = enabled;
        self
    }
}

/// Per-status totals of a finished job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub open: usize,
    pub closed: usize,
    pub unknown: usize,
}

impl StatusCounts {
    /// Count the statuses of `results`.
    pub fn tally(results: &[ScanResult]) -> Self {
        results.iter().fold(Self::default(), |mut counts, r| {
            match r.port_status {
                PortStatus::Open => counts.open += 1,
                PortStatus::Closed => counts.closed += 1,
                PortStatus::Unknown => counts.unknown += 1,
            }
            counts
        })
    }
}

/// Outcome of a finished job.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Identifier of the job.
    pub job_id: JobId,
    /// Completed or Cancelled.
    pub state: JobState,
    /// When the job was accepted.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Number of distinct hosts after expansion.
    pub hosts: usize,
    /// Units in the job.
    pub total_units: u64,
    /// Workers actually spawned.
    pub workers: usize,
    /// Status totals over `results`.
    pub counts: StatusCounts,
    /// One record per probed unit.
    pub results: Vec<ScanResult>,
}

impl ScanReport {
    /// Whether the job was cancelled before every unit was probed.
    pub fn is_cancelled(&self) -> bool {
        self.state == JobState::Cancelled
    }

    /// One-line summary of the job.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} ports probed on {} host(s): {} open, {} closed, {} unknown [{:.2}s]",
            self.results.len(),
            self.total_units,
            self.hosts,
            self.counts.open,
            self.counts.closed,
            self.counts.unknown,
            self.duration_ms as f64 / 1000.0
        )
    }
}

/// Everything a worker needs, handed over at spawn time.
struct WorkerContext {
    units: UnitSequence,
    prober: Arc<dyn PortProber>,
    observer: Arc<dyn ProgressObserver>,
    token: CancellationToken,
    completed: Arc<AtomicU64>,
    timeout: Duration,
}

/// Probe the units of `share` in order until done or cancelled.
///
/// The token is checked before each unit only; a probe already in flight
/// always runs to its own deadline and its result is kept.
async fn run_worker(ctx: WorkerContext, share: Share) -> Vec<ScanResult> {
    let mut buffer = Vec::with_capacity(share.len.min(4096) as usize);

    for unit in ctx.units.units(share) {
        if ctx.token.is_cancelled() {
            debug!(probed = buffer.len(), assigned = share.len, "worker stopping on cancel");
            break;
        }

        let addr = unit.socket_addr();
        let status = ctx.prober.probe(addr, ctx.timeout).await;
        trace!(%addr, %status, "probed");
        let result = ScanResult::new(unit.host.ip, unit.port, status);
        let completed = ctx.completed.fetch_add(1, Ordering::Relaxed) + 1;
        ctx.observer.on_unit(&result, completed);
        buffer.push(result);
    }

    buffer
}

/// Releases the engine's job slot when a scan returns or is dropped.
struct ActiveJobGuard<'a> {
    slot: &'a Mutex<Option<JobHandle>>,
    job: JobHandle,
}

impl Drop for ActiveJobGuard<'_> {
    fn drop(&mut self) {
        // Stops any worker still running if the scan future was dropped early.
        self.job.cancel();
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|active| active.id() == self.job.id()) {
            *slot = None;
        }
    }
}

/// The concurrent port-probing engine.
///
/// Runs at most one job at a time. `scan`/`run` return once every worker has
/// finished; `cancel` and `progress` may be called from other tasks meanwhile.
pub struct ScanEngine {
    config: EngineConfig,
    prober: Arc<dyn PortProber>,
    resolver: Arc<dyn HostnameResolver>,
    active: Mutex<Option<JobHandle>>,
}

impl ScanEngine {
    /// Create an engine using TCP connect probes and the system resolver.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_components(
            config,
            Arc::new(TcpConnectProber::new()),
            Arc::new(DnsResolver::from_system_conf()),
        )
    }

    /// Create an engine with explicit probing and resolution components.
    pub fn with_components(
        config: EngineConfig,
        prober: Arc<dyn PortProber>,
        resolver: Arc<dyn HostnameResolver>,
    ) -> Self {
        Self {
            config,
            prober,
            resolver,
            active: Mutex::new(None),
        }
    }

    /// Run `request` and return its results.
    pub async fn scan(&self, request: &ScanRequest) -> EngineResult<Vec<ScanResult>> {
        let report = self.run(request, Arc::new(NoProgress)).await?;
        Ok(report.results)
    }

    /// Run `request`, reporting progress to `observer`.
    ///
    /// Fails with [`ScanError::JobAlreadyActive`] if another job is running and
    /// with [`ScanError::InvalidRequest`] before any probing if an address
    /// entry is bad. Cancellation is not an error: the report then holds the
    /// units probed so far.
    pub async fn run(
        &self,
        request: &ScanRequest,
        observer: Arc<dyn ProgressObserver>,
    ) -> EngineResult<ScanReport> {
        let job = self.claim_slot()?;
        let _guard = ActiveJobGuard {
            slot: &self.active,
            job: job.clone(),
        };

        let span = info_span!("scan_job", job = %job.id().short());
        let outcome = self
            .run_job(request, Arc::clone(&observer), &job)
            .instrument(span)
            .await;
        if let Err(e) = &outcome {
            debug!(job = %job.id().short(), error = %e, "scan failed");
            job.finish(JobState::Failed);
            observer.on_finish(JobState::Failed);
        }
        outcome
    }

    async fn run_job(
        &self,
        request: &ScanRequest,
        observer: Arc<dyn ProgressObserver>,
        job: &JobHandle,
    ) -> EngineResult<ScanReport> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let expander = AddressExpander::new(self.config.cidr_policy, self.config.max_cidr_hosts);
        let hosts = expander
            .expand(request.addresses(), self.resolver.as_ref())
            .await?;
        let host_count = hosts.len();

        let units = UnitSequence::new(hosts, request.ports());
        let total = units.len();
        let shares = partition(total, request.workers());

        info!(
            hosts = host_count,
            ports = %request.ports(),
            units = total,
            workers = shares.len(),
            timeout_ms = request.timeout().as_millis() as u64,
            "starting scan"
        );
        job.start(total);
        observer.on_start(total);

        let handles: Vec<(usize, JoinHandle<Vec<ScanResult>>)> = shares
            .iter()
            .map(|&share| {
                let ctx = WorkerContext {
                    units: units.clone(),
                    prober: Arc::clone(&self.prober),
                    observer: Arc::clone(&observer),
                    token: job.token().clone(),
                    completed: job.completed_counter(),
                    timeout: request.timeout(),
                };
                let span = info_span!("worker", id = share.worker, units = share.len);
                (share.worker, tokio::spawn(run_worker(ctx, share).instrument(span)))
            })
            .collect();

        let mut buffers = Vec::with_capacity(handles.len());
        let mut failure = None;
        for (worker, handle) in handles {
            match handle.await {
                Ok(buffer) => buffers.push(buffer),
                Err(e) => {
                    warn!(worker, error = %e, "scan worker failed");
                    job.cancel();
                    failure.get_or_insert(ScanError::WorkerFailed {
                        worker,
                        reason: e.to_string(),
                    });
                }
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }

        let probed: u64 = buffers.iter().map(|b| b.len() as u64).sum();
        let cancelled = job.is_cancelled() && probed < total;

        // A cancelled job returns without waiting on reverse lookups.
        let resolver = (self.config.reverse_dns && !cancelled).then(|| self.resolver.as_ref());
        let results = ResultAggregator::new(resolver, request.sort())
            .aggregate(buffers)
            .await;

        let state = if cancelled {
            JobState::Cancelled
        } else {
            JobState::Completed
        };
        job.finish(state);
        observer.on_finish(state);

        let report = ScanReport {
            job_id: job.id(),
            state,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            hosts: host_count,
            total_units: total,
            workers: shares.len(),
            counts: StatusCounts::tally(&results),
            results,
        };
        info!(state = %report.state, "{}", report.summary());
        Ok(report)
    }

    /// Signal the active job to stop starting new units.
    ///
    /// Idempotent while a job runs; fails with [`ScanError::NoActiveJob`]
    /// when the engine is idle.
    pub fn cancel(&self) -> EngineResult<()> {
        match self.slot().as_ref() {
            Some(job) => {
                if !job.is_cancelled() {
                    info!(job = %job.id().short(), "cancellation requested");
                }
                job.cancel();
                Ok(())
            }
            None => Err(ScanError::NoActiveJob),
        }
    }

    /// Progress of the active job, if any.
    pub fn progress(&self) -> Option<JobProgress> {
        self.slot().as_ref().map(JobHandle::progress)
    }

    /// Whether a job is active.
    pub fn is_running(&self) -> bool {
        self.slot().is_some()
    }

    fn claim_slot(&self) -> EngineResult<JobHandle> {
        let mut slot = self.slot();
        if slot.is_some() {
            return Err(ScanError::JobAlreadyActive);
        }
        let job = JobHandle::new();
        *slot = Some(job.clone());
        Ok(job)
    }

    fn slot(&self) -> MutexGuard<'_, Option<JobHandle>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ScanEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanEngine")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn result(status: PortStatus) -> ScanResult {
        ScanResult::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 1, status)
    }

    #[test]
    fn test_status_counts() {
        let results = vec![
            result(PortStatus::Open),
            result(PortStatus::Closed),
            result(PortStatus::Closed),
            result(PortStatus::Unknown),
        ];
        assert_eq!(
            StatusCounts::tally(&results),
            StatusCounts {
                open: 1,
                closed: 2,
                unknown: 1
            }
        );
    }

    #[test]
    fn test_logical_processors_is_positive() {
        assert!(number_of_logical_processors() >= 1);
    }

    #[test]
    fn test_engine_config_builder() {
        let config = EngineConfig::default()
            .with_cidr_policy(CidrPolicy::HostsOnly)
            .with_max_cidr_hosts(256)
            .with_reverse_dns(false);
        assert_eq!(config.cidr_policy, CidrPolicy::HostsOnly);
        assert_eq!(config.max_cidr_hosts, 256);
        assert!(!config.reverse_dns);
    }
}
