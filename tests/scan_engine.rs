//! End-to-end scenarios for the scan engine.

use async_trait::async_trait;
use portchecker::resolver::HostnameResolver;
use portchecker::scanner::{JobState, ProgressObserver, StatusCounts};
use portchecker::types::TargetError;
use portchecker::{
    EngineConfig, PortProber, PortStatus, RequestError, ScanEngine, ScanError, ScanRequest,
    ScanResult,
};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};

/// Reports the ports in `open` as Open and everything else as Closed after
/// an optional delay, recording every probed address.
struct ScriptedProber {
    open: HashSet<u16>,
    delay: Duration,
    probes: Mutex<Vec<SocketAddr>>,
}

impl ScriptedProber {
    fn new(open: &[u16], delay: Duration) -> Self {
        Self {
            open: open.iter().copied().collect(),
            delay,
            probes: Mutex::new(Vec::new()),
        }
    }

    fn probed(&self) -> Vec<SocketAddr> {
        self.probes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PortProber for ScriptedProber {
    async fn probe(&self, addr: SocketAddr, _timeout: Duration) -> PortStatus {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.probes.lock().unwrap().push(addr);
        if self.open.contains(&addr.port()) {
            PortStatus::Open
        } else {
            PortStatus::Closed
        }
    }
}

/// Counts reverse lookups; names every address `host-<last octet>`.
#[derive(Default)]
struct CountingResolver {
    reverse_calls: Mutex<Vec<IpAddr>>,
}

#[async_trait]
impl HostnameResolver for CountingResolver {
    async fn lookup(&self, hostname: &str) -> Result<Vec<IpAddr>, TargetError> {
        Err(TargetError::NoAddressesFound(hostname.to_string()))
    }

    async fn reverse(&self, ip: IpAddr) -> Option<String> {
        self.reverse_calls.lock().unwrap().push(ip);
        match ip {
            IpAddr::V4(v4) => Some(format!("host-{}", v4.octets()[3])),
            IpAddr::V6(_) => None,
        }
    }
}

#[derive(Default)]
struct RecordingObserver {
    total: AtomicU64,
    units: AtomicU64,
    last_completed: AtomicU64,
    final_state: Mutex<Option<JobState>>,
}

impl ProgressObserver for RecordingObserver {
    fn on_start(&self, total_units: u64) {
        self.total.store(total_units, Ordering::SeqCst);
    }

    fn on_unit(&self, _result: &ScanResult, completed: u64) {
        self.units.fetch_add(1, Ordering::SeqCst);
        self.last_completed.fetch_max(completed, Ordering::SeqCst);
    }

    fn on_finish(&self, state: JobState) {
        *self.final_state.lock().unwrap() = Some(state);
    }
}

fn no_dns() -> EngineConfig {
    EngineConfig::default().with_reverse_dns(false)
}

fn scripted_engine(config: EngineConfig, prober: &Arc<ScriptedProber>) -> ScanEngine {
    ScanEngine::with_components(
        config,
        prober.clone(),
        Arc::new(CountingResolver::default()),
    )
}

async fn wait_until_running(engine: &ScanEngine) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !engine.is_running() {
        assert!(Instant::now() < deadline, "scan never started");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Find a port P with P-1 and P+1 also free, keeping a listener on P.
async fn listener_between_free_ports() -> (tokio::net::TcpListener, u16) {
    for _ in 0..100 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        if port <= 1 || port == u16::MAX {
            continue;
        }
        let neighbours_free = [port - 1, port + 1]
            .iter()
            .all(|p| std::net::TcpListener::bind(("127.0.0.1", *p)).is_ok());
        if neighbours_free {
            return (listener, port);
        }
    }
    panic!("no free port triple found");
}

#[tokio::test]
async fn test_listener_between_closed_ports() {
    let (_listener, port) = listener_between_free_ports().await;
    let engine = ScanEngine::new(no_dns());
    let request = ScanRequest::new(
        ["127.0.0.1"],
        u32::from(port) - 1,
        u32::from(port) + 1,
        1000,
        2,
        true,
    )
    .unwrap();

    let results = assert_ok!(engine.scan(&request).await);

    let observed: Vec<(u16, PortStatus)> =
        results.iter().map(|r| (r.port, r.port_status)).collect();
    assert_eq!(
        observed,
        vec![
            (port - 1, PortStatus::Closed),
            (port, PortStatus::Open),
            (port + 1, PortStatus::Closed),
        ]
    );
    assert!(results
        .iter()
        .all(|r| r.address == IpAddr::V4(Ipv4Addr::LOCALHOST)));
}

#[tokio::test]
async fn test_every_unit_probed_exactly_once() {
    let prober = Arc::new(ScriptedProber::new(&[22], Duration::ZERO));
    let engine = scripted_engine(no_dns(), &prober);
    let request = ScanRequest::new(["10.0.0.0/31", "10.0.0.7"], 20, 24, 100, 4, false).unwrap();

    let report = assert_ok!(engine.run(&request, Arc::new(RecordingObserver::default())).await);
    assert_eq!(report.total_units, 15);
    assert_eq!(report.results.len(), 15);
    assert_eq!(report.state, JobState::Completed);

    let mut probed = prober.probed();
    probed.sort();
    let before = probed.len();
    probed.dedup();
    assert_eq!(before, probed.len());
    assert_eq!(probed.len(), 15);

    assert_eq!(
        report.counts,
        StatusCounts {
            open: 3,
            closed: 12,
            unknown: 0
        }
    );
}

#[tokio::test]
async fn test_unsorted_results_follow_partition_order() {
    let prober = Arc::new(ScriptedProber::new(&[], Duration::ZERO));
    let engine = scripted_engine(no_dns(), &prober);
    let request = ScanRequest::new(["10.0.0.9", "10.0.0.1"], 1, 3, 100, 3, false).unwrap();

    let results = assert_ok!(engine.scan(&request).await);
    let keys: Vec<(IpAddr, u16)> = results.iter().map(|r| (r.address, r.port)).collect();
    let nine = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9));
    let one = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    assert_eq!(
        keys,
        vec![(nine, 1), (nine, 2), (nine, 3), (one, 1), (one, 2), (one, 3)]
    );
}

#[tokio::test]
async fn test_more_workers_than_units() {
    let prober = Arc::new(ScriptedProber::new(&[], Duration::ZERO));
    let engine = scripted_engine(no_dns(), &prober);
    let request = ScanRequest::new(["10.1.1.1"], 100, 102, 100, 16, true).unwrap();

    let report = assert_ok!(engine.run(&request, Arc::new(RecordingObserver::default())).await);
    assert_eq!(report.workers, 3);
    assert_eq!(report.results.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_returns_partial_results_quickly() {
    let prober = Arc::new(ScriptedProber::new(&[5], Duration::from_millis(50)));
    let engine = Arc::new(scripted_engine(no_dns(), &prober));
    let request = ScanRequest::new(["127.0.0.1"], 1, 400, 50, 2, true).unwrap();

    let task = {
        let engine = Arc::clone(&engine);
        let request = request.clone();
        tokio::spawn(async move {
            engine
                .run(&request, Arc::new(RecordingObserver::default()))
                .await
        })
    };

    wait_until_running(&engine).await;
    let cancelled_at = Instant::now();
    assert_ok!(engine.cancel());
    // Cancelling twice is harmless.
    assert_ok!(engine.cancel());

    let report = assert_ok!(task.await.unwrap());
    assert!(cancelled_at.elapsed() < Duration::from_secs(2));
    assert_eq!(report.state, JobState::Cancelled);
    assert!(report.results.len() < 400);
    assert_eq!(report.results.len(), prober.probed().len());
    assert!(report
        .results
        .iter()
        .all(|r| matches!(r.port_status, PortStatus::Open | PortStatus::Closed)));

    assert!(!engine.is_running());
    assert!(matches!(engine.cancel(), Err(ScanError::NoActiveJob)));
}

#[tokio::test]
async fn test_cancel_on_idle_engine_is_an_error() {
    let engine = ScanEngine::new(no_dns());
    assert!(matches!(engine.cancel(), Err(ScanError::NoActiveJob)));
    assert!(engine.progress().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_job_rejected_while_one_runs() {
    let prober = Arc::new(ScriptedProber::new(&[], Duration::from_millis(20)));
    let engine = Arc::new(scripted_engine(no_dns(), &prober));
    let request = ScanRequest::new(["127.0.0.1"], 1, 200, 20, 1, false).unwrap();

    let task = {
        let engine = Arc::clone(&engine);
        let request = request.clone();
        tokio::spawn(async move { engine.scan(&request).await })
    };
    wait_until_running(&engine).await;

    let second = engine.scan(&request).await;
    assert!(matches!(second, Err(ScanError::JobAlreadyActive)));

    let progress = engine.progress().unwrap();
    assert!(progress.completed <= progress.total);

    assert_ok!(engine.cancel());
    assert_ok!(task.await.unwrap());

    // The slot is free again once the first job returns.
    let short = ScanRequest::new(["127.0.0.1"], 1, 1, 20, 1, false).unwrap();
    assert_eq!(assert_ok!(engine.scan(&short).await).len(), 1);
}

#[test]
fn test_reversed_port_range_is_invalid_request() {
    let err = assert_err!(ScanRequest::new(["127.0.0.1"], 81, 79, 100, 2, true));
    assert!(ScanError::from(err).is_invalid_request());
}

#[tokio::test]
async fn test_bad_address_fails_before_probing() {
    let prober = Arc::new(ScriptedProber::new(&[], Duration::ZERO));
    let engine = scripted_engine(no_dns(), &prober);
    let observer = Arc::new(RecordingObserver::default());
    let request = ScanRequest::new(["10.0.0.1", "bad host!"], 1, 10, 100, 2, true).unwrap();

    let err = assert_err!(engine.run(&request, observer.clone()).await);
    assert_eq!(*observer.final_state.lock().unwrap(), Some(JobState::Failed));
    match err {
        ScanError::InvalidRequest(RequestError::InvalidAddress { entry, .. }) => {
            assert_eq!(entry, "bad host!")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(prober.probed().is_empty());
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_reverse_lookup_once_per_host() {
    let prober = Arc::new(ScriptedProber::new(&[443], Duration::ZERO));
    let resolver = Arc::new(CountingResolver::default());
    let engine = ScanEngine::with_components(EngineConfig::default(), prober, resolver.clone());
    let request = ScanRequest::new(["192.168.5.0/30"], 440, 445, 100, 4, true).unwrap();

    let results = assert_ok!(engine.scan(&request).await);
    assert_eq!(results.len(), 24);

    let calls = resolver.reverse_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls.iter().collect::<HashSet<_>>().len(), 4);

    for r in &results {
        let IpAddr::V4(v4) = r.address else {
            panic!("unexpected address {}", r.address)
        };
        assert_eq!(r.host_name, format!("host-{}", v4.octets()[3]));
    }
}

#[tokio::test]
async fn test_repeated_scans_classify_identically() {
    let prober = Arc::new(ScriptedProber::new(&[80, 8080], Duration::ZERO));
    let engine = scripted_engine(no_dns(), &prober);
    let request = ScanRequest::new(["10.2.0.0/30"], 79, 81, 100, 3, true).unwrap();

    let classify = |results: Vec<ScanResult>| -> Vec<(IpAddr, u16, PortStatus)> {
        results
            .into_iter()
            .map(|r| (r.address, r.port, r.port_status))
            .collect()
    };

    let first = classify(assert_ok!(engine.scan(&request).await));
    let second = classify(assert_ok!(engine.scan(&request).await));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_observer_sees_every_unit() {
    let prober = Arc::new(ScriptedProber::new(&[], Duration::ZERO));
    let engine = scripted_engine(no_dns(), &prober);
    let observer = Arc::new(RecordingObserver::default());
    let request = ScanRequest::new(["10.3.0.1", "10.3.0.2"], 1, 50, 100, 4, false).unwrap();

    let report = assert_ok!(engine.run(&request, observer.clone()).await);

    assert_eq!(observer.total.load(Ordering::SeqCst), 100);
    assert_eq!(observer.units.load(Ordering::SeqCst), 100);
    assert_eq!(observer.last_completed.load(Ordering::SeqCst), 100);
    assert_eq!(*observer.final_state.lock().unwrap(), Some(JobState::Completed));
    assert!(!report.is_cancelled());
    assert!(engine.progress().is_none());
}

/// Panics on one port so its worker task dies.
struct PanickingProber {
    fatal_port: u16,
}

#[async_trait]
impl PortProber for PanickingProber {
    async fn probe(&self, addr: SocketAddr, _timeout: Duration) -> PortStatus {
        if addr.port() == self.fatal_port {
            panic!("prober crashed on port {}", addr.port());
        }
        PortStatus::Closed
    }
}

#[tokio::test]
async fn test_worker_panic_fails_the_job() {
    let engine = ScanEngine::with_components(
        no_dns(),
        Arc::new(PanickingProber { fatal_port: 7 }),
        Arc::new(CountingResolver::default()),
    );
    let observer = Arc::new(RecordingObserver::default());
    let request = ScanRequest::new(["10.4.0.1"], 1, 10, 100, 2, false).unwrap();

    let err = assert_err!(engine.run(&request, observer.clone()).await);
    assert!(matches!(err, ScanError::WorkerFailed { worker: 1, .. }));
    assert_eq!(*observer.final_state.lock().unwrap(), Some(JobState::Failed));
    assert!(!engine.is_running());
}
