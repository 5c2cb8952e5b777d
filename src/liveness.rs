use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use clap::Args;
use log::{debug, info, trace};
use tokio::time::{sleep, Instant};

mod http;
mod tcp;

const DEFAULT_HTTP_PORT: u16 = 80;

#[derive(Args, Clone, Debug)]
#[group(id = "liveness")]
pub struct Params {
    /// Timeout for each HTTP attempt against the host, in milliseconds.
    #[arg(long, env = "HTTP_TIMEOUT_MS", default_value = "2000")]
    pub http_timeout_ms: u64,

    /// Timeout for each raw TCP connection attempt, in milliseconds.
    #[arg(long, env = "TCP_TIMEOUT_MS", default_value = "1000")]
    pub tcp_timeout_ms: u64,

    /// Pause between two consecutive HTTP attempts, so a host that is still bringing up its
    /// network stack is not hammered.
    #[arg(long, env = "ATTEMPT_PAUSE_MS", default_value = "100")]
    pub attempt_pause_ms: u64,

    /// Upper bound for one complete liveness check over all strategies, in milliseconds.
    /// Attempts are cut short (or skipped) once this is used up.
    #[arg(long, env = "PROBE_BUDGET_MS", default_value = "7000")]
    pub probe_budget_ms: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            http_timeout_ms: 2000,
            tcp_timeout_ms: 1000,
            attempt_pause_ms: 100,
            probe_budget_ms: 7000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Any HTTP response, including error statuses. `None` means the scheme's default port.
    Http { port: Option<u16> },
    /// A completed TCP handshake.
    Tcp { port: u16 },
}

impl Strategy {
    pub fn is_http(&self) -> bool {
        matches!(self, Strategy::Http { .. })
    }

    fn socket_addr(&self, host: IpAddr) -> SocketAddr {
        match self {
            Strategy::Http { port } => SocketAddr::new(host, port.unwrap_or(DEFAULT_HTTP_PORT)),
            Strategy::Tcp { port } => SocketAddr::new(host, *port),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Http { port: None } => write!(f, "HTTP (default port)"),
            Strategy::Http { port: Some(port) } => write!(f, "HTTP on port {}", port),
            Strategy::Tcp { port: 22 } => write!(f, "TCP port 22 (SSH)"),
            Strategy::Tcp { port } => write!(f, "TCP port {}", port),
        }
    }
}

/// Outcome of one liveness check. Not alive is an ordinary result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub alive: bool,
    /// Which strategy answered, if any.
    pub strategy: Option<Strategy>,
}

impl ProbeResult {
    pub fn alive_via(strategy: Strategy) -> Self {
        Self {
            alive: true,
            strategy: Some(strategy),
        }
    }

    pub fn not_alive() -> Self {
        Self {
            alive: false,
            strategy: None,
        }
    }
}

#[async_trait]
pub trait LivenessCheck: Send + Sync {
    /// Must return in bounded time even if the host is entirely unreachable.
    async fn is_online(&self, host: IpAddr) -> ProbeResult;
}

/// Carries out a single strategy against a host, giving up after `limit`.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn attempt(&self, strategy: Strategy, host: IpAddr, limit: Duration) -> bool;
}

/// Talks to the host over the real network.
#[derive(Debug, Default)]
pub struct NetConnector;

#[async_trait]
impl Connector for NetConnector {
    async fn attempt(&self, strategy: Strategy, host: IpAddr, limit: Duration) -> bool {
        let addr = strategy.socket_addr(host);
        match strategy {
            Strategy::Http { .. } => http::responds(addr, limit).await,
            Strategy::Tcp { .. } => tcp::accepts(addr, limit).await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlannedAttempt {
    strategy: Strategy,
    timeout: Duration,
}

/// Tries each strategy in a fixed order. The first one answering counts as booted.
pub struct LivenessProbe {
    plan: Vec<PlannedAttempt>,
    pause: Duration,
    budget: Duration,
    connector: Box<dyn Connector>,
}

impl LivenessProbe {
    pub fn new(params: &Params) -> Self {
        Self::with_connector(params, Box::new(NetConnector))
    }

    pub fn with_connector(params: &Params, connector: Box<dyn Connector>) -> Self {
        let http = Duration::from_millis(params.http_timeout_ms);
        let tcp = Duration::from_millis(params.tcp_timeout_ms);
        let plan = vec![
            PlannedAttempt { strategy: Strategy::Http { port: None }, timeout: http },
            PlannedAttempt { strategy: Strategy::Http { port: Some(80) }, timeout: http },
            PlannedAttempt { strategy: Strategy::Http { port: Some(443) }, timeout: http },
            PlannedAttempt { strategy: Strategy::Tcp { port: 22 }, timeout: tcp },
            PlannedAttempt { strategy: Strategy::Tcp { port: 80 }, timeout: tcp },
        ];
        Self {
            plan,
            pause: Duration::from_millis(params.attempt_pause_ms),
            budget: Duration::from_millis(params.probe_budget_ms),
            connector,
        }
    }
}

#[async_trait]
impl LivenessCheck for LivenessProbe {
    async fn is_online(&self, host: IpAddr) -> ProbeResult {
        let deadline = Instant::now() + self.budget;
        let mut previous: Option<Strategy> = None;

        for planned in self.plan.iter() {
            if previous.map_or(false, |it| it.is_http()) && planned.strategy.is_http() {
                sleep(self.pause.min(deadline.saturating_duration_since(Instant::now()))).await;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("Probe budget for {} used up before trying {}", host, planned.strategy);
                break;
            }

            trace!("Trying {} against {}", planned.strategy, host);
            if self
                .connector
                .attempt(planned.strategy, host, planned.timeout.min(remaining))
                .await
            {
                info!("{} answers via {}", host, planned.strategy);
                return ProbeResult::alive_via(planned.strategy);
            }
            previous = Some(planned.strategy);
        }

        debug!("{} does not answer on any strategy", host);
        ProbeResult::not_alive()
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::{Arc, Mutex};

    use assertor::*;

    use super::*;

    const HOST: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7));

    struct ScriptedConnector {
        answering: Option<Strategy>,
        calls: Calls,
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn attempt(&self, strategy: Strategy, _host: IpAddr, limit: Duration) -> bool {
            self.calls.lock().unwrap().push((strategy, limit));
            self.answering == Some(strategy)
        }
    }

    type Calls = Arc<Mutex<Vec<(Strategy, Duration)>>>;

    fn given_probe(answering: Option<Strategy>, params: &Params) -> (LivenessProbe, Calls) {
        let calls = Arc::new(Mutex::new(vec![]));
        let connector = ScriptedConnector {
            answering,
            calls: calls.clone(),
        };
        (LivenessProbe::with_connector(params, Box::new(connector)), calls)
    }

    fn called(calls: &Calls) -> Vec<Strategy> {
        calls.lock().unwrap().iter().map(|(it, _)| *it).collect()
    }

    #[tokio::test]
    async fn first_http_success_skips_fallbacks() {
        // given
        let (probe, calls) = given_probe(Some(Strategy::Http { port: None }), &Params::default());

        // when
        let res = probe.is_online(HOST).await;

        // then
        assert_that!(res).is_equal_to(ProbeResult::alive_via(Strategy::Http { port: None }));
        assert_eq!(called(&calls), vec![Strategy::Http { port: None }]);
    }

    #[tokio::test]
    async fn falls_back_to_ssh_port_in_order() {
        // given
        let (probe, calls) = given_probe(Some(Strategy::Tcp { port: 22 }), &Params::default());

        // when
        let res = probe.is_online(HOST).await;

        // then
        assert_that!(res.alive).is_true();
        assert_that!(res.strategy).is_equal_to(Some(Strategy::Tcp { port: 22 }));
        assert_eq!(
            called(&calls),
            vec![
                Strategy::Http { port: None },
                Strategy::Http { port: Some(80) },
                Strategy::Http { port: Some(443) },
                Strategy::Tcp { port: 22 },
            ]
        );
    }

    #[tokio::test]
    async fn tries_everything_before_giving_up() {
        // given
        let (probe, calls) = given_probe(None, &Params::default());

        // when
        let res = probe.is_online(HOST).await;

        // then
        assert_that!(res).is_equal_to(ProbeResult::not_alive());
        assert_that!(called(&calls).len()).is_equal_to(5);
        let limits: Vec<Duration> = calls.lock().unwrap().iter().map(|(_, it)| *it).collect();
        assert_that!(limits[0]).is_equal_to(Duration::from_secs(2));
        assert_that!(limits[4]).is_equal_to(Duration::from_secs(1));
    }

    struct SilentConnector {
        attempts: Arc<Mutex<Vec<(Strategy, Instant)>>>,
    }

    #[async_trait]
    impl Connector for SilentConnector {
        async fn attempt(&self, strategy: Strategy, _host: IpAddr, _limit: Duration) -> bool {
            self.attempts.lock().unwrap().push((strategy, Instant::now()));
            false
        }
    }

    #[tokio::test]
    async fn pauses_only_between_http_attempts() {
        // given
        let params = Params {
            attempt_pause_ms: 300,
            ..Params::default()
        };
        let attempts = Arc::new(Mutex::new(vec![]));
        let connector = SilentConnector {
            attempts: attempts.clone(),
        };
        let check = LivenessProbe::with_connector(&params, Box::new(connector));

        // when
        check.is_online(HOST).await;

        // then
        let attempts = attempts.lock().unwrap().clone();
        assert_that!(attempts.len()).is_equal_to(5);
        let gaps: Vec<Duration> = attempts
            .windows(2)
            .map(|pair| pair[1].1.duration_since(pair[0].1))
            .collect();
        assert_that!(gaps[0]).is_at_least(Duration::from_millis(300));
        assert_that!(gaps[1]).is_at_least(Duration::from_millis(300));
        assert_that!(attempts[3].0).is_equal_to(Strategy::Tcp { port: 22 });
        assert_that!(gaps[2]).is_less_than(Duration::from_millis(150));
        assert_that!(gaps[3]).is_less_than(Duration::from_millis(150));
    }

    #[tokio::test]
    async fn exhausted_budget_skips_remaining_attempts() {
        // given
        let params = Params {
            probe_budget_ms: 0,
            ..Params::default()
        };
        let (probe, calls) = given_probe(Some(Strategy::Tcp { port: 80 }), &params);

        // when
        let res = probe.is_online(HOST).await;

        // then
        assert_that!(res.alive).is_false();
        assert!(called(&calls).is_empty());
    }

    #[test]
    fn strategies_are_described_for_humans() {
        assert_that!(Strategy::Tcp { port: 22 }.to_string()).is_equal_to("TCP port 22 (SSH)".to_string());
        assert_that!(Strategy::Http { port: Some(443) }.to_string())
            .is_equal_to("HTTP on port 443".to_string());
    }
}
