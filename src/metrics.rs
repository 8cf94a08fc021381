//! Prometheus-compatible metrics endpoint
//!
//! Exposes simulation and API counters in Prometheus text format.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::net::http::{self, Method, Request, Response};

const TICK_HISTORY: usize = 1000;

/// Metrics registry for the star server
#[derive(Debug)]
pub struct Metrics {
    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,

    // Tick counter
    pub tick_count: AtomicU64,

    // Control API
    pub commands_accepted: AtomicU64,
    pub commands_rejected: AtomicU64,
    pub commands_noop: AtomicU64,
    pub http_requests: AtomicU64,

    // Star state
    pub wall_collisions: AtomicU64,
    pub effects_expired: AtomicU64,
    pub active_effect: AtomicU64, // 0=none, 1=shrink, 2=spin_out, 3=drill, 4=corner_trap
    pub color_override: AtomicU64, // 0 or 1
    pub opacity_override: AtomicU64, // 0 or 1
    pub eyes_enabled: AtomicU64,   // 0 or 1

    start_time: Instant,

    // Rolling tick times for percentile calculation
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            commands_accepted: AtomicU64::new(0),
            commands_rejected: AtomicU64::new(0),
            commands_noop: AtomicU64::new(0),
            http_requests: AtomicU64::new(0),
            wall_collisions: AtomicU64::new(0),
            effects_expired: AtomicU64::new(0),
            active_effect: AtomicU64::new(0),
            color_override: AtomicU64::new(0),
            opacity_override: AtomicU64::new(0),
            eyes_enabled: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(4096);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        // Performance metrics
        metric!("star_theater_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("star_theater_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("star_theater_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("star_theater_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("star_theater_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));

        // Control API
        metric!("star_theater_commands_accepted_total", "Commands applied to the star", "counter",
            self.commands_accepted.load(Ordering::Relaxed));
        metric!("star_theater_commands_rejected_total", "Commands rejected by validation", "counter",
            self.commands_rejected.load(Ordering::Relaxed));
        metric!("star_theater_commands_noop_total", "Accepted commands that changed nothing", "counter",
            self.commands_noop.load(Ordering::Relaxed));
        metric!("star_theater_http_requests_total", "HTTP requests served", "counter",
            self.http_requests.load(Ordering::Relaxed));

        // Star state
        metric!("star_theater_wall_collisions_total", "Wall collisions", "counter",
            self.wall_collisions.load(Ordering::Relaxed));
        metric!("star_theater_effects_expired_total", "Exclusive effects that ran to completion", "counter",
            self.effects_expired.load(Ordering::Relaxed));
        metric!("star_theater_active_effect", "Active effect (0=none, 1=shrink, 2=spin_out, 3=drill, 4=corner_trap)", "gauge",
            self.active_effect.load(Ordering::Relaxed));
        metric!("star_theater_color_override", "Color overlay active (0/1)", "gauge",
            self.color_override.load(Ordering::Relaxed));
        metric!("star_theater_opacity_override", "Opacity overlay active (0/1)", "gauge",
            self.opacity_override.load(Ordering::Relaxed));
        metric!("star_theater_eyes_enabled", "Googly eyes enabled (0/1)", "gauge",
            self.eyes_enabled.load(Ordering::Relaxed));
        metric!("star_theater_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// JSON form of the same numbers
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "performance": {
                "tick_time_us": self.tick_time_us.load(Ordering::Relaxed),
                "tick_time_p95_us": self.tick_time_p95_us.load(Ordering::Relaxed),
                "tick_time_p99_us": self.tick_time_p99_us.load(Ordering::Relaxed),
                "tick_time_max_us": self.tick_time_max_us.load(Ordering::Relaxed),
                "tick_count": self.tick_count.load(Ordering::Relaxed),
            },
            "api": {
                "commands_accepted": self.commands_accepted.load(Ordering::Relaxed),
                "commands_rejected": self.commands_rejected.load(Ordering::Relaxed),
                "commands_noop": self.commands_noop.load(Ordering::Relaxed),
                "http_requests": self.http_requests.load(Ordering::Relaxed),
            },
            "star": {
                "wall_collisions": self.wall_collisions.load(Ordering::Relaxed),
                "effects_expired": self.effects_expired.load(Ordering::Relaxed),
                "active_effect": self.active_effect.load(Ordering::Relaxed),
                "color_override": self.color_override.load(Ordering::Relaxed) == 1,
                "opacity_override": self.opacity_override.load(Ordering::Relaxed) == 1,
                "eyes_enabled": self.eyes_enabled.load(Ordering::Relaxed) == 1,
            },
            "uptime_seconds": self.uptime_seconds(),
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn route(metrics: &Metrics, request: &Request) -> Response {
    match (request.method, request.path.as_str()) {
        (Method::Options, _) => Response::no_content(),
        (Method::Get, "/metrics") => Response::prometheus(metrics.to_prometheus()),
        (Method::Get, "/metrics/json") => Response::json(200, &metrics.to_json()),
        (Method::Get, "/health") => Response::text(200, "OK"),
        (_, "/metrics" | "/metrics/json" | "/health") => Response::error(405, "Method not allowed"),
        _ => Response::error(404, "Not found"),
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(
    metrics: Arc<Metrics>,
    bind_address: IpAddr,
    port: u16,
) -> anyhow::Result<()> {
    let addr = SocketAddr::new(bind_address, port);
    let mut listener = TcpListener::bind(addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (socket, peer) = http::next_connection(&mut listener).await;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, &metrics).await {
                debug!("Metrics connection {} ended with error: {}", peer, e);
            }
        });
    }
}

async fn handle_connection<S>(mut stream: S, metrics: &Metrics) -> Result<(), http::HttpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response = match http::read_request_within(&mut stream, http::READ_TIMEOUT).await {
        Ok(request) => route(metrics, &request),
        Err(e) => match http::error_response(&e) {
            Some(response) => response,
            None => return Err(e),
        },
    };
    http::write_response(&mut stream, &response).await
}
