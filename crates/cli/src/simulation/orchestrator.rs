//! Simulation orchestrator - two dispatchers joined by an in-memory link.
//!
//! 本地节点按配置中的 `components` 运行，远端节点承载全部 `peers`。
//! 第一个本地组件向各 peer 轮流发出带回调的请求，peer 原样回显负载
//! 并发布一个事件。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Result;
use contracts::{DeliverInfo, Header, NodeBlueprint, Payload};
use dispatcher::{
    create_dispatcher, ComponentPostman, Dispatcher, DispatcherBuilder, LoopbackBackend,
};
use observability::{record_dispatcher_snapshot, record_request_outcome, record_round_trip_ms};
use observability::RequestStatsAggregator;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, info_span, warn};

use super::SimulationStats;
use crate::error::CliError;

/// Name of the simulated node hosting the peers
pub const REMOTE_NODE: &str = "remote";

type SimDispatcher = Dispatcher<LoopbackBackend, ComponentPostman>;
type SharedOutcomes = Arc<Mutex<RequestStatsAggregator>>;

fn lock(outcomes: &SharedOutcomes) -> MutexGuard<'_, RequestStatsAggregator> {
    outcomes.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Node configuration, peers are hosted by the simulated remote node
    pub blueprint: NodeBlueprint,

    /// Number of callback requests to issue
    pub requests: u32,

    /// Lose every N-th packet in both directions (None = lossless)
    pub loss_every: Option<u64>,

    /// Interval between update() calls
    pub tick: Duration,

    /// Simulation timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Two-node request/response simulation
pub struct Simulation {
    config: SimulationConfig,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Run until every request has an outcome or the timeout expires
    pub async fn run(self) -> Result<SimulationStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let client = blueprint
            .components
            .first()
            .ok_or_else(|| CliError::simulation("no local components configured"))?
            .id;
        if blueprint.peers.is_empty() {
            return Err(CliError::simulation("no peers configured").into());
        }

        let (mut local_link, mut remote_link) =
            LoopbackBackend::pair(blueprint.node.name.clone(), REMOTE_NODE);
        local_link = local_link.recording(false);
        remote_link = remote_link.recording(false);
        if let Some(n) = self.config.loss_every {
            local_link = local_link.drop_every(n);
            remote_link = remote_link.drop_every(n);
        }

        let events_received = Arc::new(AtomicU64::new(0));
        let mut local = create_dispatcher(
            blueprint,
            local_link,
            local_postman(blueprint, &events_received),
        )?;
        let mut remote = DispatcherBuilder::new(remote_link, ComponentPostman::new())
            .config(blueprint.dispatcher.clone())
            .span(info_span!("dispatcher", node = REMOTE_NODE))
            .build()?;
        register_peers(blueprint, &mut remote);

        let outcomes = SharedOutcomes::default();
        self.issue_requests(&mut local, client, &outcomes);

        info!(
            node = %blueprint.node.name,
            client,
            peers = blueprint.peers.len(),
            requests = self.config.requests,
            "Simulation started"
        );

        let mut interval = tokio::time::interval(self.config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let deadline = self.config.timeout.map(|timeout| start_time + timeout);
        let mut ticks = 0u64;

        let timed_out = loop {
            interval.tick().await;
            ticks += 1;

            local.update();
            remote.update();
            record_dispatcher_snapshot(&blueprint.node.name, &local.snapshot());
            record_dispatcher_snapshot(REMOTE_NODE, &remote.snapshot());

            if lock(&outcomes).completed() >= u64::from(self.config.requests) {
                break false;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!(
                    outstanding = local.len(),
                    "Simulation timeout reached, stopping"
                );
                break true;
            }
        };

        let requests = lock(&outcomes).clone();
        Ok(SimulationStats {
            duration: start_time.elapsed(),
            ticks,
            timed_out,
            events_received: events_received.load(Ordering::Relaxed),
            packets_lost: local.backend().lost_count() + remote.backend().lost_count(),
            local: local.snapshot(),
            remote: remote.snapshot(),
            requests,
        })
    }

    fn issue_requests(&self, local: &mut SimDispatcher, client: u8, outcomes: &SharedOutcomes) {
        let node = self.config.blueprint.node.name.clone();
        let peers = &self.config.blueprint.peers;

        for i in 0..self.config.requests {
            let peer = &peers[i as usize % peers.len()];
            // identifiers wrap, collisions need more than 256 requests in flight per peer
            let header = Header::request(peer.id, client, (i % 256) as u8);
            let sent_at = Instant::now();
            let outcomes = Arc::clone(outcomes);
            let node = node.clone();

            lock(&outcomes).request_sent();
            local.add_message_with_callback(
                header,
                format!("ping {i}").into_bytes(),
                move |answer: &Header, _payload: &Payload| {
                    let round_trip_ms = sent_at.elapsed().as_secs_f64() * 1000.0;
                    debug!(%answer, round_trip_ms, "request finished");
                    record_request_outcome(&node, answer.packet_type);
                    record_round_trip_ms(&node, round_trip_ms);
                    lock(&outcomes).update(answer.packet_type, round_trip_ms);
                },
            );
        }
    }
}

/// Local components accept everything and count the events they observe
fn local_postman(blueprint: &NodeBlueprint, events: &Arc<AtomicU64>) -> ComponentPostman {
    let mut postman = ComponentPostman::new();
    for component in &blueprint.components {
        let name = component.name.clone();
        postman.register(component.id, move |header: &Header, _payload: &Payload| {
            debug!(component = %name, %header, "action call received");
            DeliverInfo::Ok
        });

        let events = Arc::clone(events);
        postman.subscribe(component.id, move |_header: &Header, _payload: &Payload| {
            events.fetch_add(1, Ordering::Relaxed);
        });
    }
    postman
}

/// Every peer echoes the request payload and announces the answer as an event
fn register_peers(blueprint: &NodeBlueprint, remote: &mut SimDispatcher) {
    let handle = remote.handle();
    for peer in &blueprint.peers {
        let handle = handle.clone();
        let peer_id = peer.id;
        remote
            .postman_mut()
            .register(peer_id, move |header: &Header, payload: &Payload| {
                let response =
                    Header::response(header.source, header.destination, header.packet_identifier);
                let answered = handle
                    .add_response(response, payload.clone())
                    .and_then(|()| handle.add_event(peer_id, header.packet_identifier, payload.clone()));
                match answered {
                    Ok(()) => DeliverInfo::Ok,
                    Err(e) => {
                        warn!(error = %e, "peer could not answer");
                        DeliverInfo::Error
                    }
                }
            });
    }
}
