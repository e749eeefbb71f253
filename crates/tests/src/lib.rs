//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 双节点 e2e 测试 (LoopbackBackend 连接两个 dispatcher)

#[cfg(test)]
mod contract_tests {
    use contracts::{Header, PacketType, EVENT_DESTINATION};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_acknowledge_fits_request() {
        let request = Header::request(10, 1, 7);
        assert!(request.acknowledge().fits(&request));
        assert!(Header::response(1, 10, 7).fits(&request));
        assert!(!Header::response(1, 10, 8).fits(&request));
        assert_eq!(Header::event(3, 1).destination, EVENT_DESTINATION);
        assert_eq!(
            request.with_type(PacketType::Timeout).packet_type,
            PacketType::Timeout
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        DeliverInfo, DispatcherConfig, Header, ManualClock, PacketType, Payload,
    };
    use dispatcher::{
        create_dispatcher, ComponentPostman, Dispatcher, DispatcherBuilder, LoopbackBackend,
    };
    use observability::RequestStatsAggregator;
    use tokio::sync::oneshot;

    const ACK_TIMEOUT: Duration = Duration::from_millis(100);
    const CLIENT: u8 = 1;
    const SERVER: u8 = 10;

    type Node = Dispatcher<LoopbackBackend, ComponentPostman, ManualClock>;
    type Answers = Arc<Mutex<Vec<(Header, Vec<u8>)>>>;

    fn node(backend: LoopbackBackend, clock: &ManualClock) -> Node {
        DispatcherBuilder::new(backend, ComponentPostman::new())
            .config(DispatcherConfig::default())
            .clock(clock.clone())
            .build()
            .unwrap()
    }

    /// `SERVER` on `node` answers every request with its own payload
    fn install_echo<C: contracts::Clock>(
        node: &mut Dispatcher<LoopbackBackend, ComponentPostman, C>,
    ) {
        let handle = node.handle();
        node.postman_mut()
            .register(SERVER, move |header: &Header, payload: &Payload| {
                let response =
                    Header::response(header.source, header.destination, header.packet_identifier);
                handle.add_response(response, payload.clone()).unwrap();
                DeliverInfo::Ok
            });
    }

    fn client_postman() -> ComponentPostman {
        ComponentPostman::new().with_component(CLIENT, |_: &Header, _: &Payload| DeliverInfo::Ok)
    }

    fn recorder(answers: &Answers) -> impl FnOnce(&Header, &Payload) + Send + 'static {
        let answers = Arc::clone(answers);
        move |header: &Header, payload: &Payload| {
            answers.lock().unwrap().push((*header, payload.to_vec()));
        }
    }

    /// client 节点与 echo 节点，共享一个手动时钟
    fn echo_pair(client_link: LoopbackBackend, server_link: LoopbackBackend) -> (Node, Node, ManualClock) {
        let clock = ManualClock::new();
        let mut client = node(client_link, &clock);
        *client.postman_mut() = client_postman();
        let mut server = node(server_link, &clock);
        install_echo(&mut server);
        (client, server, clock)
    }

    #[test]
    fn test_request_response_round_trip() {
        let (a, b) = LoopbackBackend::pair("client", "server");
        let (mut client, mut server, _clock) = echo_pair(a, b);
        let answers = Answers::default();

        client.add_message_with_callback(
            Header::request(SERVER, CLIENT, 7),
            b"ping".to_vec(),
            recorder(&answers),
        );

        client.update(); // request out
        server.update(); // ack + response out
        client.update(); // ack, response, ack of response out
        server.update(); // response acknowledged

        let answers = answers.lock().unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].0, Header::response(CLIENT, SERVER, 7));
        assert_eq!(answers[0].1, b"ping".to_vec());
        assert!(client.is_empty());
        assert!(server.is_empty());

        assert_eq!(client.snapshot().acks_sent, 1);
        assert_eq!(server.snapshot().acks_sent, 1);
        assert_eq!(client.snapshot().responses_delivered, 1);
        assert_eq!(client.snapshot().unmatched, 0);
    }

    #[test]
    fn test_lost_response_is_retransmitted() {
        let (a, b) = LoopbackBackend::pair("client", "server");
        // server link: ack (#1) goes through, response (#2) is lost
        let (mut client, mut server, clock) = echo_pair(a, b.drop_every(2));
        let answers = Answers::default();

        client.add_message_with_callback(
            Header::request(SERVER, CLIENT, 3),
            b"retry".to_vec(),
            recorder(&answers),
        );

        client.update();
        server.update();
        client.update();
        assert!(answers.lock().unwrap().is_empty());
        assert_eq!(server.len(), 1);

        clock.advance(ACK_TIMEOUT);
        server.update(); // response retransmitted (#3)
        client.update();
        server.update();

        assert_eq!(answers.lock().unwrap().len(), 1);
        assert_eq!(answers.lock().unwrap()[0].0.packet_type, PacketType::Response);
        assert_eq!(server.snapshot().retransmissions, 1);
        assert_eq!(server.backend().lost_count(), 1);
        assert!(client.is_empty());
        assert!(server.is_empty());
    }

    #[test]
    fn test_unreachable_component_times_out() {
        let (a, b) = LoopbackBackend::pair("client", "server");
        let clock = ManualClock::new();
        let mut client = node(a, &clock);
        *client.postman_mut() = client_postman();
        // no component 10 over there
        let mut server = node(b, &clock);
        let answers = Answers::default();

        client.add_message_with_callback(
            Header::request(SERVER, CLIENT, 1),
            b"anyone?".to_vec(),
            recorder(&answers),
        );

        for _ in 0..3 {
            client.update();
            server.update();
            clock.advance(ACK_TIMEOUT);
        }
        assert!(answers.lock().unwrap().is_empty());

        client.update();

        let answers = answers.lock().unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(
            answers[0].0,
            Header::request(SERVER, CLIENT, 1).with_type(PacketType::Timeout)
        );
        assert_eq!(client.snapshot().packets_sent, 3);
        assert_eq!(client.snapshot().timeouts, 1);
        assert_eq!(server.snapshot().packets_received, 3);
        assert_eq!(server.snapshot().acks_sent, 0);
        assert_eq!(server.snapshot().delivery_failures, 3);
    }

    #[test]
    fn test_events_cross_nodes_without_acknowledge() {
        let (a, b) = LoopbackBackend::pair("publisher", "subscriber");
        let clock = ManualClock::new();
        let mut publisher = node(a, &clock);
        let mut subscriber = node(b, &clock);

        let seen = Arc::new(AtomicU64::new(0));
        for component in [1, 2] {
            let seen = Arc::clone(&seen);
            subscriber
                .postman_mut()
                .subscribe(component, move |header: &Header, _: &Payload| {
                    assert!(header.is_event());
                    seen.fetch_add(1, Ordering::Relaxed);
                });
        }

        publisher.add_event(SERVER, 4, b"state".to_vec());
        publisher.update();
        assert!(publisher.is_empty());

        subscriber.update();
        publisher.update();

        assert_eq!(seen.load(Ordering::Relaxed), 2);
        assert_eq!(subscriber.snapshot().acks_sent, 0);
        assert_eq!(publisher.snapshot().packets_received, 0);
    }

    #[test]
    fn test_blueprint_configured_nodes_round_trip() {
        let config = r#"
[node]
name = "board-a"

[dispatcher]
ack_timeout_ms = 50

[[components]]
id = 1
name = "driver"

[[peers]]
id = 10
name = "sensor-hub"
"#;
        let blueprint = ConfigLoader::load_from_str(config, ConfigFormat::Toml).unwrap();
        let (a, b) = LoopbackBackend::pair("board-a", "board-b");

        let mut client = create_dispatcher(&blueprint, a, client_postman()).unwrap();
        let mut server = create_dispatcher(&blueprint, b, ComponentPostman::new()).unwrap();
        install_echo(&mut server);
        assert_eq!(client.config().ack_timeout(), Duration::from_millis(50));

        let stats = Arc::new(Mutex::new(RequestStatsAggregator::new()));
        for id in 0..4u8 {
            stats.lock().unwrap().request_sent();
            let stats = Arc::clone(&stats);
            client.add_message_with_callback(
                Header::request(SERVER, CLIENT, id),
                vec![id],
                move |header: &Header, payload: &Payload| {
                    assert_eq!(payload.to_vec(), vec![id]);
                    stats.lock().unwrap().update(header.packet_type, 0.0);
                },
            );
        }

        for _ in 0..4 {
            client.update();
            server.update();
        }

        let summary = stats.lock().unwrap().summary();
        assert_eq!(summary.requests, 4);
        assert_eq!(summary.responses, 4);
        assert_eq!(summary.outstanding, 0);
    }

    #[tokio::test]
    async fn test_handle_submits_from_another_task() {
        let (a, b) = LoopbackBackend::pair("client", "server");
        let (mut client, mut server, _clock) = echo_pair(a, b);

        let handle = client.handle();
        let (tx, mut rx) = oneshot::channel();
        tokio::spawn(async move {
            handle
                .add_message_with_callback(
                    Header::request(SERVER, CLIENT, 42),
                    b"async".to_vec(),
                    move |header: &Header, payload: &Payload| {
                        let _ = tx.send((*header, payload.to_vec()));
                    },
                )
                .unwrap();
        })
        .await
        .unwrap();

        let answer = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                client.update();
                server.update();
                match rx.try_recv() {
                    Ok(answer) => break answer,
                    Err(oneshot::error::TryRecvError::Empty) => tokio::task::yield_now().await,
                    Err(e) => panic!("callback dropped: {e}"),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(answer.0, Header::response(CLIENT, SERVER, 42));
        assert_eq!(answer.1, b"async".to_vec());
    }

    #[test]
    fn test_handle_outlives_dispatcher() {
        let clock = ManualClock::new();
        let client = node(LoopbackBackend::new("client"), &clock);
        let handle = client.handle();
        drop(client);

        assert!(handle.is_closed());
        assert!(handle.add_event(CLIENT, 1, b"late".to_vec()).is_err());
    }
}
