//! # Replication Tests
//!
//! Authority → wire → projection, checked against the authoritative state.

use std::time::Duration;

use frontier_core::{Executor, GameConfig};
use frontier_networking::protocol::{decode_server, encode_server};
use frontier_networking::server::NetworkEvent;
use frontier_networking::{
    launch, ClientConfig, ClientSession, ClientTransport, ConnectionState, GameServer, GameView,
    NetworkError, ReconnectPolicy, SendOutcome, ServerConfig,
};
use frontier_shared::{
    AllianceReplyIntent, AllianceRequestIntent, AllianceUpdate, AttackIntent, BuildUnitIntent, Cell,
    ClientId, ClientIntentMessage, ClientMessage, Intent, PlayerId, PlayerType, ServerMessage,
    SpawnIntent, UnitType, UpdateBatch,
};
use tokio::sync::mpsc::unbounded_channel;

const SPAWN_TICKS: u64 = 5;

fn game_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.spawn_phase_ticks = SPAWN_TICKS;
    config.map.width = 30;
    config.map.height = 30;
    config.map.spawn_radius = 3;
    config.economy.starting_troops = 1_000;
    config.economy.starting_gold = 1_000_000;
    config.combat.tiles_per_tick = 2;
    config
}

fn client(player: &str) -> ClientId {
    ClientId::new(format!("client-{player}"))
}

fn spawn(player: &str, x: i32, y: i32) -> Intent {
    Intent::Spawn(SpawnIntent {
        client_id: client(player),
        player_id: player.into(),
        name: player.into(),
        player_type: PlayerType::Human,
        x,
        y,
    })
}

fn attack(attacker: &str, target: Option<&str>) -> Intent {
    Intent::Attack(AttackIntent {
        client_id: client(attacker),
        attacker_id: attacker.into(),
        target_id: target.map(Into::into),
        troops: None,
        source_x: None,
        source_y: None,
        target_x: None,
        target_y: None,
    })
}

fn ally(requestor: &str, recipient: &str) -> [Intent; 2] {
    [
        Intent::AllianceRequest(AllianceRequestIntent {
            client_id: client(requestor),
            requestor: requestor.into(),
            recipient: recipient.into(),
        }),
        Intent::AllianceRequestReply(AllianceReplyIntent {
            client_id: client(recipient),
            requestor: requestor.into(),
            recipient: recipient.into(),
            accept: true,
        }),
    ]
}

fn build_city(player: &str, x: i32, y: i32) -> Intent {
    Intent::BuildUnit(BuildUnitIntent {
        client_id: client(player),
        player_id: player.into(),
        unit_type: UnitType::City,
        x,
        y,
    })
}

/// Runs a short scripted game and returns every batch it produced.
fn scripted(ex: &mut Executor) -> Vec<UpdateBatch> {
    let mut batches = Vec::new();
    let mut run = |ex: &mut Executor, ticks: u64| {
        for _ in 0..ticks {
            batches.push(ex.tick());
        }
    };
    ex.submit(spawn("P1", 10, 10));
    ex.submit(spawn("P2", 17, 10));
    ex.submit(spawn("P3", 10, 20));
    run(ex, SPAWN_TICKS);
    let [request, reply] = ally("P1", "P3");
    ex.submit(request);
    ex.submit(attack("P1", Some("P2")));
    ex.submit(build_city("P2", 17, 10));
    run(ex, 1);
    ex.submit(reply);
    ex.submit(attack("P3", None));
    run(ex, 25);
    batches
}

/// Pushes a message through the server codec, compression included.
fn over_the_wire(message: &ServerMessage) -> ServerMessage {
    let frame = encode_server(message, 256).unwrap();
    decode_server(&frame.into()).unwrap().unwrap()
}

fn snapshot_of(ex: &Executor) -> ServerMessage {
    ServerMessage::Snapshot {
        game_id: "g1".into(),
        snapshot: ex.game().snapshot(),
    }
}

fn turn(batch: UpdateBatch) -> ServerMessage {
    ServerMessage::Turn {
        game_id: "g1".into(),
        batch,
    }
}

fn apply(view: &mut GameView, message: ServerMessage) -> Result<(), NetworkError> {
    match message {
        ServerMessage::Snapshot { snapshot, .. } => view.apply_snapshot(snapshot),
        ServerMessage::Turn { batch, .. } => view.apply_batch(&batch).map(|_| ()),
        ServerMessage::Error { message } => panic!("unexpected error frame: {message}"),
    }
}

// =============================================================================
// Projection round trip
// =============================================================================

/// Test: initial snapshot plus every batch rebuilds the authoritative state.
#[test]
fn test_projection_matches_authority_from_start() {
    let mut ex = Executor::new(game_config()).unwrap();
    let mut view = GameView::new();
    apply(&mut view, over_the_wire(&snapshot_of(&ex))).unwrap();

    for batch in scripted(&mut ex) {
        apply(&mut view, over_the_wire(&turn(batch))).unwrap();
    }

    assert_eq!(view.tick(), ex.game().ticks());
    assert_eq!(view.to_snapshot(), ex.game().snapshot());
    assert!(view.is_allied(&"P1".into(), &"P3".into()));
    assert!(view.active_units().any(|u| u.unit_type == UnitType::City));
}

/// Test: a client joining mid-game catches up from a snapshot at that tick.
#[test]
fn test_late_joiner_catches_up() {
    let mut ex = Executor::new(game_config()).unwrap();
    let batches = scripted(&mut ex);
    assert!(!batches.is_empty());

    let mut view = GameView::new();
    apply(&mut view, over_the_wire(&snapshot_of(&ex))).unwrap();
    ex.submit(attack("P2", Some("P1")));
    for _ in 0..10 {
        let batch = ex.tick();
        apply(&mut view, over_the_wire(&turn(batch))).unwrap();
    }
    assert_eq!(view.to_snapshot(), ex.game().snapshot());
}

/// Test: an unanswered alliance request times out through the tick loop and
/// the projection drops it.
#[test]
fn test_unanswered_alliance_request_expires_in_view() {
    const TTL: u64 = 4;
    let mut config = game_config();
    config.alliances.request_ticks = TTL;
    let mut ex = Executor::new(config).unwrap();
    let mut view = GameView::new();
    view.apply_snapshot(ex.game().snapshot()).unwrap();
    let step = |ex: &mut Executor, view: &mut GameView| {
        let batch = ex.tick();
        view.apply_batch(&batch).unwrap();
        batch
    };

    ex.submit(spawn("P1", 5, 5));
    ex.submit(spawn("P2", 20, 20));
    for _ in 0..SPAWN_TICKS {
        step(&mut ex, &mut view);
    }
    let (p1, p2): (PlayerId, PlayerId) = ("P1".into(), "P2".into());
    let [request, _] = ally("P1", "P2");
    ex.submit(request);

    let mut created = None;
    let mut expired = None;
    for _ in 0..(TTL + 5) {
        let batch = step(&mut ex, &mut view);
        for update in &batch.updates.alliances {
            match update {
                AllianceUpdate::RequestCreated { .. } => created = Some(batch.tick),
                AllianceUpdate::RequestExpired { requestor, recipient } => {
                    assert_eq!((requestor, recipient), (&p1, &p2));
                    expired = Some(batch.tick);
                }
                other => panic!("unexpected alliance update: {other:?}"),
            }
        }
        if created.is_some() && expired.is_none() {
            assert!(view.has_request(&p1, &p2));
        }
    }

    let created = created.expect("request never created");
    assert_eq!(expired, Some(created + TTL));
    assert!(!view.has_request(&p1, &p2));
    assert!(!view.is_allied(&p1, &p2));
    assert_eq!(view.to_snapshot(), ex.game().snapshot());
}

// =============================================================================
// Gap detection and resync
// =============================================================================

/// Test: a missed batch is detected and a fresh snapshot recovers the view.
#[test]
fn test_gap_detected_then_snapshot_resync() {
    let mut ex = Executor::new(game_config()).unwrap();
    let mut view = GameView::new();
    view.apply_snapshot(ex.game().snapshot()).unwrap();

    let mut batches = scripted(&mut ex).into_iter();
    for batch in batches.by_ref().take(6) {
        view.apply_batch(&batch).unwrap();
    }
    let lost = batches.next().unwrap();
    let after_gap = batches.next().unwrap();
    let before = view.to_snapshot();

    let err = view.apply_batch(&after_gap).unwrap_err();
    assert!(matches!(err, NetworkError::Desync { expected, got } if expected == lost.tick && got == lost.tick + 1));
    assert!(view.needs_resync());
    assert_eq!(view.to_snapshot(), before);

    view.apply_snapshot(ex.game().snapshot()).unwrap();
    assert!(!view.needs_resync());
    let next = ex.tick();
    view.apply_batch(&next).unwrap();
    assert_eq!(view.to_snapshot(), ex.game().snapshot());
}

// =============================================================================
// Connection health
// =============================================================================

/// Test: an intent sent while the transport is not open changes nothing and
/// asks for a reconnect.
#[test]
fn test_send_while_closed_mutates_nothing() {
    let mut server = GameServer::new(ServerConfig::default()).unwrap();

    let mut transport = ClientTransport::new(client("P1"), "frontier".into(), ReconnectPolicy::default());
    assert_eq!(transport.state(), ConnectionState::Closed);
    let outcome = transport.spawn(&"P1".into(), "P1", PlayerType::Human, Cell::new(5, 5));
    assert_eq!(outcome, SendOutcome::Dropped);
    assert!(transport.take_reconnect_request());

    server.tick();
    assert!(!server.executor().game().has_player(&"P1".into()));
    assert_eq!(server.executor().game().players().count(), 0);
    assert_eq!(server.executor().game().ticks(), 1);
    assert_eq!(server.handle().status().intents_admitted, 0);
}

// =============================================================================
// Server without sockets
// =============================================================================

/// Test: a joined connection's frames alone keep a view equal to the server.
#[test]
fn test_server_frames_drive_view() {
    let mut config = ServerConfig::default();
    config.server.game_id = "g1".into();
    config.server.compression_threshold = 512;
    config.game = game_config();
    let mut server = GameServer::new(config).unwrap();
    let handle = server.handle();

    let conn = handle.next_connection_id();
    let (tx, mut rx) = unbounded_channel();
    assert!(handle.send(NetworkEvent::ClientConnected { conn, outbound: tx }));
    let say = |message: ClientMessage| {
        assert!(handle.send(NetworkEvent::MessageReceived { conn, message }));
    };
    let intent = |intent: Intent| ClientMessage::Intent(ClientIntentMessage::new("g1".into(), intent));

    server.tick();
    say(ClientMessage::Join {
        client_id: client("P1"),
        game_id: "g1".into(),
    });
    say(intent(spawn("P1", 10, 10)));
    for _ in 0..SPAWN_TICKS {
        server.tick();
    }
    say(intent(attack("P1", None)));
    for _ in 0..10 {
        server.tick();
    }

    let mut view = GameView::new();
    let mut frames = 0;
    while let Ok(frame) = rx.try_recv() {
        let message = decode_server(&frame.into()).unwrap().unwrap();
        apply(&mut view, message).unwrap();
        frames += 1;
    }
    assert_eq!(frames, 1 + SPAWN_TICKS as usize + 10);
    assert_eq!(view.to_snapshot(), server.executor().game().snapshot());
    assert!(view.player(&"P1".into()).is_some_and(|p| p.tiles_owned > 0));
}

// =============================================================================
// Real sockets
// =============================================================================

/// Test: a client session over a real WebSocket spawns and tracks the game.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_over_websocket() {
    let mut config = ServerConfig::default();
    config.server.bind = "127.0.0.1:0".into();
    config.server.tick_interval_ms = 10;
    config.server.game_id = "g1".into();
    config.game = game_config();
    config.game.spawn_phase_ticks = 1_000;
    let running = launch(GameServer::new(config).unwrap()).await.unwrap();

    let session = std::sync::Arc::new(ClientSession::new(ClientConfig {
        server_url: format!("ws://{}", running.local_addr),
        client_id: client("P1"),
        game_id: "g1".into(),
        ..ClientConfig::default()
    }));
    let runner = {
        let session = session.clone();
        tokio::spawn(async move { session.run().await })
    };

    let view = session.view();
    let transport = session.transport();
    let synced = tokio::time::timeout(Duration::from_secs(5), async {
        while !(view.read().is_synced() && transport.lock().is_open()) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(synced.is_ok(), "never synced");

    let sent = transport
        .lock()
        .spawn(&"P1".into(), "P1", PlayerType::Human, Cell::new(10, 10));
    assert_eq!(sent, SendOutcome::Sent);

    let spawned = tokio::time::timeout(Duration::from_secs(5), async {
        while view.read().player(&"P1".into()).is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(spawned.is_ok(), "spawn never replicated");

    session.stop();
    runner.await.unwrap();
    let server = tokio::task::spawn_blocking(move || running.shutdown())
        .await
        .unwrap()
        .unwrap();
    let player = server.executor().game().player(&"P1".into()).unwrap();
    assert_eq!(player.client_id(), Some(&client("P1")));
    assert!(!view.read().needs_resync());
}

/// Test: once the backoff has given up, a dropped send starts a fresh
/// connection that reaches the server.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_send_reconnects_after_backoff_exhausted() {
    let addr = {
        let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        reserved.local_addr().unwrap()
    };
    let session = std::sync::Arc::new(ClientSession::new(ClientConfig {
        server_url: format!("ws://{addr}"),
        client_id: client("P1"),
        game_id: "g1".into(),
        reconnect_initial_ms: 5,
        reconnect_max_ms: 5,
        max_reconnect_attempts: Some(1),
    }));
    let runner = {
        let session = session.clone();
        tokio::spawn(async move { session.run().await })
    };
    let transport = session.transport();

    let exhausted = tokio::time::timeout(Duration::from_secs(5), async {
        while transport.lock().attempts() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(exhausted.is_ok(), "backoff never ran out");
    assert!(!runner.is_finished());

    let mut config = ServerConfig::default();
    config.server.bind = addr.to_string();
    config.server.tick_interval_ms = 10;
    config.server.game_id = "g1".into();
    config.game = game_config();
    let running = launch(GameServer::new(config).unwrap()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(running.handle.status().connections, 0);

    let sent = transport
        .lock()
        .spawn(&"P1".into(), "P1", PlayerType::Human, Cell::new(10, 10));
    assert_eq!(sent, SendOutcome::Dropped);

    let handle = running.handle.clone();
    let view = session.view();
    let rejoined = tokio::time::timeout(Duration::from_secs(5), async {
        while !(handle.status().joined == 1 && view.read().is_synced()) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(rejoined.is_ok(), "no connection after the dropped send");
    assert!(transport.lock().is_open());
    assert_eq!(transport.lock().attempts(), 0);

    session.stop();
    runner.await.unwrap();
    let server = tokio::task::spawn_blocking(move || running.shutdown())
        .await
        .unwrap()
        .unwrap();
    assert!(!server.executor().game().has_player(&"P1".into()));
}
