//! UDP gateway and the fixed-tick main loop
//!
//! The gateway owns the socket and the authoritative [`World`]. Inbound
//! datagrams are decoded on a receiver task and forwarded over a channel to
//! the main loop, which is the only place the world is mutated. Outbound
//! packets go the other way: the loop queues [`GameMessage`]s and a sender
//! task drains them onto the socket, so a slow send never stalls simulation.

use crate::client_manager::ClientManager;
use crate::game::{InputCommand, Outbound, World};
use crate::layout::ArenaLayout;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Power-ups top up on this cadence, independent of pickup respawns.
const POWER_UP_SPAWN_INTERVAL: Duration = Duration::from_secs(8);
/// The hill relocates on this cadence.
const HILL_MOVE_INTERVAL: Duration = Duration::from_millis(shared::HILL_MOVE_INTERVAL_MS);
/// Power-ups seeded into the arena before the first client connects.
const INITIAL_POWER_UPS: usize = 3;
/// State snapshots go out at most this often.
const STATE_BROADCAST_HZ: u32 = 30;
/// A stalled loop advances at most this much simulated time per tick.
const MAX_TICK_DT: f32 = 1.0 / 30.0;

/// Messages sent from network tasks to the main loop.
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the main loop to the sender task.
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// Main server coordinating the socket tasks and the simulation.
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    world: World,
    tick_duration: Duration,
    tick: u64,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_rate: u32,
        max_clients: usize,
        respawn_delay_ms: u64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let mut rng = StdRng::from_entropy();
        let layout = ArenaLayout::generate(&mut rng);
        info!(
            "Arena generated: {} walls, {} bushes, {} trees, {} power-up spawns",
            layout.walls.len(),
            layout.bushes.len(),
            layout.trees.len(),
            layout.power_up_spawns.len()
        );
        let world = World::new(layout, respawn_delay_ms, rng);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            world,
            tick_duration: Duration::from_secs(1) / tick_rate.max(1),
            tick: 0,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Spawns the task that continuously listens for incoming datagrams.
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outgoing packet queue.
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns the task that evicts silent connections.
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet, exclude: Option<u32>) {
        if let Err(e) = self
            .game_tx
            .send(GameMessage::BroadcastPacket { packet, exclude })
        {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Resolves simulation events to their recipients and queues them.
    async fn dispatch_events(&mut self, events: Vec<Outbound>) {
        if events.is_empty() {
            return;
        }

        let clients = self.clients.read().await;
        for event in events {
            match event {
                Outbound::Single { player_id, packet } => {
                    if let Some(addr) = clients.addr_of(player_id) {
                        self.send_packet(packet, addr);
                    }
                }
                Outbound::Broadcast { packet, exclude } => {
                    self.broadcast_packet(packet, exclude);
                }
            }
        }
    }

    /// Processes one inbound packet and updates the world.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        let mut events: Vec<Outbound> = Vec::new();

        match packet {
            Packet::Join { name } => {
                // A rejoin from the same address replaces the old session.
                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(existing_id) = existing_client_id {
                    info!("Replacing existing client {} from {}", existing_id, addr);
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&existing_id);
                    if self.world.remove_player(existing_id) {
                        events.push(Outbound::broadcast(Packet::PlayerLeft { id: existing_id }));
                    }
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                match client_id {
                    Some(client_id) => {
                        let snapshot = self.world.add_player(client_id, &name);
                        if let Some(joined) = self.world.joined_packet(client_id) {
                            self.send_packet(joined, addr);
                        }
                        events.push(Outbound::broadcast_except(
                            client_id,
                            Packet::PlayerJoined { player: snapshot },
                        ));
                    }
                    None => {
                        self.send_packet(
                            Packet::JoinError {
                                message: "Server is full".to_string(),
                            },
                            addr,
                        );
                    }
                }
            }

            Packet::Input {
                sequence,
                left,
                right,
                up,
                down,
                swing,
                ..
            } => {
                if let Some(client_id) = self.resolve_and_touch(addr).await {
                    let input = InputCommand {
                        sequence,
                        left,
                        right,
                        up,
                        down,
                        swing,
                    };
                    self.world
                        .apply_input(client_id, &input, now_millis(), &mut events);
                }
            }

            Packet::Shoot {
                x,
                y,
                vel_x,
                vel_y,
                local_id,
            } => {
                if let Some(client_id) = self.resolve_and_touch(addr).await {
                    self.world.apply_shoot(
                        client_id,
                        x,
                        y,
                        vel_x,
                        vel_y,
                        local_id,
                        now_millis(),
                        &mut events,
                    );
                }
            }

            Packet::Leave => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    {
                        let mut clients = self.clients.write().await;
                        clients.remove_client(&client_id);
                    }
                    if self.world.remove_player(client_id) {
                        events.push(Outbound::broadcast(Packet::PlayerLeft { id: client_id }));
                    }
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }

        self.dispatch_events(events).await;
    }

    /// Resolves an address to an admitted player id, refreshing liveness.
    async fn resolve_and_touch(&self, addr: SocketAddr) -> Option<u32> {
        let mut clients = self.clients.write().await;
        let client_id = clients.find_client_by_addr(addr)?;
        clients.touch(client_id);
        Some(client_id)
    }

    /// Drops the world state for a connection the timeout checker evicted.
    async fn handle_timeout(&mut self, client_id: u32) {
        if self.world.remove_player(client_id) {
            info!("Player {} timed out", client_id);
            self.broadcast_packet(Packet::PlayerLeft { id: client_id }, None);
        }
    }

    /// Main loop: fixed-rate simulation ticks interleaved with packet
    /// handling, plus the slow power-up and hill timers.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        // Seed the arena so the first player does not find it empty.
        let mut events = Vec::new();
        for _ in 0..INITIAL_POWER_UPS {
            self.world.spawn_power_up(&mut events);
        }
        events.clear();

        let mut tick_interval = interval(self.tick_duration);
        let mut power_up_interval = interval(POWER_UP_SPAWN_INTERVAL);
        let mut hill_interval = interval(HILL_MOVE_INTERVAL);
        let mut last_tick = Instant::now();

        let ticks_per_broadcast =
            ((1.0 / self.tick_duration.as_secs_f32()) / STATE_BROADCAST_HZ as f32).max(1.0) as u64;

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.handle_timeout(client_id).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32().min(MAX_TICK_DT);
                    last_tick = now;
                    self.tick += 1;

                    let mut events = Vec::new();
                    self.world.tick(dt, now_millis(), &mut events);
                    self.dispatch_events(events).await;

                    if self.tick % ticks_per_broadcast == 0 && self.world.player_count() > 0 {
                        self.broadcast_packet(self.world.state_packet(), None);
                    }

                    if self.tick % 60 == 0 && self.world.player_count() > 0 {
                        debug!(
                            "Tick {}: {} players, {} projectiles, {} power-ups, {:.1}Hz",
                            self.tick,
                            self.world.player_count(),
                            self.world.projectiles.len(),
                            self.world.power_ups.len(),
                            1.0 / dt.max(f32::EPSILON)
                        );
                    }
                },

                _ = power_up_interval.tick() => {
                    let mut events = Vec::new();
                    self.world.spawn_power_up(&mut events);
                    self.dispatch_events(events).await;
                },

                _ = hill_interval.tick() => {
                    let mut events = Vec::new();
                    self.world.move_hill(&mut events);
                    self.dispatch_events(events).await;
                },
            }
        }

        Ok(())
    }
}

/// Milliseconds since the unix epoch, the simulation's shared clock.
pub fn now_millis() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    millis.min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::sync::mpsc;

    #[test]
    fn test_server_message_creation() {
        let packet = Packet::Join {
            name: "tester".to_string(),
        };
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080);

        let msg = ServerMessage::PacketReceived {
            packet: packet.clone(),
            addr,
        };

        match msg {
            ServerMessage::PacketReceived { packet: p, addr: a } => {
                assert_eq!(a, addr);
                match p {
                    Packet::Join { name } => assert_eq!(name, "tester"),
                    _ => panic!("Unexpected packet type"),
                }
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_client_timeout_message() {
        let msg = ServerMessage::ClientTimeout { client_id: 42 };

        match msg {
            ServerMessage::ClientTimeout { client_id } => assert_eq!(client_id, 42),
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_game_message_broadcast_exclusion() {
        let msg = GameMessage::BroadcastPacket {
            packet: Packet::PlayerLeft { id: 9 },
            exclude: Some(5),
        };

        match msg {
            GameMessage::BroadcastPacket { packet, exclude } => {
                assert_eq!(exclude, Some(5));
                assert!(matches!(packet, Packet::PlayerLeft { id: 9 }));
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080);

        let msg = ServerMessage::PacketReceived {
            packet: Packet::Leave,
            addr,
        };

        assert!(tx.send(msg).is_ok());

        match rx.try_recv() {
            Ok(ServerMessage::PacketReceived { packet, addr: a }) => {
                assert_eq!(a, addr);
                assert!(matches!(packet, Packet::Leave));
            }
            _ => panic!("Unexpected message"),
        }
    }

    #[test]
    fn test_dt_clamp() {
        let stalled = 0.5_f32;
        assert_eq!(stalled.min(MAX_TICK_DT), MAX_TICK_DT);

        let normal: f32 = 1.0 / 60.0;
        assert!(normal.min(MAX_TICK_DT) < MAX_TICK_DT);
    }

    #[test]
    fn test_broadcast_cadence() {
        // 60Hz ticks throttle to every second tick at 30Hz broadcast.
        let tick_duration = Duration::from_secs(1) / 60;
        let ticks_per_broadcast =
            ((1.0 / tick_duration.as_secs_f32()) / STATE_BROADCAST_HZ as f32).max(1.0) as u64;
        assert_eq!(ticks_per_broadcast, 2);

        // A tick rate below the broadcast rate degrades to every tick.
        let slow = Duration::from_secs(1) / 20;
        let per = ((1.0 / slow.as_secs_f32()) / STATE_BROADCAST_HZ as f32).max(1.0) as u64;
        assert_eq!(per, 1);
    }

    #[test]
    fn test_now_millis_monotonic_enough() {
        let a = now_millis();
        std::thread::sleep(Duration::from_millis(2));
        let b = now_millis();
        assert!(b > a);
    }

    #[test]
    fn test_packet_serialization_roundtrip() {
        let test_packets = vec![
            Packet::Join {
                name: "bob".to_string(),
            },
            Packet::Leave,
            Packet::JoinError {
                message: "Server is full".to_string(),
            },
            Packet::Shoot {
                x: 100.0,
                y: 200.0,
                vel_x: 300.0,
                vel_y: 0.0,
                local_id: Some(3),
            },
        ];

        for packet in test_packets {
            let serialized = serialize(&packet);
            assert!(serialized.is_ok());

            let deserialized: Result<Packet, _> = deserialize(&serialized.unwrap());
            assert!(deserialized.is_ok());
        }
    }

    #[test]
    fn test_buffer_bounds() {
        let buffer_size = 2048;

        // A full 100-player state packet goes out, not in; inbound packets
        // are small and fixed-shape.
        let join = serialize(&Packet::Join {
            name: "a".repeat(20),
        })
        .unwrap();
        let input = serialize(&Packet::Input {
            sequence: u32::MAX,
            left: true,
            right: true,
            up: true,
            down: true,
            swing: true,
            target_id: Some(u32::MAX),
            aim_x: Some(800.0),
            aim_y: Some(600.0),
        })
        .unwrap();

        assert!(join.len() < buffer_size);
        assert!(input.len() < buffer_size);
    }
}
