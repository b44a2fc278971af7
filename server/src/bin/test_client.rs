//! Headless protocol smoke client: joins, walks in a circle, fires a few
//! shots and leaves. Useful for poking a running server without a renderer.

use bincode::{deserialize, serialize};
use shared::Packet;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    let server_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:3003".to_string())
        .parse::<SocketAddr>()?;

    let join = Packet::Join {
        name: format!("smoke-{}", get_timestamp() % 1000),
    };
    println!("Joining {}", server_addr);
    socket.send_to(&serialize(&join)?, server_addr).await?;

    let mut buf = [0u8; 65536];

    let (len, addr) = socket.recv_from(&mut buf).await?;
    println!("Received {} bytes from {}", len, addr);

    let client_id = match deserialize::<Packet>(&buf[0..len]) {
        Ok(Packet::Joined {
            client_id,
            self_state,
            walls,
            power_ups,
            hill,
            ..
        }) => {
            println!(
                "Joined as {} ({}) at ({:.0}, {:.0}); {} walls, {} power-ups, hill at ({:.0}, {:.0})",
                client_id, self_state.name, self_state.x, self_state.y,
                walls.len(), power_ups.len(), hill.x, hill.y
            );
            client_id
        }
        Ok(Packet::JoinError { message }) => {
            println!("Join rejected: {}", message);
            return Ok(());
        }
        Ok(other) => {
            println!("Expected Joined but got: {:?}", other);
            return Ok(());
        }
        Err(e) => {
            println!("Failed to deserialize response: {}", e);
            return Ok(());
        }
    };

    let mut sequence = 1;

    // Walk a rough circle for ten seconds, swinging and shooting on the way.
    for i in 0..10 {
        let angle = i as f32 / 5.0 * std::f32::consts::PI;
        let input = Packet::Input {
            sequence,
            left: angle.cos() < -0.3,
            right: angle.cos() > 0.3,
            up: angle.sin() < -0.3,
            down: angle.sin() > 0.3,
            swing: i % 4 == 0,
            target_id: None,
            aim_x: None,
            aim_y: None,
        };
        socket.send_to(&serialize(&input)?, server_addr).await?;
        sequence += 1;

        if i % 3 == 1 {
            let shot = Packet::Shoot {
                x: 400.0,
                y: 300.0,
                vel_x: angle.cos() * 350.0,
                vel_y: angle.sin() * 350.0,
                local_id: Some(i),
            };
            socket.send_to(&serialize(&shot)?, server_addr).await?;
        }

        // Drain whatever the server pushed since the last input.
        loop {
            match timeout(Duration::from_millis(200), socket.recv_from(&mut buf)).await {
                Ok(Ok((len, _))) => match deserialize::<Packet>(&buf[0..len]) {
                    Ok(Packet::State {
                        players,
                        leaderboard,
                        hill,
                        last_processed_input,
                    }) => {
                        let me = players.iter().find(|p| p.id == client_id);
                        println!(
                            "State: {} players, top score {}, hill controller {:?}, my pos {:?}, acked seq {:?}",
                            players.len(),
                            leaderboard.first().map(|e| e.score).unwrap_or(0),
                            hill.controller,
                            me.map(|p| (p.x, p.y)),
                            last_processed_input.get(&client_id)
                        );
                    }
                    Ok(Packet::ProjectileCreated { projectile }) => {
                        println!(
                            "Projectile {} ({:?}) from {}",
                            projectile.id, projectile.kind, projectile.owner
                        );
                    }
                    Ok(Packet::PlayerDied { id, by }) => {
                        println!("Player {} killed by {}", id, by);
                    }
                    Ok(_) => {}
                    Err(e) => println!("Failed to deserialize packet: {}", e),
                },
                _ => break,
            }
        }

        sleep(Duration::from_secs(1)).await;
    }

    println!("Leaving");
    socket.send_to(&serialize(&Packet::Leave)?, server_addr).await?;
    println!("Test client finished");

    Ok(())
}
