//! Performance benchmarks for critical server systems

use bincode::{deserialize, serialize};
use rand::rngs::StdRng;
use rand::SeedableRng;
use server::collision;
use server::game::World;
use server::layout::ArenaLayout;
use shared::{Packet, Wall};
use std::time::Instant;

fn bench_world(seed: u64) -> World {
    let mut rng = StdRng::seed_from_u64(seed);
    let layout = ArenaLayout::generate(&mut rng);
    World::new(layout, 10_000, StdRng::seed_from_u64(seed + 1))
}

/// Benchmarks the collision oracle against a full wall set
#[test]
fn benchmark_collision_oracle() {
    let walls: Vec<Wall> = (0..8)
        .map(|i| Wall {
            x: 100.0 + i as f32 * 80.0,
            y: 100.0 + (i % 3) as f32 * 150.0,
            width: 40.0,
            height: 30.0,
            angle: i as f32 * 11.0,
        })
        .collect();

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let x = (i % 800) as f32;
        let y = (i % 600) as f32;
        let _ = collision::collides(&walls, x, y, 22.0);
    }

    let duration = start.elapsed();
    println!(
        "Collision oracle: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 100ms for 100k iterations
    assert!(duration.as_millis() < 100);
}

/// Benchmarks full world ticks at capacity
#[test]
fn benchmark_world_tick_at_capacity() {
    let mut world = bench_world(1);
    for id in 1..=100 {
        world.add_player(id, &format!("player{}", id));
    }

    // Everyone shooting keeps a projectile population in flight.
    let mut events = Vec::new();
    for id in 1..=100u32 {
        let x = 50.0 + (id as f32 * 7.0) % 700.0;
        let y = 50.0 + (id as f32 * 11.0) % 500.0;
        world.apply_shoot(id, x, y, 300.0, 100.0, None, 1000, &mut events);
    }

    let dt = 1.0 / 60.0;
    let iterations = 1000;
    let start = Instant::now();

    for t in 0..iterations {
        events.clear();
        world.tick(dt, 2000 + t * 16, &mut events);
    }

    let duration = start.elapsed();
    println!(
        "World tick: 100 players x {} frames in {:?} ({:.2} µs/frame)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks state snapshot serialization with a full roster
#[test]
fn benchmark_state_packet_serialization() {
    let mut world = bench_world(2);
    for id in 1..=100 {
        world.add_player(id, &format!("player{}", id));
    }

    let packet = world.state_packet();

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let serialized = serialize(&packet).unwrap();
        let _deserialized: Packet = deserialize(&serialized).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "State packet: {} roundtrips in {:?} ({:.2} µs/roundtrip)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks the joined packet, the largest single-recipient payload
#[test]
fn benchmark_joined_packet_serialization() {
    let mut world = bench_world(3);
    world.add_player(1, "joiner");

    let packet = world.joined_packet(1).unwrap();

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = serialize(&packet).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Joined packet: {} serializations in {:?} ({:.2} µs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 1000);
}

/// Benchmarks arena layout generation, a startup-only cost
#[test]
fn benchmark_layout_generation() {
    let iterations = 1000;
    let start = Instant::now();

    for seed in 0..iterations {
        let mut rng = StdRng::seed_from_u64(seed);
        let _ = ArenaLayout::generate(&mut rng);
    }

    let duration = start.elapsed();
    println!(
        "Layout generation: {} layouts in {:?} ({:.2} µs/layout)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Rejection sampling is bounded; generation must stay cheap.
    assert!(duration.as_millis() < 2000);
}

/// Stress tests the input path under a burst of commands
#[test]
fn stress_test_input_burst() {
    use server::game::InputCommand;

    let mut world = bench_world(4);
    for id in 1..=100 {
        world.add_player(id, &format!("player{}", id));
    }

    let mut events = Vec::new();
    let start = Instant::now();

    for t in 0..10u64 {
        for id in 1..=100u32 {
            let input = InputCommand {
                sequence: t as u32,
                left: (id + t as u32) % 2 == 0,
                right: (id + t as u32) % 2 == 1,
                up: id % 3 == 0,
                down: id % 3 == 1,
                swing: false,
            };
            world.apply_input(id, &input, 1000 + t * 16, &mut events);
        }
        world.tick(1.0 / 60.0, 1000 + t * 16, &mut events);
    }

    let duration = start.elapsed();
    println!(
        "Input burst: 1000 commands + 10 ticks in {:?}",
        duration
    );

    // Should complete in under 100ms
    assert!(duration.as_millis() < 100);
}
