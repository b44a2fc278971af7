//! # Arena Server Library
//!
//! Authoritative server for a top-down multiplayer arena brawl. The server
//! owns the only real copy of the game: player positions, hit points, scores,
//! projectiles in flight, active power-ups and the contested hill. Clients
//! send intent (movement, swings, shots) and render whatever the server says
//! happened.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The world advances on a fixed-rate tick. Movement is integrated against
//! the arena's walls with sliding collision response, projectiles travel and
//! resolve hits, power-ups spawn and expire, and the hill accrues score for
//! its sole occupant. Nothing a client sends moves state directly; every
//! command is validated first.
//!
//! ### Client Management
//! Connections are admitted up to a capacity limit, tracked by socket
//! address, and expired after a minute of silence. A rejoin from the same
//! address replaces the previous session.
//!
//! ### State Broadcasting
//! A throttled snapshot of every player, the leaderboard and the hill goes
//! out to all clients, carrying the per-player last-processed input sequence
//! so clients can reconcile their prediction.
//!
//! ## Module Organization
//!
//! - [`collision`]: pure point-vs-arena checks shared by movement and
//!   projectile travel
//! - [`layout`]: one-time generation of walls, decoration and power-up spawn
//!   markers
//! - [`game`]: the [`game::World`] simulation and its fixed tick
//! - [`combat`]: damage application, kill attribution and bottle detonation
//! - [`hill`]: king-of-the-hill occupancy and scoring
//! - [`client_manager`]: the connection roster
//! - [`network`]: the UDP gateway and the main loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("0.0.0.0:3003", 60, 100, 10_000).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod collision;
pub mod combat;
pub mod game;
pub mod hill;
pub mod layout;
pub mod network;
