//! # Quizhall
//!
//! Real-time quiz lobbies over WebSockets.
//!
//! Clients open a socket, create or look up a lobby, log in for a
//! one-time token, and join with it. From then on the lobby actor drives
//! the round: it broadcasts membership, hands out problems, scores
//! answers, and closes everyone out when the clock runs down or someone
//! finishes the set.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizhall::prelude::*;
//!
//! # async fn run() -> Result<(), QuizhallError> {
//! let catalog = Catalog::load("problems.json").await?;
//! let server = QuizServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .results_dir("logs")
//!     .catalog(catalog)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod connection;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::QuizhallError;
pub use server::{QuizServer, QuizServerBuilder};

/// Everything needed to embed or drive a quiz server.
pub mod prelude {
    pub use crate::{QuizServer, QuizServerBuilder, QuizhallError, ServerConfig};
    pub use quizhall_lobby::{
        Catalog, GameResult, JsonFileSink, LobbyConfig, LobbyError, Phase,
        ProblemSource, ResultSink, SessionRegistry,
    };
    pub use quizhall_protocol::{
        ClientEvent, Codec, JsonCodec, LobbyId, LobbyStatus, PlayerName,
        Problem, ServerEvent, StartOptions,
    };
    pub use quizhall_session::TokenConfig;
}
