//! Interactive terminal front end for the negotiation agent.

pub mod domain;
pub mod formatter;
pub mod relay;
pub mod runner;
pub mod session;
pub mod ui;

pub use relay::RelayLink;
pub use runner::run_client;
pub use session::{ClientConfig, run_client_session};
