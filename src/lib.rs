//! Admin console and payment-status client for the Vanam event-registration
//! backend.
//!
//! The backend owns all business logic — payment processing, persistence,
//! authentication policy. This crate drives the client side of it:
//!
//! - **Payment-status polling**: bounded, sequential verification of a
//!   registration's payment with cancellable scheduling ([`poller`]).
//! - **Route guarding**: one upfront token validation with a role
//!   allow-list, backed by an injected credential store ([`guard`],
//!   [`store`]).
//! - **Admin roster**: fetching, filtering, and accept/reject/refund
//!   decisions over the candidate list ([`api`], [`roster`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use regdesk::{Console, ConsoleConfig, GuardOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let console = Console::build(ConsoleConfig::default())?;
//!
//!     match console.authorize(&["admin"]).await {
//!         GuardOutcome::Granted { .. } => {
//!             let candidates = console.candidates().await?;
//!             println!("{} registrations", candidates.len());
//!         }
//!         GuardOutcome::Denied { role } => println!("access denied for {role}"),
//!         GuardOutcome::Unauthenticated => println!("please log in"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod console;
pub mod error;
pub mod event;
pub mod guard;
pub mod poller;
pub mod roster;
pub mod store;

pub use api::BackendClient;
pub use config::ConsoleConfig;
pub use console::Console;
pub use error::{Error, Result};
pub use event::{ConsoleEvent, ConsoleEventsChannel, ConsoleEventsSender};
pub use guard::{GuardOutcome, RouteGuard};
pub use poller::{PollCanceller, PollConfig, PollPhase, PollReport, PollSession};
pub use store::{CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore};
