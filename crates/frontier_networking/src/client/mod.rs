//! # Game Client
//!
//! Client-side networking: a read-only projection of the world and the
//! connection that feeds it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      GAME CLIENT                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
//! │  │ UI / bot     │  │ Transport    │  │ Session      │      │
//! │  │ (actions)    │──│ (intents)    │──│ (WebSocket)  │      │
//! │  └──────────────┘  └──────────────┘  └──────┬───────┘      │
//! │         ▲                                   │ snapshot,    │
//! │         │ reads                             │ turns        │
//! │              ┌───────────────────────┐      │              │
//! │              │  GameView             │◄─────┘              │
//! │              │  (projection)         │                     │
//! │              └───────────────────────┘                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The view is only ever written by the session. Player actions never touch
//! it; they go out as intents and come back as turns.

mod session;
mod transport;
mod view;

pub use session::{ClientConfig, ClientSession};
pub use transport::{ClientTransport, ConnectionState, ReconnectPolicy, SendOutcome};
pub use view::{GameView, UnitEvent};
