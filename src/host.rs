//! Host-side collaborator interfaces.
//!
//! The bridge never owns game state. Everything it needs from the host —
//! identity, capacity, the roster, broadcasting text to players — comes
//! through [`HostServer`]. Everything that must *mutate* the game world is
//! handed back as a [`MainTask`] closure on a bounded queue the host drains
//! once per simulation tick; the bridge only enqueues and never blocks on
//! completion.

use tokio::sync::mpsc;
use uuid::Uuid;

/// One player currently connected to the game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlinePlayer {
    /// Stable identifier, constant across sessions.
    pub id: Uuid,
    /// Current display name.
    pub name: String,
}

/// Read access to the game server, plus the one world mutation the bridge
/// performs (chat broadcast).
///
/// Implementations must be callable from the bridge's network task: the
/// read accessors are invoked there directly (the roster reply is built
/// synchronously on receipt). [`broadcast`](HostServer::broadcast) is the
/// exception — the bridge only ever calls it from inside a [`MainTask`],
/// so implementations may assume the main simulation context.
pub trait HostServer: Send + Sync + 'static {
    /// Host server name, as announced in `server_info`.
    fn server_name(&self) -> String;

    /// Host server version string.
    fn server_version(&self) -> String;

    /// Number of players currently connected.
    fn online_count(&self) -> u32;

    /// Maximum player capacity.
    fn max_players(&self) -> u32;

    /// Enumerate currently connected players with id and display name.
    fn online_players(&self) -> Vec<OnlinePlayer>;

    /// Show `message` to every connected player. The text may contain
    /// `&`-style display color codes; translating them for the platform is
    /// the implementation's concern, not the bridge's.
    fn broadcast(&self, message: &str);
}

/// A deferred closure to run on the host's main simulation context.
pub type MainTask = Box<dyn FnOnce() + Send + 'static>;

/// Create the bounded main-context task queue.
///
/// The bridge holds the sender and enqueues with `try_send`, dropping the
/// task with a warning when the host falls behind. The host drains the
/// receiver once per simulation tick:
///
/// ```
/// use chat_bridge_client::host::main_task_channel;
///
/// let (tx, mut rx) = main_task_channel(64);
/// # drop(tx);
/// // each tick, on the main thread:
/// while let Ok(task) = rx.try_recv() {
///     task();
/// }
/// ```
pub fn main_task_channel(capacity: usize) -> (mpsc::Sender<MainTask>, mpsc::Receiver<MainTask>) {
    // tokio panics on a zero-capacity channel.
    mpsc::channel(capacity.max(1))
}
