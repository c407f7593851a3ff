//! Message fan-out: broadcast and direct delivery with timestamping.

use std::sync::{Arc, Mutex};

use chrono::Local;
use palaver_session::SessionRegistry;

/// Delivers chat messages to registered sessions.
///
/// Every message is prefixed with a wall-clock timestamp. Fan-out works on
/// a registry snapshot and only ever enqueues on per-session outbound
/// channels — the registry lock is never held during delivery, and delivery
/// never blocks on the network.
pub struct MessageService {
    registry: Arc<SessionRegistry>,
    /// Serializes fan-outs so concurrent broadcasts arrive in the same
    /// order at every recipient. Held only across channel enqueues.
    order: Mutex<()>,
}

impl MessageService {
    /// Creates a message service over the given registry.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            order: Mutex::new(()),
        }
    }

    /// Sends a timestamped message to every currently registered session.
    pub fn broadcast(&self, text: &str) {
        let stamped = format!("{} {}", timestamp(), text);

        let _order = self.order.lock().unwrap();
        for session in self.registry.sessions() {
            session.send(stamped.clone());
        }
    }

    /// Sends a timestamped direct message.
    ///
    /// If the recipient exists, both the recipient and the sender receive
    /// the message (the sender sees their own whisper echoed). If not,
    /// only the sender is told the target is unknown.
    pub fn direct_message(&self, text: &str, to: &str, from: &str) {
        let stamped = format!("{} {}", timestamp(), text);

        let recipient = self.registry.lookup_by_name(to);
        let sender = self.registry.lookup_by_name(from);

        let _order = self.order.lock().unwrap();
        match recipient {
            Some(recipient) => {
                recipient.send(stamped.clone());
                if let Some(sender) = sender {
                    sender.send(stamped);
                }
            }
            None => {
                if let Some(sender) = sender {
                    sender.send(format!(
                        "User with nickname {to} does not exist"
                    ));
                }
            }
        }
    }

    /// Broadcasts the current list of active display names.
    pub fn broadcast_active_clients(&self) {
        let names = self.registry.active_names();
        self.broadcast(&format!("Active clients: {}", names.join(", ")));
    }
}

/// Current wall-clock time rendered as `yyyy-MM-dd HH:mm:ss`.
fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
