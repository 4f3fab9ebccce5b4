//! Realtime fan-out of persisted recipe updates.
//!
//! One task owns the channel membership table. Handles talk to it over an
//! unbounded command queue, so joins, leaves and publishes are applied one
//! at a time in the order each caller issued them and no lock guards the
//! table.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::recipe::RecipeRecord;

pub type ViewerId = Uuid;

/// Control messages a viewer connection sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControlMessage {
    JoinRecipe { recipe_id: String },
    LeaveRecipe { recipe_id: String },
}

/// Events pushed to viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecipeEvent {
    RecipeUpdated { recipe: RecipeRecord },
}

/// Name of the broadcast group for one recipe identity.
pub fn channel_name(recipe_id: &str) -> String {
    format!("recipe_{}", recipe_id)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("notifier task has stopped")]
pub struct NotifierClosed;

/// A connected viewer and the events addressed to it.
///
/// Dropping the viewer closes its connection: it leaves every channel it
/// joined and its outbox is released.
#[derive(Debug)]
pub struct Viewer {
    pub id: ViewerId,
    pub events: mpsc::UnboundedReceiver<RecipeEvent>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Drop for Viewer {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Disconnect { viewer: self.id });
    }
}

enum Command {
    Connect {
        viewer: ViewerId,
        outbox: mpsc::UnboundedSender<RecipeEvent>,
    },
    Join {
        viewer: ViewerId,
        recipe_id: String,
    },
    Leave {
        viewer: ViewerId,
        recipe_id: String,
    },
    Disconnect {
        viewer: ViewerId,
    },
    Publish {
        recipe_id: String,
        record: Box<RecipeRecord>,
        reply: oneshot::Sender<usize>,
    },
    SubscriberCount {
        recipe_id: String,
        reply: oneshot::Sender<usize>,
    },
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Connect { .. } => "Connect",
            Command::Join { .. } => "Join",
            Command::Leave { .. } => "Leave",
            Command::Disconnect { .. } => "Disconnect",
            Command::Publish { .. } => "Publish",
            Command::SubscriberCount { .. } => "SubscriberCount",
        };
        f.write_str(name)
    }
}

/// Membership table owned by the notifier task.
#[derive(Debug, Default)]
struct Registry {
    outboxes: HashMap<ViewerId, mpsc::UnboundedSender<RecipeEvent>>,
    channels: HashMap<String, HashSet<ViewerId>>,
}

impl Registry {
    fn apply(&mut self, command: Command) {
        match command {
            Command::Connect { viewer, outbox } => {
                self.outboxes.insert(viewer, outbox);
            }
            Command::Join { viewer, recipe_id } => {
                if self.outboxes.contains_key(&viewer) {
                    debug!(%viewer, channel = %channel_name(&recipe_id), "viewer joined");
                    self.channels.entry(recipe_id).or_default().insert(viewer);
                } else {
                    warn!(%viewer, "join from unknown viewer ignored");
                }
            }
            Command::Leave { viewer, recipe_id } => self.leave(viewer, &recipe_id),
            Command::Disconnect { viewer } => self.disconnect(viewer),
            Command::Publish {
                recipe_id,
                record,
                reply,
            } => {
                let delivered = self.publish(&recipe_id, *record);
                let _ = reply.send(delivered);
            }
            Command::SubscriberCount { recipe_id, reply } => {
                let count = self.channels.get(&recipe_id).map_or(0, HashSet::len);
                let _ = reply.send(count);
            }
        }
    }

    fn leave(&mut self, viewer: ViewerId, recipe_id: &str) {
        if let Some(members) = self.channels.get_mut(recipe_id) {
            members.remove(&viewer);
            if members.is_empty() {
                self.channels.remove(recipe_id);
            }
        }
    }

    fn disconnect(&mut self, viewer: ViewerId) {
        self.outboxes.remove(&viewer);
        self.channels.retain(|_, members| {
            members.remove(&viewer);
            !members.is_empty()
        });
    }

    fn publish(&mut self, recipe_id: &str, record: RecipeRecord) -> usize {
        let Some(members) = self.channels.get(recipe_id) else {
            return 0;
        };
        let event = RecipeEvent::RecipeUpdated { recipe: record };
        let mut delivered = 0;
        let mut gone = Vec::new();
        for viewer in members {
            match self.outboxes.get(viewer) {
                Some(outbox) if outbox.send(event.clone()).is_ok() => delivered += 1,
                _ => gone.push(*viewer),
            }
        }
        for viewer in gone {
            debug!(%viewer, "pruning closed viewer");
            self.disconnect(viewer);
        }
        debug!(channel = %channel_name(recipe_id), delivered, "recipe update published");
        delivered
    }
}

/// Cloneable handle to the notifier task.
///
/// Created once by the composition root and passed to whatever publishes.
#[derive(Debug, Clone)]
pub struct RecipeNotifier {
    commands: mpsc::UnboundedSender<Command>,
}

impl RecipeNotifier {
    /// Spawns the notifier task on the current tokio runtime.
    ///
    /// The task stops once every handle is dropped.
    pub fn spawn() -> Self {
        let (commands, mut inbox) = mpsc::unbounded_channel::<Command>();
        tokio::spawn(async move {
            let mut registry = Registry::default();
            while let Some(command) = inbox.recv().await {
                registry.apply(command);
            }
            debug!("recipe notifier stopped");
        });
        Self { commands }
    }

    fn submit(&self, command: Command) -> Result<(), NotifierClosed> {
        self.commands.send(command).map_err(|_| NotifierClosed)
    }

    pub fn connect(&self) -> Result<Viewer, NotifierClosed> {
        let id = Uuid::new_v4();
        let (outbox, events) = mpsc::unbounded_channel();
        self.submit(Command::Connect { viewer: id, outbox })?;
        Ok(Viewer {
            id,
            events,
            commands: self.commands.clone(),
        })
    }

    pub fn join(&self, viewer: ViewerId, recipe_id: impl Into<String>) -> Result<(), NotifierClosed> {
        self.submit(Command::Join {
            viewer,
            recipe_id: recipe_id.into(),
        })
    }

    pub fn leave(&self, viewer: ViewerId, recipe_id: impl Into<String>) -> Result<(), NotifierClosed> {
        self.submit(Command::Leave {
            viewer,
            recipe_id: recipe_id.into(),
        })
    }

    /// Removes the viewer from every channel it joined.
    pub fn disconnect(&self, viewer: ViewerId) -> Result<(), NotifierClosed> {
        self.submit(Command::Disconnect { viewer })
    }

    pub fn handle_control(&self, viewer: ViewerId, message: ControlMessage) -> Result<(), NotifierClosed> {
        match message {
            ControlMessage::JoinRecipe { recipe_id } => self.join(viewer, recipe_id),
            ControlMessage::LeaveRecipe { recipe_id } => self.leave(viewer, recipe_id),
        }
    }

    /// Delivers `record` to every current member of the recipe's channel and
    /// returns how many viewers received it.
    pub async fn publish(&self, recipe_id: &str, record: &RecipeRecord) -> Result<usize, NotifierClosed> {
        let (reply, delivered) = oneshot::channel();
        self.submit(Command::Publish {
            recipe_id: recipe_id.to_string(),
            record: Box::new(record.clone()),
            reply,
        })?;
        delivered.await.map_err(|_| NotifierClosed)
    }

    pub async fn subscriber_count(&self, recipe_id: &str) -> Result<usize, NotifierClosed> {
        let (reply, count) = oneshot::channel();
        self.submit(Command::SubscriberCount {
            recipe_id: recipe_id.to_string(),
            reply,
        })?;
        count.await.map_err(|_| NotifierClosed)
    }
}
