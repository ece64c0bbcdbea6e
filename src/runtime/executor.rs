//! Chat session executor

use super::pending::{Cancelled, PendingReplies};
use super::{Command, SessionConfig, SessionHandle, SurfaceEvent, HELPER_CHANNEL};
use crate::error::ChatError;
use crate::state_machine::{
    submit, transition, ConversationState, Effect, Event, Jitter, Reply, TransitionResult,
};
use crate::transcript::{Author, Message, Transcript};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// A reply whose timer fired, on its way back to the session task
#[derive(Debug)]
struct Delivery {
    epoch: u64,
    channel: String,
    reply: Reply,
    batch: u64,
}

/// Single-threaded owner of all chat state.
///
/// Commands and timer deliveries are processed one at a time, so the helper
/// state is never touched concurrently and a cancel always lands before any
/// later submission.
pub struct ChatSession<J: Jitter> {
    config: SessionConfig,
    jitter: J,
    active: Option<String>,
    transcripts: HashMap<String, Transcript>,
    helper_state: ConversationState,
    pending: PendingReplies,
    command_rx: mpsc::Receiver<Command>,
    delivery_tx: mpsc::Sender<Delivery>,
    delivery_rx: mpsc::Receiver<Delivery>,
    broadcast_tx: broadcast::Sender<SurfaceEvent>,
}

impl<J> ChatSession<J>
where
    J: Jitter + Send + 'static,
{
    /// Start a session on the current tokio runtime.
    ///
    /// The session stops on [`SessionHandle::shutdown`] or once every handle
    /// is dropped; either way its pending replies are cancelled.
    #[must_use]
    pub fn spawn(
        config: SessionConfig,
        jitter: J,
    ) -> (SessionHandle, broadcast::Receiver<SurfaceEvent>) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (delivery_tx, delivery_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(128);

        let config = config.with_channel(HELPER_CHANNEL);
        let transcripts = config
            .channels
            .iter()
            .map(|name| (name.clone(), Transcript::new()))
            .collect();

        let session = Self {
            config,
            jitter,
            active: None,
            transcripts,
            helper_state: ConversationState::new(),
            pending: PendingReplies::new(),
            command_rx,
            delivery_tx,
            delivery_rx,
            broadcast_tx: broadcast_tx.clone(),
        };
        tokio::spawn(session.run());

        (SessionHandle::new(command_tx, broadcast_tx), broadcast_rx)
    }

    async fn run(mut self) {
        tracing::info!(channels = self.transcripts.len(), "Starting chat session");

        loop {
            tokio::select! {
                biased;
                command = self.command_rx.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.cancel_pending("shutdown");
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(delivery) = self.delivery_rx.recv() => self.deliver(delivery),
            }
        }

        self.cancel_pending("teardown");
        tracing::info!("Chat session stopped");
    }

    fn handle_command(&mut self, command: Command) {
        // A dropped reply receiver just means the caller stopped waiting
        match command {
            Command::Select { channel, reply } => {
                let _ = reply.send(self.select_channel(channel));
            }
            Command::Send { text, reply } => {
                let _ = reply.send(self.send(&text));
            }
            Command::Transcript { channel, reply } => {
                let transcript = self
                    .transcripts
                    .get(&channel)
                    .cloned()
                    .ok_or(ChatError::UnknownChannel(channel));
                let _ = reply.send(transcript);
            }
            Command::HelperState { reply } => {
                let _ = reply.send(self.helper_state);
            }
            Command::ActiveChannel { reply } => {
                let _ = reply.send(self.active.clone());
            }
            Command::Channels { reply } => {
                let _ = reply.send(self.config.channels.clone());
            }
            Command::CancelPending { reply } => {
                let _ = reply.send(self.cancel_pending("requested"));
            }
            Command::Shutdown { reply } => {
                // Handled by the run loop; answer anyway so no caller hangs
                let _ = reply.send(());
            }
        }
    }

    fn select_channel(&mut self, channel: String) -> Result<(), ChatError> {
        if !self.transcripts.contains_key(&channel) {
            return Err(ChatError::UnknownChannel(channel));
        }

        self.cancel_pending("channel switch");
        tracing::info!(channel = %channel, "Channel selected");

        if channel == HELPER_CHANNEL {
            self.helper_state = ConversationState::new();
            self.notify_state(&channel);
        }
        self.active = Some(channel);
        Ok(())
    }

    fn send(&mut self, text: &str) -> Result<Message, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let channel = self.active.clone().ok_or(ChatError::NoActiveChannel)?;
        if channel != HELPER_CHANNEL {
            tracing::debug!(channel = %channel, "Rejected message to read-only channel");
            return Err(ChatError::MessagingDisabled { channel });
        }

        let message = Message::new(Author::user(&self.config.user_name), text);
        self.append(&channel, message.clone());

        let result = submit(&self.helper_state, &self.config.script, text, &mut self.jitter);
        self.apply(&channel, result);
        Ok(message)
    }

    fn deliver(&mut self, delivery: Delivery) {
        let Delivery {
            epoch,
            channel,
            reply,
            batch,
        } = delivery;

        if !self.pending.settle(epoch, batch, reply.on_delivery) {
            tracing::debug!(channel = %channel, epoch, "Dropping reply from cancelled epoch");
            return;
        }

        let message = Message::new(Author::agent(HELPER_CHANNEL), reply.text)
            .with_display_data(reply.display_data);
        self.append(&channel, message);

        let event = Event::ReplyDelivered {
            on_delivery: reply.on_delivery,
        };
        let result = transition(&self.helper_state, &self.config.script, event, &mut self.jitter);
        self.apply(&channel, result);

        if self.pending.is_empty() {
            self.broadcast(SurfaceEvent::Composing {
                channel,
                active: false,
            });
        }
    }

    fn apply(&mut self, channel: &str, result: TransitionResult) {
        let old_state = std::mem::replace(&mut self.helper_state, result.new_state);
        if self.helper_state.solved && !old_state.solved {
            tracing::info!(channel = %channel, "Helper AI accepted the answer");
        } else if self.helper_state != old_state {
            tracing::debug!(channel = %channel, phase = ?self.helper_state.phase(), "Script advanced");
        }

        let mut batch = None;
        for effect in result.effects {
            match effect {
                Effect::ScheduleReply { delay, reply } => {
                    // One batch per transition, opened from the pre-transition state
                    let id = *batch.get_or_insert_with(|| self.pending.begin_batch(old_state));
                    self.schedule(channel, delay, reply, id);
                }
                Effect::NotifyState => self.notify_state(channel),
            }
        }
    }

    fn schedule(&mut self, channel: &str, delay: Duration, reply: Reply, batch: u64) {
        let was_idle = self.pending.is_empty();
        let (token, epoch) = self.pending.track(channel, batch);
        tracing::debug!(
            channel = %channel,
            ?delay,
            epoch,
            batch,
            outstanding = self.pending.outstanding(),
            "Scheduling reply"
        );

        if was_idle {
            self.broadcast(SurfaceEvent::Composing {
                channel: channel.to_string(),
                active: true,
            });
        }

        let delivery = Delivery {
            epoch,
            channel: channel.to_string(),
            reply,
            batch,
        };
        let delivery_tx = self.delivery_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = delivery_tx.send(delivery).await;
                }
            }
        });
    }

    /// Drop every undelivered reply and fall back to the state the last
    /// delivered batch left behind
    fn cancel_pending(&mut self, reason: &str) -> usize {
        let Some(Cancelled {
            channel,
            replies,
            rollback,
        }) = self.pending.cancel_all()
        else {
            return 0;
        };
        tracing::info!(channel = %channel, cancelled = replies, reason, "Cancelled pending replies");
        self.broadcast(SurfaceEvent::Composing {
            channel: channel.clone(),
            active: false,
        });

        if let Some(state) = rollback.filter(|state| *state != self.helper_state) {
            tracing::debug!(
                channel = %channel,
                phase = ?state.phase(),
                "Rolled back undelivered progress"
            );
            self.helper_state = state;
            self.notify_state(&channel);
        }
        replies
    }

    fn append(&mut self, channel: &str, message: Message) {
        self.transcripts
            .entry(channel.to_string())
            .or_default()
            .push(message.clone());
        self.broadcast(SurfaceEvent::Message {
            channel: channel.to_string(),
            message,
        });
    }

    fn notify_state(&self, channel: &str) {
        self.broadcast(SurfaceEvent::StateChange {
            channel: channel.to_string(),
            state: self.helper_state,
        });
    }

    fn broadcast(&self, event: SurfaceEvent) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }
}
