use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

use common::{SessionId, log};

use crate::session::SessionEvent;

const UNDECIDED: u8 = 0;
const SECOND_PLAYER: u8 = 1;
const BOT: u8 = 2;
const ABANDONED: u8 = 3;

/// How a waiting session stopped waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    SecondPlayer,
    Bot,
    /// Player one left before either happened.
    Abandoned,
}

impl Resolution {
    fn to_state(self) -> u8 {
        match self {
            Resolution::SecondPlayer => SECOND_PLAYER,
            Resolution::Bot => BOT,
            Resolution::Abandoned => ABANDONED,
        }
    }

    fn from_state(state: u8) -> Option<Self> {
        match state {
            SECOND_PLAYER => Some(Resolution::SecondPlayer),
            BOT => Some(Resolution::Bot),
            ABANDONED => Some(Resolution::Abandoned),
            _ => None,
        }
    }
}

/// Decides a waiting session's fate exactly once. The accept loop, the
/// matchmaking timer and the session itself race through `try_resolve`;
/// only the first caller commits.
#[derive(Debug, Default)]
pub struct MatchTicket {
    state: AtomicU8,
    timer_cancelled: Notify,
}

impl MatchTicket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits `resolution` if nothing has been committed yet; otherwise
    /// returns the resolution that won. Any non-timer resolution also cancels
    /// the timer.
    pub fn try_resolve(&self, resolution: Resolution) -> Result<(), Resolution> {
        match self.state.compare_exchange(
            UNDECIDED,
            resolution.to_state(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                if resolution != Resolution::Bot {
                    // notify_one stores a permit, so a timer that has not polled yet still sees it.
                    self.timer_cancelled.notify_one();
                }
                Ok(())
            }
            Err(current) => Err(Resolution::from_state(current).unwrap_or(resolution)),
        }
    }

    pub fn resolution(&self) -> Option<Resolution> {
        Resolution::from_state(self.state.load(Ordering::Acquire))
    }
}

/// Starts the matchmaking timer. If it elapses before anything else resolves
/// the ticket, the session is told to play against the bot.
pub fn spawn_matchmaking_timer(
    session_id: SessionId,
    ticket: Arc<MatchTicket>,
    timeout: Duration,
    events: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                if ticket.try_resolve(Resolution::Bot).is_ok() {
                    log!("[{}] No second player after {:?}, switching to bot", session_id, timeout);
                    let _ = events.send(SessionEvent::MatchmakingTimeout).await;
                }
            }
            _ = ticket.timer_cancelled.notified() => {}
        }
    })
}
