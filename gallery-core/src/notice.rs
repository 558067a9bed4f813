use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

impl std::fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    pub created_at: Instant,
}

impl Notice {
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Transient success/error messages that disappear after a fixed interval.
///
/// Every notice is also kept in `history`, which never expires, so callers that
/// report after the fact see what was raised regardless of the TTL.
#[derive(Debug, Clone)]
pub struct Notices {
    items: Vec<Notice>,
    history: Vec<Notice>,
    ttl: Duration,
}

impl Default for Notices {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Notices {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: Vec::new(),
            history: Vec::new(),
            ttl,
        }
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(NoticeKind::Success, text.into());
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(NoticeKind::Error, text.into());
    }

    fn push(&mut self, kind: NoticeKind, text: String) {
        let notice = Notice {
            kind,
            text,
            created_at: Instant::now(),
        };
        self.history.push(notice.clone());
        self.items.push(notice);
    }

    pub fn prune(&mut self) {
        let ttl = self.ttl;
        self.items.retain(|n| !n.is_expired(ttl));
    }

    pub fn visible(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter().filter(move |n| !n.is_expired(self.ttl))
    }

    pub fn history(&self) -> &[Notice] {
        &self.history
    }

    /// Number of notices raised so far.
    pub fn raised(&self) -> usize {
        self.history.len()
    }

    /// Whether any error was raised, expired or not.
    pub fn failed(&self) -> bool {
        self.history.iter().any(|n| n.kind == NoticeKind::Error)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
