//! Progress events sent from a running download to the front end

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::track::TrackCounts;

/// Progress updates sent during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A line for the progress log
    Progress { message: String },
    /// A line describing something that went wrong
    Diagnostic { message: String },
    /// Settled-track counts; drives the percent-complete indicator
    Counts(TrackCounts),
    /// A fresh access token was obtained and should be persisted
    TokenUpdated { token: String },
}

/// Sending half of the progress channel
///
/// Events are delivered in the order they are emitted. A closed or absent
/// receiver never interrupts the run.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that only logs
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub async fn progress(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message.trim());
        self.send(PipelineEvent::Progress { message }).await;
    }

    pub async fn diagnostic(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message.trim());
        self.send(PipelineEvent::Diagnostic { message }).await;
    }

    pub async fn counts(&self, counts: TrackCounts) {
        self.send(PipelineEvent::Counts(counts)).await;
    }

    pub async fn token_updated(&self, token: &str) {
        self.send(PipelineEvent::TokenUpdated {
            token: token.to_string(),
        })
        .await;
    }

    async fn send(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = EventSink::new(tx);

        sink.progress("first").await;
        sink.counts(TrackCounts::reset(2)).await;
        sink.diagnostic("oops").await;
        drop(sink);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(
            events,
            vec![
                PipelineEvent::Progress {
                    message: "first".to_string()
                },
                PipelineEvent::Counts(TrackCounts::reset(2)),
                PipelineEvent::Diagnostic {
                    message: "oops".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = EventSink::new(tx);
        sink.progress("nobody listening").await;
        EventSink::detached().token_updated("abc").await;
    }
}
