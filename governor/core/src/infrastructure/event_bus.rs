// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus - Pub/Sub for Governor Events
//
// In-memory broadcast of governor domain events to observers (audit sinks,
// dashboards, tests). Publishing never blocks and never fails the pipeline;
// events published with no subscriber are dropped.

use crate::domain::events::GovernorEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Event bus for publishing and subscribing to governor events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<GovernorEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: GovernorEvent) {
        debug!(kind = event.kind(), "Publishing governor event");

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all governor events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            kinds: None,
        }
    }

    /// Subscribe to the given event kinds only (see [`GovernorEvent::kind`])
    pub fn subscribe_kinds(&self, kinds: &[&'static str]) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            kinds: Some(kinds.to_vec()),
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiver for governor events, optionally filtered by kind
pub struct EventReceiver {
    receiver: broadcast::Receiver<GovernorEvent>,
    kinds: Option<Vec<&'static str>>,
}

impl EventReceiver {
    fn accepts(&self, event: &GovernorEvent) -> bool {
        match &self.kinds {
            Some(kinds) => kinds.contains(&event.kind()),
            None => true,
        }
    }

    /// Receive the next matching event (waits until one is available)
    pub async fn recv(&mut self) -> Result<GovernorEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(|e| match e {
                broadcast::error::RecvError::Closed => EventBusError::Closed,
                broadcast::error::RecvError::Lagged(n) => {
                    warn!("Event receiver lagged by {} events", n);
                    EventBusError::Lagged(n)
                }
            })?;

            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Try to receive a matching event without waiting
    pub fn try_recv(&mut self) -> Result<GovernorEvent, EventBusError> {
        loop {
            let event = self.receiver.try_recv().map_err(|e| match e {
                broadcast::error::TryRecvError::Empty => EventBusError::Empty,
                broadcast::error::TryRecvError::Closed => EventBusError::Closed,
                broadcast::error::TryRecvError::Lagged(n) => {
                    warn!("Event receiver lagged by {} events", n);
                    EventBusError::Lagged(n)
                }
            })?;

            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Drain every matching event currently buffered
    pub fn drain(&mut self) -> Vec<GovernorEvent> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Ok(event) => events.push(event),
                Err(EventBusError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::DecisionId;
    use chrono::Utc;

    fn completed(score: f64) -> GovernorEvent {
        GovernorEvent::EvaluationCompleted {
            decision_id: DecisionId::new(),
            scenario: "general".to_string(),
            final_score: score,
            completed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.publish(completed(0.5));

        match receiver.recv().await.unwrap() {
            GovernorEvent::EvaluationCompleted { final_score, .. } => assert_eq!(final_score, 0.5),
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_kind_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_kinds(&["cpd_rejected"]);

        event_bus.publish(completed(0.5));
        event_bus.publish(GovernorEvent::CpdRejected {
            variable: "final_score".to_string(),
            reason: "shape".to_string(),
            rejected_at: Utc::now(),
        });

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.kind(), "cpd_rejected");
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish(completed(0.1));

        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let event_bus = EventBus::default();
        event_bus.publish(completed(0.9));
        assert_eq!(event_bus.subscriber_count(), 0);
    }
}
