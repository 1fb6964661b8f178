use tokio::sync::broadcast;
use tracing::debug;

use shared_config::DEFAULT_EVENT_CHANNEL_CAPACITY;

use crate::models::QueueEvent;

pub type EventSender = broadcast::Sender<QueueEvent>;
pub type EventReceiver = broadcast::Receiver<QueueEvent>;

/// Fire-and-forget sink for live-refresh events. Delivery is never
/// guaranteed and a failed publish never fails the caller.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: QueueEvent);
}

/// Fans events out to every connected subscriber over a broadcast channel.
/// Slow subscribers lag and drop; nothing is persisted or replayed.
pub struct BroadcastPublisher {
    sender: EventSender,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, event: QueueEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => debug!("Published {} to {} subscribers", name, receivers),
            // No subscribers connected
            Err(_) => debug!("Dropped {} event, nobody is listening", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use uuid::Uuid;

    use shared_models::auth::{Actor, StaffScope};

    use crate::models::{QueueCoordinates, QueueToggle};

    fn coordinates() -> QueueCoordinates {
        QueueCoordinates {
            organization_id: Uuid::new_v4(),
            department_id: Uuid::new_v4(),
            doctor_id: None,
            date: NaiveDate::from_ymd_opt(2030, 1, 2).unwrap(),
        }
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let publisher = BroadcastPublisher::new(4);
        publisher.publish(QueueEvent::QueueUpdate(coordinates()));
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_event() {
        let publisher = BroadcastPublisher::new(4);
        let mut first = publisher.subscribe();
        let mut second = publisher.subscribe();

        publisher.publish(QueueEvent::QueueUpdate(coordinates()));

        assert_matches!(first.recv().await, Ok(QueueEvent::QueueUpdate(_)));
        assert_matches!(second.recv().await, Ok(QueueEvent::QueueUpdate(_)));
    }

    #[test]
    fn wire_format_carries_event_name_and_payload() {
        let coords = coordinates();
        let json = serde_json::to_value(QueueEvent::QueueUpdate(coords.clone())).unwrap();

        assert_eq!(json["event"], "queueUpdate");
        assert_eq!(json["payload"]["departmentId"], coords.department_id.to_string());
        assert!(json["payload"]["doctorId"].is_null());
    }

    fn staff(organization_id: Uuid, department_id: Option<Uuid>) -> Actor {
        Actor::Staff {
            user_id: Uuid::new_v4(),
            scope: StaffScope { organization_id, department_id },
        }
    }

    #[test]
    fn events_only_reach_staff_of_the_same_scope() {
        let coords = coordinates();
        let event = QueueEvent::QueueUpdate(coords.clone());

        assert!(event.visible_to(&staff(coords.organization_id, None)));
        assert!(event.visible_to(&staff(coords.organization_id, Some(coords.department_id))));
        assert!(!event.visible_to(&staff(coords.organization_id, Some(Uuid::new_v4()))));
        assert!(!event.visible_to(&staff(Uuid::new_v4(), None)));
        assert!(event.visible_to(&Actor::Admin { user_id: Uuid::new_v4() }));
        assert!(!event.visible_to(&Actor::Patient { user_id: Uuid::new_v4(), email: None }));
    }

    #[test]
    fn organization_wide_pause_reaches_every_department() {
        let coords = coordinates();
        let pause = QueueEvent::QueuePaused(QueueToggle {
            organization_id: coords.organization_id,
            department_id: None,
            doctor_id: None,
            date: coords.date,
            updated_count: 4,
        });

        assert!(pause.visible_to(&staff(coords.organization_id, Some(Uuid::new_v4()))));
        assert!(!pause.visible_to(&staff(Uuid::new_v4(), None)));
    }
}
