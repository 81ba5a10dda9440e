//! Topic slot tables and dynamic wire-ID assignment.
//!
//! Slots fill sequentially and are never vacated, so the table length is
//! also the next free slot. Subscribers take wire IDs
//! `100..100+MAX_SUBSCRIBERS`; publishers the range directly above.
//! The registry stores descriptors only - publishers carry no reference
//! back to the node, and sending happens through [`crate::node::Node`]
//! with the handle returned by [`TopicRegistry::advertise`].

use crate::error::{Error, Result};
use crate::messages::TopicInfo;
use crate::protocol::{
    DYNAMIC_ID_BASE, MAX_PUBLISHERS, MAX_SUBSCRIBERS, TOPIC_PUBLISHERS, TOPIC_SUBSCRIBERS,
};

/// Handle returned by `advertise`; pass it back to `Node::publish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publisher {
    id: u16,
}

impl Publisher {
    /// Wire topic ID assigned to this publisher.
    #[inline]
    pub fn id(&self) -> u16 {
        self.id
    }
}

/// Inbound payload callback. Returns false when the payload is malformed.
pub type SubscriberHandler = Box<dyn FnMut(&[u8]) -> bool + Send>;

struct PublisherSlot {
    id: u16,
    topic_name: String,
    message_type: String,
}

struct SubscriberSlot {
    id: u16,
    topic_name: String,
    message_type: String,
    handler: SubscriberHandler,
}

/// Slot tables for this node's publishers and subscribers.
pub struct TopicRegistry {
    publishers: Vec<PublisherSlot>,
    subscribers: Vec<SubscriberSlot>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self {
            publishers: Vec::with_capacity(MAX_PUBLISHERS),
            subscribers: Vec::with_capacity(MAX_SUBSCRIBERS),
        }
    }

    /// Claim the next publisher slot.
    pub fn advertise(&mut self, topic_name: &str, message_type: &str) -> Result<Publisher> {
        if self.publishers.len() >= MAX_PUBLISHERS {
            return Err(Error::RegistryFull { kind: "publisher" });
        }

        let id = (DYNAMIC_ID_BASE as usize + MAX_SUBSCRIBERS + self.publishers.len()) as u16;
        self.publishers.push(PublisherSlot {
            id,
            topic_name: topic_name.to_string(),
            message_type: message_type.to_string(),
        });

        Ok(Publisher { id })
    }

    /// Claim the next subscriber slot, returning its wire topic ID.
    pub fn subscribe(
        &mut self,
        topic_name: &str,
        message_type: &str,
        handler: SubscriberHandler,
    ) -> Result<u16> {
        if self.subscribers.len() >= MAX_SUBSCRIBERS {
            return Err(Error::RegistryFull { kind: "subscriber" });
        }

        let id = DYNAMIC_ID_BASE + self.subscribers.len() as u16;
        self.subscribers.push(SubscriberSlot {
            id,
            topic_name: topic_name.to_string(),
            message_type: message_type.to_string(),
            handler,
        });

        Ok(id)
    }

    /// Handler for a dynamic wire ID, if a live subscriber slot matches.
    /// Publisher IDs and unassigned slots return `None`.
    pub fn handler_for(&mut self, topic_id: u16) -> Option<&mut SubscriberHandler> {
        let index = topic_id.checked_sub(DYNAMIC_ID_BASE)? as usize;
        if index >= MAX_SUBSCRIBERS {
            return None;
        }
        self.subscribers.get_mut(index).map(|slot| &mut slot.handler)
    }

    /// Announcements in wire order: publishers first, then subscribers,
    /// each tagged with the outer wire topic it goes out under.
    pub fn announcements(&self) -> impl Iterator<Item = (u16, TopicInfo)> + '_ {
        let publishers = self.publishers.iter().map(|slot| {
            (
                TOPIC_PUBLISHERS,
                TopicInfo {
                    topic_id: slot.id,
                    topic_name: slot.topic_name.clone(),
                    message_type: slot.message_type.clone(),
                },
            )
        });
        let subscribers = self.subscribers.iter().map(|slot| {
            (
                TOPIC_SUBSCRIBERS,
                TopicInfo {
                    topic_id: slot.id,
                    topic_name: slot.topic_name.clone(),
                    message_type: slot.message_type.clone(),
                },
            )
        });
        publishers.chain(subscribers)
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publisher_ids_start_above_subscriber_range() {
        let mut registry = TopicRegistry::new();
        let first = registry.advertise("chatter", "std_msgs/String").unwrap();
        let second = registry.advertise("odom", "nav_msgs/Odometry").unwrap();

        assert_eq!(first.id(), (DYNAMIC_ID_BASE as usize + MAX_SUBSCRIBERS) as u16);
        assert_eq!(second.id(), first.id() + 1);
    }

    #[test]
    fn subscriber_ids_are_sequential_from_base() {
        let mut registry = TopicRegistry::new();
        let a = registry
            .subscribe("cmd_vel", "geometry_msgs/Twist", Box::new(|_| true))
            .unwrap();
        let b = registry
            .subscribe("led", "std_msgs/Bool", Box::new(|_| true))
            .unwrap();

        assert_eq!(a, DYNAMIC_ID_BASE);
        assert_eq!(b, DYNAMIC_ID_BASE + 1);
    }

    #[test]
    fn advertise_fails_when_full() {
        let mut registry = TopicRegistry::new();
        for i in 0..MAX_PUBLISHERS {
            let publisher = registry.advertise(&format!("t{}", i), "std_msgs/Empty").unwrap();
            assert_eq!(
                publisher.id() as usize,
                DYNAMIC_ID_BASE as usize + MAX_SUBSCRIBERS + i
            );
        }

        assert!(matches!(
            registry.advertise("overflow", "std_msgs/Empty"),
            Err(Error::RegistryFull { kind: "publisher" })
        ));
    }

    #[test]
    fn subscribe_fails_when_full() {
        let mut registry = TopicRegistry::new();
        for i in 0..MAX_SUBSCRIBERS {
            registry
                .subscribe(&format!("t{}", i), "std_msgs/Empty", Box::new(|_| true))
                .unwrap();
        }

        assert!(matches!(
            registry.subscribe("overflow", "std_msgs/Empty", Box::new(|_| true)),
            Err(Error::RegistryFull { kind: "subscriber" })
        ));
    }

    #[test]
    fn handler_lookup_covers_only_live_subscriber_slots() {
        let mut registry = TopicRegistry::new();
        registry
            .subscribe("cmd_vel", "geometry_msgs/Twist", Box::new(|_| true))
            .unwrap();

        assert!(registry.handler_for(DYNAMIC_ID_BASE).is_some());
        assert!(registry.handler_for(DYNAMIC_ID_BASE + 1).is_none()); // unassigned
        assert!(registry.handler_for(50).is_none()); // below dynamic range
        assert!(registry
            .handler_for((DYNAMIC_ID_BASE as usize + MAX_SUBSCRIBERS) as u16)
            .is_none()); // publisher range
    }

    #[test]
    fn announcements_list_publishers_first() {
        let mut registry = TopicRegistry::new();
        registry
            .subscribe("cmd_vel", "geometry_msgs/Twist", Box::new(|_| true))
            .unwrap();
        let publisher = registry.advertise("chatter", "std_msgs/String").unwrap();

        let list: Vec<_> = registry.announcements().collect();
        assert_eq!(list.len(), 2);

        assert_eq!(list[0].0, TOPIC_PUBLISHERS);
        assert_eq!(list[0].1.topic_id, publisher.id());
        assert_eq!(list[0].1.topic_name, "chatter");

        assert_eq!(list[1].0, TOPIC_SUBSCRIBERS);
        assert_eq!(list[1].1.topic_id, DYNAMIC_ID_BASE);
        assert_eq!(list[1].1.message_type, "geometry_msgs/Twist");
    }
}
