//! Per-connection subscription manager.
//!
//! Tracks which event topics a WebSocket observer wants and provides
//! server-side event filtering. New observers start on the session topic.

use std::collections::HashSet;

use crate::domain::EventTopic;

/// Topic name that selects every topic.
pub const WILDCARD: &str = "*";

/// Manages the set of topic subscriptions for a single observer.
#[derive(Debug)]
pub struct SubscriptionManager {
    topics: HashSet<EventTopic>,
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionManager {
    /// Creates a manager subscribed to [`EventTopic::Session`] only.
    #[must_use]
    pub fn new() -> Self {
        Self {
            topics: HashSet::from([EventTopic::Session]),
        }
    }

    /// Adds the named topics. Returns the names that were not recognized.
    pub fn subscribe(&mut self, names: &[String]) -> Vec<String> {
        let (topics, unknown) = parse_topics(names);
        self.topics.extend(topics);
        unknown
    }

    /// Removes the named topics. Returns the names that were not recognized.
    pub fn unsubscribe(&mut self, names: &[String]) -> Vec<String> {
        let (topics, unknown) = parse_topics(names);
        for topic in topics {
            self.topics.remove(&topic);
        }
        unknown
    }

    /// Returns `true` if events of `topic` should be forwarded.
    #[must_use]
    pub fn matches(&self, topic: EventTopic) -> bool {
        self.topics.contains(&topic)
    }

    /// Returns the subscribed topics in a stable order.
    #[must_use]
    pub fn topics(&self) -> Vec<EventTopic> {
        EventTopic::ALL
            .into_iter()
            .filter(|topic| self.topics.contains(topic))
            .collect()
    }
}

fn parse_topics(names: &[String]) -> (Vec<EventTopic>, Vec<String>) {
    let mut topics = Vec::new();
    let mut unknown = Vec::new();
    for name in names {
        match name.as_str() {
            WILDCARD => topics.extend(EventTopic::ALL),
            "session" => topics.push(EventTopic::Session),
            "upstream" => topics.push(EventTopic::Upstream),
            "outbound" => topics.push(EventTopic::Outbound),
            _ => unknown.push(name.clone()),
        }
    }
    (topics, unknown)
}
