//! Broker acknowledgement tracking for outbound publishes.
//!
//! `AsyncClient::publish` returns once the request is queued locally. The
//! event loop later reports the write as `Outgoing::Publish(pkid)`, in
//! queue order, and the broker's acceptance as `Incoming::PubAck`. The
//! tracker pairs the two so a tagged message counts as delivered only when
//! its PUBACK arrives.

use std::collections::{HashMap, VecDeque};

use rumqttc::{Event, Outgoing, Packet};

#[derive(Debug)]
pub struct DeliveryTracker<T> {
    /// Queued publishes not yet written, oldest first. `None` marks an
    /// untracked publish (e.g. QoS 0) that still occupies a slot.
    queued: VecDeque<Option<T>>,
    in_flight: HashMap<u16, T>,
}

impl<T> Default for DeliveryTracker<T> {
    fn default() -> Self {
        Self {
            queued: VecDeque::new(),
            in_flight: HashMap::new(),
        }
    }
}

impl<T> DeliveryTracker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a publish the client accepted into its request queue.
    pub fn queued(&mut self, tag: Option<T>) {
        self.queued.push_back(tag);
    }

    /// Advance on one event loop event. Returns the tag of a publish the
    /// broker has just acknowledged.
    pub fn on_event(&mut self, event: &Event) -> Option<T> {
        match event {
            Event::Outgoing(Outgoing::Publish(pkid)) => {
                match self.queued.pop_front() {
                    Some(Some(tag)) if *pkid != 0 => {
                        self.in_flight.insert(*pkid, tag);
                    }
                    Some(_) => {}
                    None => tracing::debug!(pkid, "outgoing publish was not queued through the hub"),
                }
                None
            }
            Event::Incoming(Packet::PubAck(ack)) => self.in_flight.remove(&ack.pkid),
            _ => None,
        }
    }
}

impl<T: Clone + Ord> DeliveryTracker<T> {
    /// Tagged publishes still waiting for a PUBACK, sorted.
    pub fn pending(&self) -> Vec<T> {
        let mut pending: Vec<T> = self
            .in_flight
            .values()
            .cloned()
            .chain(self.queued.iter().flatten().cloned())
            .collect();
        pending.sort();
        pending
    }
}
