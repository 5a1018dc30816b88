//! Passive learning from turn-taking in a channel.
//!
//! Every passive message is remembered for one conversation timeout. When a
//! new message arrives, the most recent still-fresh message in the same channel
//! is taken as the prompt that the new message answers.

use std::{collections::VecDeque, time::Duration};

use log::debug;

use crate::types::{MessageRecord, TrainingExample};

#[derive(Debug)]
pub struct ConversationTracker {
    log: VecDeque<MessageRecord>,
    timeout: Duration,
}

impl ConversationTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            log: VecDeque::new(),
            timeout,
        }
    }

    /// Record `message` and return the pair it completes, if any.
    ///
    /// The arrival time of `message` is the clock: anything older than the
    /// timeout relative to it is dropped for good before pairing.
    pub fn observe(&mut self, message: MessageRecord) -> Option<TrainingExample> {
        let now = message.timestamp;
        let timeout = self.timeout;
        let before = self.log.len();
        self.log
            .retain(|m| now.saturating_duration_since(m.timestamp) <= timeout);
        let evicted = before - self.log.len();
        if evicted > 0 {
            debug!("Evicted {evicted} stale messages from the conversation log");
        }

        let pair = self
            .log
            .iter()
            .rev()
            .find(|m| m.channel_id == message.channel_id)
            .map(|prompt| TrainingExample::new(&prompt.content, &message.content));

        self.log.push_back(message);
        pair
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn records(&self) -> impl Iterator<Item = &MessageRecord> {
        self.log.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use poise::serenity_prelude::ChannelId;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(60);

    fn record(start: Instant, secs: u64, channel: u64, content: &str) -> MessageRecord {
        MessageRecord {
            timestamp: start + Duration::from_secs(secs),
            content: content.to_string(),
            channel_id: ChannelId::new(channel),
        }
    }

    #[test]
    fn pairs_consecutive_messages_in_a_channel() {
        let start = Instant::now();
        let mut tracker = ConversationTracker::new(TIMEOUT);

        assert_eq!(tracker.observe(record(start, 0, 1, "What's up")), None);
        assert_eq!(
            tracker.observe(record(start, 5, 1, "Nothing much")),
            Some(TrainingExample::new("What's up", "Nothing much"))
        );
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn stale_prompt_is_evicted_instead_of_paired() {
        let start = Instant::now();
        let mut tracker = ConversationTracker::new(TIMEOUT);

        tracker.observe(record(start, 0, 1, "What's up"));
        assert_eq!(tracker.observe(record(start, 90, 1, "Nothing much")), None);

        let contents: Vec<_> = tracker.records().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Nothing much"]);
    }

    #[test]
    fn gap_equal_to_timeout_still_pairs() {
        let start = Instant::now();
        let mut tracker = ConversationTracker::new(TIMEOUT);

        tracker.observe(record(start, 0, 1, "ping"));
        assert_eq!(
            tracker.observe(record(start, 60, 1, "pong")),
            Some(TrainingExample::new("ping", "pong"))
        );
    }

    #[test]
    fn channels_never_pair_with_each_other() {
        let start = Instant::now();
        let mut tracker = ConversationTracker::new(TIMEOUT);

        tracker.observe(record(start, 0, 1, "in one"));
        assert_eq!(tracker.observe(record(start, 1, 2, "in two")), None);
        assert_eq!(
            tracker.observe(record(start, 2, 1, "back in one")),
            Some(TrainingExample::new("in one", "back in one"))
        );
    }

    #[test]
    fn only_the_nearest_prompt_is_used() {
        let start = Instant::now();
        let mut tracker = ConversationTracker::new(TIMEOUT);

        tracker.observe(record(start, 0, 1, "first"));
        tracker.observe(record(start, 1, 2, "elsewhere"));
        tracker.observe(record(start, 2, 1, "second"));

        assert_eq!(
            tracker.observe(record(start, 3, 1, "third")),
            Some(TrainingExample::new("second", "third"))
        );
    }

    #[test]
    fn log_holds_nothing_stale_after_observing() {
        let start = Instant::now();
        let mut tracker = ConversationTracker::new(TIMEOUT);

        for secs in [0, 10, 20, 30] {
            tracker.observe(record(start, secs, secs % 2 + 1, "chatter"));
        }
        tracker.observe(record(start, 85, 1, "late"));

        let now = start + Duration::from_secs(85);
        assert!(tracker.records().all(|m| now - m.timestamp <= TIMEOUT));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn evicted_records_never_come_back() {
        let start = Instant::now();
        let mut tracker = ConversationTracker::new(TIMEOUT);

        tracker.observe(record(start, 0, 1, "ancient"));
        tracker.observe(record(start, 100, 2, "elsewhere"));
        assert_eq!(tracker.observe(record(start, 101, 1, "reply")), None);
        assert!(tracker.records().all(|m| m.content != "ancient"));
    }
}
