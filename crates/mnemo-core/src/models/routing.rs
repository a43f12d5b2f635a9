use serde::{Deserialize, Serialize};

/// The four-way classification a Turn is routed into by the Governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingScenario {
    NewTopicFirst,
    TopicContinuation,
    TopicResumption,
    TopicShift,
}

impl RoutingScenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingScenario::NewTopicFirst => "NewTopicFirst",
            RoutingScenario::TopicContinuation => "TopicContinuation",
            RoutingScenario::TopicResumption => "TopicResumption",
            RoutingScenario::TopicShift => "TopicShift",
        }
    }
}

/// Output of `Governor::route`. `matched_thread_id` is the Thread the Turn
/// should be appended to (Continuation/Resumption); `active_thread_id` is the
/// currently-ACTIVE Thread to be paused (Resumption/Shift).
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub scenario: RoutingScenario,
    pub matched_thread_id: Option<String>,
    pub active_thread_id: Option<String>,
}

impl RoutingDecision {
    pub fn new_topic_first() -> Self {
        Self {
            scenario: RoutingScenario::NewTopicFirst,
            matched_thread_id: None,
            active_thread_id: None,
        }
    }

    pub fn continuation(matched_thread_id: String) -> Self {
        Self {
            scenario: RoutingScenario::TopicContinuation,
            matched_thread_id: Some(matched_thread_id),
            active_thread_id: None,
        }
    }

    pub fn resumption(matched_thread_id: String, active_thread_id: String) -> Self {
        Self {
            scenario: RoutingScenario::TopicResumption,
            matched_thread_id: Some(matched_thread_id),
            active_thread_id: Some(active_thread_id),
        }
    }

    pub fn shift(active_thread_id: String) -> Self {
        Self {
            scenario: RoutingScenario::TopicShift,
            matched_thread_id: None,
            active_thread_id: Some(active_thread_id),
        }
    }
}
