//! Event predicates

use super::registry::{EventToggles, EventType, Gate};
use super::Event;
use serde_json::Value;

/// One predicate an event must satisfy
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Exact decoded kind
    Type(EventType),
    /// Exact wire name
    Name(String),
    /// Named attribute equality, see [`Event::attribute`]
    Attribute(String, Value),
}

impl Condition {
    pub fn name(name: impl Into<String>) -> Self {
        Condition::Name(name.into())
    }

    pub fn attribute(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Attribute(key.into(), value.into())
    }

    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Condition::Type(ty) => event.event_type() == *ty,
            Condition::Name(name) => event.name == *name,
            Condition::Attribute(key, expected) => event.attribute(key).as_ref() == Some(expected),
        }
    }

    /// False when no event satisfying this condition can arrive under `toggles`
    pub fn can_reach(&self, toggles: &EventToggles) -> bool {
        match self {
            Condition::Type(ty) => ty.can_reach(toggles),
            Condition::Name(name) => EventType::lookup(name).can_reach(toggles),
            Condition::Attribute(key, Value::String(domain)) if key == "domain" => {
                Gate::for_domain(domain).map_or(true, |gate| gate.is_open(toggles))
            }
            Condition::Attribute(..) => true,
        }
    }
}

/// True if `event` satisfies every condition
pub fn matches(event: &Event, conditions: &[Condition]) -> bool {
    conditions.iter().all(|condition| condition.matches(event))
}

/// Pre-flight check that an event satisfying `conditions` can arrive at all
pub fn can_receive(toggles: &EventToggles, conditions: &[Condition]) -> bool {
    conditions.iter().all(|condition| condition.can_reach(toggles))
}
