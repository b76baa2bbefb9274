//! Static wire-name registry and capability gates

use phf::phf_map;

/// Every decoded event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    PageLoaded,
    PageDomContentLoaded,
    ConsoleMessage,
    ConsoleRepeatCount,
    ConsoleCleared,
    DomDocumentUpdated,
    DomChildNodes,
    DomAttributeModified,
    DomAttributeRemoved,
    NetworkRequest,
    NetworkResponse,
    NetworkData,
    NetworkLoad,
    NetworkFailure,
    NetworkCacheHit,
    /// Any notification without a registered decoder
    Generic,
}

/// Compile-time table from wire name to event kind.
///
/// A duplicate key fails the build.
static REGISTRY: phf::Map<&'static str, EventType> = phf_map! {
    "Page.loadEventFired" => EventType::PageLoaded,
    "Page.domContentEventFired" => EventType::PageDomContentLoaded,
    "Console.messageAdded" => EventType::ConsoleMessage,
    "Console.messageRepeatCountUpdated" => EventType::ConsoleRepeatCount,
    "Console.messagesCleared" => EventType::ConsoleCleared,
    "DOM.documentUpdated" => EventType::DomDocumentUpdated,
    "DOM.setChildNodes" => EventType::DomChildNodes,
    "DOM.attributeModified" => EventType::DomAttributeModified,
    "DOM.attributeRemoved" => EventType::DomAttributeRemoved,
    "Network.requestWillBeSent" => EventType::NetworkRequest,
    "Network.responseReceived" => EventType::NetworkResponse,
    "Network.dataReceived" => EventType::NetworkData,
    "Network.loadingFinished" => EventType::NetworkLoad,
    "Network.loadingFailed" => EventType::NetworkFailure,
    "Network.requestServedFromCache" => EventType::NetworkCacheHit,
};

/// Event families the peer only emits after the matching `X.enable`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventToggles {
    pub console: bool,
    pub network: bool,
    pub page: bool,
}

/// Feature toggle an event family depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Console,
    Network,
    Page,
}

impl Gate {
    /// Protocol domain enabled by this toggle
    pub const fn domain(self) -> &'static str {
        match self {
            Gate::Console => "Console",
            Gate::Network => "Network",
            Gate::Page => "Page",
        }
    }

    /// Gate for a protocol domain, if that domain is gated
    pub fn for_domain(domain: &str) -> Option<Gate> {
        [Gate::Console, Gate::Network, Gate::Page]
            .into_iter()
            .find(|gate| gate.domain() == domain)
    }

    /// True if the toggle is on
    pub fn is_open(self, toggles: &EventToggles) -> bool {
        match self {
            Gate::Console => toggles.console,
            Gate::Network => toggles.network,
            Gate::Page => toggles.page,
        }
    }
}

impl EventType {
    /// Kind registered for a wire name; unknown names are `Generic`
    pub fn lookup(name: &str) -> EventType {
        REGISTRY.get(name).copied().unwrap_or(EventType::Generic)
    }

    /// Registered wire name, if any
    pub fn wire_name(self) -> Option<&'static str> {
        REGISTRY
            .entries()
            .find(|(_, ty)| **ty == self)
            .map(|(name, _)| *name)
    }

    /// Toggle that must be on for the peer to emit this kind
    pub const fn gate(self) -> Option<Gate> {
        match self {
            EventType::PageLoaded | EventType::PageDomContentLoaded => Some(Gate::Page),
            EventType::ConsoleMessage
            | EventType::ConsoleRepeatCount
            | EventType::ConsoleCleared => Some(Gate::Console),
            EventType::NetworkRequest
            | EventType::NetworkResponse
            | EventType::NetworkData
            | EventType::NetworkLoad
            | EventType::NetworkFailure
            | EventType::NetworkCacheHit => Some(Gate::Network),
            EventType::DomDocumentUpdated
            | EventType::DomChildNodes
            | EventType::DomAttributeModified
            | EventType::DomAttributeRemoved
            | EventType::Generic => None,
        }
    }

    /// True if the peer can emit this kind under the given toggles
    pub fn can_reach(self, toggles: &EventToggles) -> bool {
        self.gate().map_or(true, |gate| gate.is_open(toggles))
    }
}
