/// Router configuration loading.
pub mod config;
/// Common error types for registration and dispatch.
pub mod error;
/// Flexible logging initialization over `tracing`.
pub mod logging;
/// Routing core: registry, dispatcher, registration facade.
pub mod router;
/// Topic keys and wildcard patterns.
pub mod topic;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::RouterConfig;
/// Operation errors.
pub use error::RouterError;
/// Routing core API.
pub use router::{
    add_publisher, add_static_subscriber, add_subscriber, publish, remove_publisher,
    remove_subscriber, set_enabled, unregister, BoundHandler, DataEvent, Declaration, DeliveryMode,
    DispatchContext, Endpoint, ErrorSink, Event, EventBridge, EventPayload, EventRouter,
    EventScope, TracingSink, UnitId,
};
/// Topic keys and compiled patterns.
pub use topic::{has_wildcard, normalize, TopicPattern};
