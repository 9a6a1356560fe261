//! Typed message bus adapter for AegisShield: publish/subscribe with
//! batched writes, headers, and retry on transient errors.

pub mod bus;
pub mod events;

pub use bus::{Delivery, InMemoryMessageBus, MessageBusConsumer, MessageBusProducer};
pub use events::{
    AnalysisCompletedEvent, BusEvent, DataProcessingEvent, DataValidationEvent,
    EntityResolvedEvent, ErrorEvent, FileUploadEvent, Headers, InvestigationCreatedEvent,
    PatternDetectedEvent, TransactionFlowEvent,
};
