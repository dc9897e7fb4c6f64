//! Business services behind the edge functions
//!
//! Pure calculators (CNPJ, sentiment, ROI, matching) are free functions;
//! everything that talks to storage or an upstream API is a service struct
//! built once at startup and shared through `AppState`.

pub mod assistant;
pub mod checkout;
pub mod cnpj;
pub mod handoff;
pub mod knowledge;
pub mod matching;
pub mod notifications;
pub mod regulatory;
pub mod roi;
pub mod sentiment;

pub use assistant::AssistantService;
pub use checkout::CheckoutClient;
pub use handoff::{Dispatcher, HandoffService, HttpDispatcher};
pub use knowledge::KnowledgeService;
pub use notifications::Notifier;
pub use regulatory::RegulatoryService;
