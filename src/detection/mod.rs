//! Token-identity resolution: address grammar, per-site adapters, the
//! adapter registry and the detection session state machine.

pub mod address;
pub mod page;
pub mod adapters;
pub mod registry;
pub mod session;

pub use adapters::{HostMatch, SiteAdapter, SiteRule, BUILTIN_RULES};
pub use page::{DomSelector, PageElement, PageSnapshot};
pub use registry::AdapterRegistry;
pub use session::{DetectionSession, DetectionTrigger, FetchTicket, Transition};
