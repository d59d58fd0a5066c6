//! The caching worker: routing, interception and the version lifecycle.

mod clients;
mod interceptor;
mod lifecycle;
mod registration;
mod routing;

pub use clients::{ClientId, Clients, PageClient};
pub use interceptor::FetchInterceptor;
pub use lifecycle::{ActivateReport, CacheWorker, InstallReport, SeedFailure, WorkerState};
pub use registration::{RegisterOutcome, Registration, RegistrationStatus};
pub use routing::{BypassReason, Route, RoutePolicy};
