pub mod models;
pub use models::*;

mod registry;
pub use registry::*;

mod tracker;
pub use tracker::DeliveryTracker;

pub mod fetcher;

mod broadcaster;
pub use broadcaster::Broadcaster;

mod stream;
pub use stream::notifications_sse;
