pub mod geometry;
pub mod routing;
pub mod store;

pub use routing::{
    calculator_from_config, client_from_config, FallbackOnly, OpenRouteServiceClient,
    YandexRouterClient,
};
pub use store::{SnapshotStore, StoreError};
