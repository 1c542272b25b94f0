pub mod error;
pub mod health_probe;
pub mod http_dispatcher;
pub mod routes;

pub use error::DispatchError;
pub use health_probe::HttpHealthProbe;
pub use http_dispatcher::HttpMutationDispatcher;
pub use routes::RemoteRoute;
