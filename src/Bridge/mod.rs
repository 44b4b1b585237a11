pub mod boundary;
pub mod builder;
pub mod lifecycle;
pub mod loopback;
pub mod transport;

pub use boundary::{Boundary, Disconnected};
pub use builder::TransportBuilder;
pub use lifecycle::{DataFolders, Lifecycle};
pub use loopback::{Arrival, LoopbackBoundary};
pub use transport::{Handler, Transport};
