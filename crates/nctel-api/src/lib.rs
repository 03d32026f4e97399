// nctel-api: wire-facing types for NETCONF telemetry collection.

pub mod error;
pub mod hostkey;
pub mod payload;
pub mod request;
pub mod session;
pub mod xml;

pub use error::Error;
pub use hostkey::{HostKeyFingerprint, HostKeyPolicy};
pub use payload::{PayloadTree, QualifiedName, Value};
pub use request::{Notification, NotificationKind, Reply, Request, Trigger};
pub use session::{Auth, Connector, DialParams, Session, Transport};
