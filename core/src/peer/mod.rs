pub mod link;
pub mod message;

pub use link::{PeerAlert, PeerLink, SEND_REDUNDANCY};
pub use message::{PeerAlertMessage, ALERT_EVENT};
