//! Control gateway to the Murmur voice server.

mod client;
mod error;
mod http;
mod transport;
mod types;

pub use client::{connect_or_warn, MurmurControl, MurmurGateway};
pub use error::{GatewayError, GatewayResult};
pub use http::HttpTransport;
pub use transport::MetaTransport;
pub use types::{
    AclEntry, ChannelAcl, ChannelInfo, NewChannel, NewRegistration, OnlineUser, ServerSummary,
    UserRecord,
};
