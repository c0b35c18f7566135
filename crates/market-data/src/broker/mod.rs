//! Brokerage session management.
//!
//! - `gateway` - The transport trait the broker's client library is bound to
//! - `supervisor` - Single shared session with client-id conflict resolution
//! - `orders` - Order and position types passed through the gateway

mod gateway;
mod orders;
mod supervisor;

pub use gateway::{
    BrokerBar, BrokerGateway, BrokerTick, Contract, GatewayError, HistoryRequest,
    CLIENT_ID_IN_USE_CODE,
};
pub use orders::{BracketOrder, BrokerPosition, EntryKind, OrderAck, OrderSide};
pub use supervisor::{
    pick_client_id, BrokerSettings, ConnectionState, ConnectionSupervisor, CLIENT_ID_RANGE,
};
