//! RPC layer
//!
//! Named query/mutation/subscription operations with explicit field
//! selection, the response envelope and its single unwrap choke point, the
//! transport port, and an in-process store implementing the whole surface.

pub mod documents;
pub mod envelope;
pub mod memory;
pub mod transport;

pub use envelope::{unwrap_response, OperationKind, RemoteErrorEntry, RpcRequest, RpcResponse};
pub use memory::MemoryTransport;
pub use transport::{PushStream, RpcTransport};
