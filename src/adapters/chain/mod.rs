//! Chain Adapters - RPC Connection and Gateway
//!
//! Connection management and the alloy-backed `EvmGateway`
//! implementation every module adapter reads and writes through.

pub mod gateway;
pub mod provider;

pub use gateway::AlloyGateway;
pub use provider::RpcProvider;
