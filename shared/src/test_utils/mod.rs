pub mod memory_store;
pub mod mock_billing;
pub mod mock_gateway;
pub mod mock_queue;

pub use memory_store::MemoryKvStore;
pub use mock_billing::MockBilling;
pub use mock_gateway::{MockAdsGateway, MockGatewayFactory};
pub use mock_queue::MockTaskQueue;
