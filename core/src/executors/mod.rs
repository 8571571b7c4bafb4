//! Concrete [`crate::operation::OperationExecutor`] implementations, one per
//! [`crate::operation::OperationType`].

pub mod array_start;
pub mod array_stop;
pub mod bulk_container;
pub mod bulk_vm;
pub mod parity;
pub mod smart_scan;
pub mod system_power;

pub use array_start::ArrayStartExecutor;
pub use array_stop::ArrayStopExecutor;
pub use bulk_container::BulkContainerExecutor;
pub use bulk_vm::BulkVmExecutor;
pub use parity::ParityExecutor;
pub use smart_scan::SmartScanExecutor;
pub use system_power::{RebootExecutor, ShutdownExecutor};
