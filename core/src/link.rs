//! The seam between the engine and the wire.

use async_trait::async_trait;
use starve_protocols::{CaptureFilter, Captured, Frame};
use tokio::time::Instant;

pub mod memory;

pub use memory::MemoryLink;

#[async_trait]
pub trait PacketLink: Send + Sync {
    /// Transmits one frame. Failures are not retried.
    fn send(&self, frame: &Frame) -> anyhow::Result<()>;

    /// Next captured packet matching `filter`, or `None` once `deadline` passes.
    async fn capture_until(
        &self,
        filter: &CaptureFilter,
        deadline: Instant,
    ) -> anyhow::Result<Option<Captured>>;
}
