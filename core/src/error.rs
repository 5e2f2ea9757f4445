use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttackError {
    /// No server answered within the retry budget.
    #[error("no DHCP server answered after {attempts} attempts")]
    NoServerResponse { attempts: u32 },
    #[error("interrupted")]
    Interrupted,
    /// A sender or the dispatcher failed.
    #[error("worker failed: {0:#}")]
    Worker(anyhow::Error),
    /// The link could not be used outside of a worker.
    #[error("link failure: {0:#}")]
    Link(anyhow::Error),
}
