//! Collaborators injected into the backup runner

use crate::utils::template::{Clock, SystemClock};
use crate::utils::{CommandExecutor, RealExecutor};
use crate::vaults::aws::AwsClientFactory;
use crate::vaults::ClientFactory;
use std::sync::Arc;

/// Subprocess runner, clock and storage client factory for one run
#[derive(Clone)]
pub struct BackupContext {
    pub executor: Arc<dyn CommandExecutor>,
    pub clock: Arc<dyn Clock>,
    pub clients: Arc<dyn ClientFactory>,
}

impl BackupContext {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        clock: Arc<dyn Clock>,
        clients: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            executor,
            clock,
            clients,
        }
    }

    /// Real subprocesses, wall clock and AWS clients
    pub fn real() -> Self {
        Self::new(
            Arc::new(RealExecutor::new()),
            Arc::new(SystemClock),
            Arc::new(AwsClientFactory::new()),
        )
    }
}
