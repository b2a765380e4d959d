use crate::gateway::MAX_BATCH_SIZE;

/// Engine settings, snapshotted at the start of every send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    auth: Option<String>,
    verbose: bool,
    dry_run: bool,
    group_size: usize,
}

impl DispatcherConfig {
    pub fn new(auth: Option<String>) -> Self {
        Self {
            auth,
            verbose: false,
            dry_run: false,
            group_size: MAX_BATCH_SIZE,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Requested batch size; zero means the provider limit, anything above
    /// it is clamped down.
    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = match group_size {
            0 => MAX_BATCH_SIZE,
            n => n.min(MAX_BATCH_SIZE),
        };
        self
    }

    /// Credential, if one is configured and non-empty.
    pub fn auth(&self) -> Option<&str> {
        self.auth.as_deref().filter(|auth| !auth.is_empty())
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new(None)
    }
}
