/// Product rules that vary between deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationPolicy {
    /// When false, a freelancer with a pending or accepted application on a
    /// job cannot apply to it again.
    pub allow_duplicate_applications: bool,
    /// Cap on a client's posted plus in-progress jobs. `None` means unlimited.
    pub max_active_jobs_per_client: Option<u32>,
    /// Lets a client close a job that never had an accepted application.
    pub allow_complete_from_posted: bool,
}

impl Default for ApplicationPolicy {
    fn default() -> Self {
        Self {
            allow_duplicate_applications: true,
            max_active_jobs_per_client: None,
            allow_complete_from_posted: false,
        }
    }
}
