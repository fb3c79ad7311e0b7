//! Legal job and application transitions, defined once.
//!
//! Service operations ask the machine for the next status before touching the
//! store, then persist the answer with a conditional write keyed on the status
//! they observed. The machine itself is pure.

use super::domain::{ApplicationStatus, JobStatus};

/// Something an actor asks to happen to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    SubmitApplication,
    AcceptApplication,
    RejectApplication,
    Edit,
    Complete,
    Delete,
}

/// Owner decision applied to a single application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("job is {0} and no longer accepting applications or selections")]
    NotOpen(JobStatus),
    #[error("job is {0}; only in-progress jobs can be completed")]
    NotInProgress(JobStatus),
    #[error("cannot delete completed jobs")]
    CompletedIsPermanent,
    #[error("job is {0} and can no longer change")]
    Closed(JobStatus),
    #[error("application was already {0}")]
    AlreadyDecided(ApplicationStatus),
}

/// Job transition table with the one product switch that widens it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStateMachine {
    allow_complete_from_posted: bool,
}

impl JobStateMachine {
    pub const fn new(allow_complete_from_posted: bool) -> Self {
        Self {
            allow_complete_from_posted,
        }
    }

    /// Status the job holds after `event`, or why the event is illegal from `from`.
    pub const fn next(&self, from: JobStatus, event: JobEvent) -> Result<JobStatus, TransitionError> {
        use JobEvent::*;
        use JobStatus::*;

        match (from, event) {
            (Posted, SubmitApplication) | (Posted, Edit) => Ok(Posted),
            (_, SubmitApplication) | (_, AcceptApplication) | (_, Edit) if !matches!(from, Posted) => {
                Err(TransitionError::NotOpen(from))
            }
            (Posted, AcceptApplication) => Ok(InProgress),
            (Posted, RejectApplication) | (InProgress, RejectApplication) => Ok(from),
            (InProgress, Complete) => Ok(Completed),
            (Posted, Complete) if self.allow_complete_from_posted => Ok(Completed),
            (Posted, Complete) | (Cancelled, Complete) => Err(TransitionError::NotInProgress(from)),
            (Posted, Delete) | (InProgress, Delete) => Ok(Cancelled),
            (Completed, Delete) => Err(TransitionError::CompletedIsPermanent),
            (Completed, _) | (Cancelled, _) => Err(TransitionError::Closed(from)),
            // Posted/InProgress with events already covered above.
            (_, _) => Err(TransitionError::NotOpen(from)),
        }
    }
}

impl ApplicationStatus {
    /// Only pending applications can be decided, and only once.
    pub const fn decide(self, decision: Decision) -> Result<ApplicationStatus, TransitionError> {
        match (self, decision) {
            (ApplicationStatus::Pending, Decision::Accept) => Ok(ApplicationStatus::Accepted),
            (ApplicationStatus::Pending, Decision::Reject) => Ok(ApplicationStatus::Rejected),
            (decided, _) => Err(TransitionError::AlreadyDecided(decided)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_EVENTS: [JobEvent; 6] = [
        JobEvent::SubmitApplication,
        JobEvent::AcceptApplication,
        JobEvent::RejectApplication,
        JobEvent::Edit,
        JobEvent::Complete,
        JobEvent::Delete,
    ];

    #[test]
    fn decided_applications_name_their_status() {
        let err = ApplicationStatus::Rejected
            .decide(Decision::Accept)
            .expect_err("rejected is terminal");
        assert_eq!(err.to_string(), "application was already rejected");
    }

    #[test]
    fn posted_jobs_accept_applications_and_selection() {
        let machine = JobStateMachine::default();
        assert_eq!(
            machine.next(JobStatus::Posted, JobEvent::SubmitApplication),
            Ok(JobStatus::Posted)
        );
        assert_eq!(
            machine.next(JobStatus::Posted, JobEvent::AcceptApplication),
            Ok(JobStatus::InProgress)
        );
        assert_eq!(
            machine.next(JobStatus::Posted, JobEvent::Edit),
            Ok(JobStatus::Posted)
        );
    }

    #[test]
    fn in_progress_jobs_refuse_new_applications_and_edits() {
        let machine = JobStateMachine::default();
        for event in [
            JobEvent::SubmitApplication,
            JobEvent::AcceptApplication,
            JobEvent::Edit,
        ] {
            assert_eq!(
                machine.next(JobStatus::InProgress, event),
                Err(TransitionError::NotOpen(JobStatus::InProgress))
            );
        }
        assert_eq!(
            machine.next(JobStatus::InProgress, JobEvent::RejectApplication),
            Ok(JobStatus::InProgress)
        );
    }

    #[test]
    fn completion_requires_in_progress_unless_widened() {
        let strict = JobStateMachine::default();
        assert_eq!(
            strict.next(JobStatus::InProgress, JobEvent::Complete),
            Ok(JobStatus::Completed)
        );
        assert_eq!(
            strict.next(JobStatus::Posted, JobEvent::Complete),
            Err(TransitionError::NotInProgress(JobStatus::Posted))
        );

        let lenient = JobStateMachine::new(true);
        assert_eq!(
            lenient.next(JobStatus::Posted, JobEvent::Complete),
            Ok(JobStatus::Completed)
        );
    }

    #[test]
    fn delete_cancels_open_jobs_and_refuses_completed_ones() {
        let machine = JobStateMachine::default();
        assert_eq!(
            machine.next(JobStatus::Posted, JobEvent::Delete),
            Ok(JobStatus::Cancelled)
        );
        assert_eq!(
            machine.next(JobStatus::InProgress, JobEvent::Delete),
            Ok(JobStatus::Cancelled)
        );
        let err = machine
            .next(JobStatus::Completed, JobEvent::Delete)
            .expect_err("completed jobs are permanent");
        assert_eq!(err.to_string(), "cannot delete completed jobs");
    }

    #[test]
    fn terminal_states_admit_nothing() {
        let machine = JobStateMachine::new(true);
        for status in [JobStatus::Completed, JobStatus::Cancelled] {
            for event in ALL_EVENTS {
                assert!(
                    machine.next(status, event).is_err(),
                    "{status} should refuse {event:?}"
                );
            }
        }
    }

    #[test]
    fn applications_are_decided_once() {
        assert_eq!(
            ApplicationStatus::Pending.decide(Decision::Accept),
            Ok(ApplicationStatus::Accepted)
        );
        assert_eq!(
            ApplicationStatus::Accepted.decide(Decision::Reject),
            Err(TransitionError::AlreadyDecided(ApplicationStatus::Accepted))
        );
        assert_eq!(
            ApplicationStatus::Rejected.decide(Decision::Reject),
            Err(TransitionError::AlreadyDecided(ApplicationStatus::Rejected))
        );
    }
}
