//! Submission lifecycle
//!
//! `status` holds the closed state set and the one transition table; `engine`
//! runs every status change through it as a single conditional update.

pub mod engine;
pub mod model;
pub mod status;
pub mod store;

pub use engine::{apply_approval, apply_transition, SubmissionWorkflow};
pub use model::{
    DraftEdit, FacultyAssignment, NewSubmission, Submission, SubmissionQuery, WorkRecord,
    DEFAULT_WORK_STAGE,
};
pub use status::{Actor, SubmissionStatus, Transition, TRANSITIONS};
pub use store::{AssignmentStore, IncubationStore, StatusChange, SubmissionStore};
