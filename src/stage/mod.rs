mod activity;
mod commit;
mod controller;
mod pipeline;

pub use activity::{ActivityComposer, NoteDraft, thread_parent_id};
pub use commit::{CommitOutcome, CommitState, TwoPhaseCommit, commit_with_prompt};
pub use controller::{StageController, TransitionOutcome, TransitionPlan};
pub use pipeline::StagePipeline;
