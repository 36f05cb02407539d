//! Helpers for presenting job templates and their steps.
use uuid::Uuid;

use crate::model::{JobTemplate, TemplateId, TemplateStep};

pub const NO_TEMPLATE_LABEL: &str = "(none)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOption {
    pub label: String,
    pub id: TemplateId,
}

/// Selector options: a nil-id "(none)" entry followed by the templates in server order.
pub fn template_options(templates: &[JobTemplate]) -> Vec<TemplateOption> {
    std::iter::once(TemplateOption {
        label: NO_TEMPLATE_LABEL.to_string(),
        id: Uuid::nil(),
    })
    .chain(templates.iter().map(|template| TemplateOption {
        label: template.name.clone(),
        id: template.id,
    }))
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepProgress {
    Done,
    InProgress,
    NotStarted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepProgressView {
    pub label: String,
    pub progress: StepProgress,
}

/// Labels every template step relative to the job's completed step count.
pub fn step_progress(steps: &[TemplateStep], completed_steps: u32) -> Vec<StepProgressView> {
    let current = completed_steps as usize;
    steps
        .iter()
        .enumerate()
        .map(|(idx, step)| StepProgressView {
            label: step.in_progress_label.clone(),
            progress: match idx.cmp(&current) {
                std::cmp::Ordering::Less => StepProgress::Done,
                std::cmp::Ordering::Equal => StepProgress::InProgress,
                std::cmp::Ordering::Greater => StepProgress::NotStarted,
            },
        })
        .collect()
}
