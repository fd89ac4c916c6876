use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("duplicate step '{0}' in task graph")]
  DuplicateStep(String),

  #[error("step '{step}' requires unknown step '{requires}'")]
  UnknownPrerequisite { step: String, requires: String },

  #[error("dependency cycle involving steps {0:?}")]
  Cycle(Vec<String>),
}
