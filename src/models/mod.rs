pub mod evaluation;
pub mod loaders;
pub mod metrics;
pub mod phase;
pub mod student;
pub mod subject;

pub use evaluation::{EvaluationRecord, QuestionOutcome};
pub use loaders::{load_dataset, Dataset, InstitutionRecord};
pub use metrics::{PhaseMetrics, PriorPhaseSnapshot, RankResult, SubjectScoreEntry};
pub use phase::Phase;
pub use student::{BatchTask, CohortKey, StudentProfile, StudentRef, StudentReport};
pub use subject::{normalize, CanonicalSubject, SubjectLabel};
