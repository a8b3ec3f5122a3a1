pub mod evaluation_resolver;
pub mod ranking;
pub mod scoring;

pub use evaluation_resolver::{EvaluationResolver, ResolvedEvaluations};
pub use ranking::{CohortSnapshot, MemberScores, RankingService};
pub use scoring::{percentile, ScoringEngine};
