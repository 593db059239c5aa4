use dossier_model_gateway::GatewayError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline stage, named in errors so the user can retry that stage alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Questions,
    Context,
    Report,
    Summary,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Questions => "question generation",
            Stage::Context => "context retrieval",
            Stage::Report => "report synthesis",
            Stage::Summary => "summary extraction",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: GatewayError,
    },

    #[error("summary not yet available: {0}")]
    SummaryUnavailable(String),

    #[error("summary failed validation: {0}")]
    InvalidSummary(String),

    #[error("no report exists for this session yet")]
    MissingReport,

    #[error("correction instructions must not be empty")]
    EmptyCorrections,
}

impl PipelineError {
    pub(crate) fn stage(stage: Stage, source: GatewayError) -> Self {
        Self::Stage { stage, source }
    }
}
