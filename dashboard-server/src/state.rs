//! Shared application state

use std::sync::Arc;

use threatflow_core::{EventPipeline, FlowAnalyzer, PipelineState};

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<EventPipeline>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pipeline: Arc<EventPipeline>, config: Config) -> Self {
        Self {
            pipeline,
            config: Arc::new(config),
        }
    }

    pub fn analyzer(&self) -> &FlowAnalyzer {
        self.pipeline.analyzer()
    }

    pub fn history(&self) -> &PipelineState {
        self.pipeline.state()
    }
}
