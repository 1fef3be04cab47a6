use serde::{Deserialize, Serialize};

use crate::container::ConversionDefaults;
use crate::orchestrator::OrchestratorConfig;
use crate::render::RendererConfig;
use crate::runner::ConverterConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub defaults: ConversionDefaults,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
}
