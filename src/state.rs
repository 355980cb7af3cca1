use std::sync::Arc;

use crate::config::Config;
use crate::services::llm::StoryModel;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub model: Arc<dyn StoryModel>,
}

impl AppState {
    pub fn new(config: Config, model: Arc<dyn StoryModel>) -> Self {
        Self {
            config: Arc::new(config),
            model,
        }
    }
}
