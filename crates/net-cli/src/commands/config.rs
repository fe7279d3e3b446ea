//! Configuration display

use std::sync::Arc;

use anyhow::Result;

use crate::context::AppContext;

pub struct ConfigCommand {
    context: Arc<AppContext>,
}

impl ConfigCommand {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Effective configuration as TOML, password masked
    pub fn show(&self) -> Result<String> {
        Ok(self.context.config.to_toml()?)
    }
}
