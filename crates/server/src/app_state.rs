use std::sync::Arc;

use game_api::{GameContext, OpponentConfig};
use registry::GameRegistry;

use crate::gateway::Gateway;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) ctx: GameContext,
    pub(crate) gateway: Arc<Gateway>,
}

impl AppState {
    pub(crate) fn new(opponent: OpponentConfig) -> Self {
        let gateway = Arc::new(Gateway::new());
        let ctx = GameContext::new(GameRegistry::new(), gateway.clone(), opponent);
        Self { ctx, gateway }
    }
}
