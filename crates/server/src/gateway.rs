//! Realtime fanout: one outbound queue per connected client, a lobby group,
//! and one subscriber group per game.

use dashmap::{DashMap, DashSet};
use game_api::EventSink;
use shared::{
    domain::{ClientId, Game, GameId},
    error::ApiError,
    protocol::ServerEvent,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub type Outbox = mpsc::UnboundedReceiver<ServerEvent>;

#[derive(Default)]
pub struct Gateway {
    clients: DashMap<ClientId, mpsc::UnboundedSender<ServerEvent>>,
    lobby: DashSet<ClientId>,
    games: DashMap<GameId, DashSet<ClientId>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self) -> (ClientId, Outbox) {
        let client_id = ClientId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.insert(client_id, tx);
        (client_id, rx)
    }

    pub fn disconnect(&self, client_id: ClientId) {
        self.clients.remove(&client_id);
        self.lobby.remove(&client_id);
        self.games.retain(|_, members| {
            members.remove(&client_id);
            !members.is_empty()
        });
    }

    pub fn subscribe_to_lobby(&self, client_id: ClientId) {
        self.lobby.insert(client_id);
    }

    /// Adds the client to the game's group and sends it `game` as the
    /// current state.
    pub fn subscribe_to_game(&self, client_id: ClientId, game: &Game) {
        self.games
            .entry(game.id.clone())
            .or_default()
            .insert(client_id);
        info!(
            %client_id,
            game_id = %game.id,
            subscribers = self.game_subscribers(&game.id),
            "client joined game"
        );
        self.send_to(
            client_id,
            ServerEvent::ReceiveGameUpdate { game: game.clone() },
        );
    }

    pub fn unsubscribe_from_game(&self, client_id: ClientId, game_id: &GameId) {
        self.games.remove_if(game_id, |_, members| {
            members.remove(&client_id);
            members.is_empty()
        });
    }

    pub fn publish_game_created(&self, game: &Game) {
        let members: Vec<ClientId> = self.lobby.iter().map(|id| *id).collect();
        self.fan_out(&members, ServerEvent::GameCreated { game: game.clone() });
    }

    pub fn publish_game_update(&self, game: &Game) {
        let members = self.members_of(&game.id);
        self.fan_out(
            &members,
            ServerEvent::ReceiveGameUpdate { game: game.clone() },
        );
    }

    /// Delivers the end event to the game's group, then drops the group.
    pub fn publish_game_ended(&self, game_id: &GameId) {
        let Some((_, members)) = self.games.remove(game_id) else {
            return;
        };
        let members: Vec<ClientId> = members.into_iter().collect();
        self.fan_out(
            &members,
            ServerEvent::GameEnded {
                game_id: game_id.clone(),
            },
        );
    }

    pub fn notify_client_error(&self, client_id: ClientId, error: ApiError) {
        self.send_to(client_id, ServerEvent::Error(error));
    }

    pub fn game_subscribers(&self, game_id: &GameId) -> usize {
        self.games.get(game_id).map_or(0, |members| members.len())
    }

    pub fn lobby_size(&self) -> usize {
        self.lobby.len()
    }

    fn members_of(&self, game_id: &GameId) -> Vec<ClientId> {
        self.games
            .get(game_id)
            .map(|members| members.iter().map(|id| *id).collect())
            .unwrap_or_default()
    }

    fn fan_out(&self, members: &[ClientId], event: ServerEvent) {
        for &client_id in members {
            self.send_to(client_id, event.clone());
        }
    }

    fn send_to(&self, client_id: ClientId, event: ServerEvent) {
        let delivered = self
            .clients
            .get(&client_id)
            .is_some_and(|tx| tx.send(event).is_ok());
        if !delivered {
            debug!(%client_id, "dropping event for disconnected client");
        }
    }
}

impl EventSink for Gateway {
    fn publish_game_created(&self, game: &Game) {
        Gateway::publish_game_created(self, game);
    }

    fn publish_game_update(&self, game: &Game) {
        Gateway::publish_game_update(self, game);
    }

    fn publish_game_ended(&self, game_id: &GameId) {
        Gateway::publish_game_ended(self, game_id);
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
