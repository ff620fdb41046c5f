use super::*;
use std::{sync::Mutex, time::Duration};

use shared::domain::{Mark, Player, PlayerSlot};

#[derive(Debug, Clone)]
enum Recorded {
    Created(GameId),
    Updated(Game),
    Ended(GameId),
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.events.lock().expect("events"))
    }

    fn updates(&self) -> Vec<Game> {
        self.take()
            .into_iter()
            .filter_map(|event| match event {
                Recorded::Updated(game) => Some(game),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn publish_game_created(&self, game: &Game) {
        self.events
            .lock()
            .expect("events")
            .push(Recorded::Created(game.id.clone()));
    }

    fn publish_game_update(&self, game: &Game) {
        self.events
            .lock()
            .expect("events")
            .push(Recorded::Updated(game.clone()));
    }

    fn publish_game_ended(&self, game_id: &GameId) {
        self.events
            .lock()
            .expect("events")
            .push(Recorded::Ended(game_id.clone()));
    }
}

fn setup_with(opponent: OpponentConfig) -> (GameContext, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let ctx = GameContext::new(GameRegistry::new(), sink.clone(), opponent);
    (ctx, sink)
}

fn setup() -> (GameContext, Arc<RecordingSink>) {
    setup_with(OpponentConfig::instant())
}

/// Creates a game and lays out `cells` directly, bypassing the orchestrator.
async fn seeded_game(ctx: &GameContext, cells: &[(usize, Mark)]) -> GameId {
    let game = ctx.registry.create("Alice").await.expect("create");
    let handle = ctx.registry.handle(&game.id).await.expect("handle");
    let mut locked = handle.lock().await;
    for &(index, mark) in cells {
        locked.board.cells[index] = Some(mark);
    }
    game.id
}

fn marks(game: &Game, mark: Mark) -> usize {
    game.board.cells.iter().filter(|c| **c == Some(mark)).count()
}

#[tokio::test]
async fn create_game_announces_to_lobby() {
    let (ctx, sink) = setup();
    let game = create_game(&ctx, "Alice").await.expect("create");

    assert_eq!(game.player1, Player::new("Alice", Mark::X));
    assert_eq!(game.player2, Player::new("Computer", Mark::O));
    assert_eq!(game.current, PlayerSlot::Player1);
    assert!(game.board.cells.iter().all(Option::is_none));

    let events = sink.take();
    assert!(matches!(events.as_slice(), [Recorded::Created(id)] if *id == game.id));
}

#[tokio::test]
async fn create_game_rejects_empty_name_without_events() {
    let (ctx, sink) = setup();
    let err = create_game(&ctx, "").await.expect_err("should fail");
    assert_eq!(err, GameError::MissingPlayerName);
    assert!(sink.take().is_empty());
    assert!(list_games(&ctx).await.is_empty());
}

#[tokio::test]
async fn get_game_reports_missing_ids() {
    let (ctx, _sink) = setup();
    let err = get_game(&ctx, &GameId::from("ghost"))
        .await
        .expect_err("should fail");
    assert_eq!(err, GameError::NotFound(GameId::from("ghost")));
}

#[tokio::test]
async fn move_on_unknown_game_is_not_found_and_silent() {
    let (ctx, sink) = setup();
    let err = make_move(&ctx, &GameId::from("ghost"), 0)
        .await
        .expect_err("should fail");
    assert_eq!(err, GameError::NotFound(GameId::from("ghost")));
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn human_move_is_broadcast_then_computer_replies() {
    let (ctx, sink) = setup();
    let game = create_game(&ctx, "Alice").await.expect("create");
    sink.take();

    let final_state = make_move(&ctx, &game.id, 4).await.expect("move");

    let updates = sink.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].board.get(4), Some(Mark::X));
    assert_eq!(updates[0].current, PlayerSlot::Player2);
    assert_eq!(marks(&updates[0], Mark::O), 0);

    assert_eq!(marks(&updates[1], Mark::X), 1);
    assert_eq!(marks(&updates[1], Mark::O), 1);
    assert_eq!(updates[1].current, PlayerSlot::Player1);
    assert_eq!(updates[1], final_state);
}

#[tokio::test]
async fn occupied_cell_is_rejected_without_mutation() {
    let (ctx, sink) = setup();
    let id = seeded_game(&ctx, &[(0, Mark::O)]).await;
    let before = get_game(&ctx, &id).await.expect("game");

    let err = make_move(&ctx, &id, 0).await.expect_err("should fail");
    assert_eq!(err, GameError::CellOccupied(0));
    assert_eq!(get_game(&ctx, &id).await.expect("game"), before);
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn out_of_range_index_fails_closed() {
    let (ctx, sink) = setup();
    let game = create_game(&ctx, "Alice").await.expect("create");
    sink.take();

    let err = make_move(&ctx, &game.id, 9).await.expect_err("should fail");
    assert_eq!(err, GameError::OutOfRange(9));
    let err = make_move(&ctx, &game.id, usize::MAX)
        .await
        .expect_err("should fail");
    assert_eq!(err, GameError::OutOfRange(usize::MAX));
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn finished_game_never_changes() {
    let (ctx, sink) = setup();
    let id = seeded_game(&ctx, &[]).await;
    {
        let handle = ctx.registry.handle(&id).await.expect("handle");
        handle.lock().await.winner = Some(Player::tie());
    }
    let before = get_game(&ctx, &id).await.expect("game");

    let err = make_move(&ctx, &id, 4).await.expect_err("should fail");
    assert_eq!(err, GameError::GameFinished(id.clone()));
    assert_eq!(get_game(&ctx, &id).await.expect("game"), before);
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn move_during_computer_turn_is_rejected() {
    let (ctx, _sink) = setup();
    let id = seeded_game(&ctx, &[]).await;
    {
        let handle = ctx.registry.handle(&id).await.expect("handle");
        handle.lock().await.current = PlayerSlot::Player2;
    }
    let err = make_move(&ctx, &id, 4).await.expect_err("should fail");
    assert_eq!(err, GameError::NotYourTurn);
}

#[tokio::test]
async fn completing_top_row_wins_without_computer_reply() {
    let (ctx, sink) = setup();
    let id = seeded_game(
        &ctx,
        &[(0, Mark::X), (1, Mark::X), (3, Mark::O), (4, Mark::O)],
    )
    .await;

    let game = make_move(&ctx, &id, 2).await.expect("move");
    assert!(shared::rules::check_winner(&game.board.cells, Mark::X));
    assert_eq!(game.winner, Some(game.player1.clone()));
    assert_eq!(sink.updates().len(), 1);
}

#[tokio::test]
async fn filling_the_board_without_a_line_is_a_tie() {
    let (ctx, sink) = setup();
    // X O X / X O O / O X .
    let id = seeded_game(
        &ctx,
        &[
            (0, Mark::X),
            (1, Mark::O),
            (2, Mark::X),
            (3, Mark::X),
            (4, Mark::O),
            (5, Mark::O),
            (6, Mark::O),
            (7, Mark::X),
        ],
    )
    .await;

    let game = make_move(&ctx, &id, 8).await.expect("move");
    let winner = game.winner.expect("winner");
    assert!(winner.is_tie());
    assert_eq!(winner.mark, Mark::Tie);
    assert_eq!(winner.name, "Tie");
    assert!(game.board.is_full());
    assert_eq!(sink.updates().len(), 1);
}

#[tokio::test]
async fn computer_blocks_imminent_win() {
    let (ctx, _sink) = setup();
    let id = seeded_game(&ctx, &[(0, Mark::X), (1, Mark::X), (4, Mark::O)]).await;
    // Human plays a corner that threatens nothing new; the top row still needs blocking.
    let game = make_move(&ctx, &id, 8).await.expect("move");
    assert_eq!(game.board.get(2), Some(Mark::O));
    assert!(game.winner.is_none());
    assert_eq!(game.current, PlayerSlot::Player1);
}

#[tokio::test]
async fn computer_takes_the_win_when_available() {
    let (ctx, _sink) = setup();
    let id = seeded_game(
        &ctx,
        &[(0, Mark::X), (1, Mark::X), (3, Mark::O), (4, Mark::O)],
    )
    .await;
    let game = make_move(&ctx, &id, 8).await.expect("move");
    assert_eq!(game.board.get(5), Some(Mark::O));
    assert_eq!(game.winner, Some(game.player2.clone()));
    assert_eq!(game.current, PlayerSlot::Player2);
}

#[tokio::test]
async fn join_delivers_snapshot_to_callback() {
    let (ctx, _sink) = setup();
    let id = seeded_game(&ctx, &[(4, Mark::X)]).await;

    let mut seen = None;
    let joined = join_game(&ctx, &id, |game| seen = Some(game.clone()))
        .await
        .expect("join");
    assert_eq!(seen.as_ref(), Some(&joined));
    assert_eq!(joined.board.get(4), Some(Mark::X));

    let mut called = false;
    let err = join_game(&ctx, &GameId::from("ghost"), |_| called = true)
        .await
        .expect_err("should fail");
    assert_eq!(err, GameError::NotFound(GameId::from("ghost")));
    assert!(!called);
}

#[tokio::test]
async fn end_game_removes_and_notifies_once() {
    let (ctx, sink) = setup();
    let game = create_game(&ctx, "Alice").await.expect("create");
    sink.take();

    end_game(&ctx, &game.id).await.expect("end");
    assert!(matches!(sink.take().as_slice(), [Recorded::Ended(id)] if *id == game.id));
    assert!(get_game(&ctx, &game.id).await.is_err());

    let err = end_game(&ctx, &game.id).await.expect_err("should fail");
    assert_eq!(err, GameError::NotFound(game.id.clone()));
    assert!(sink.take().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_moves_on_same_cell_only_one_lands() {
    let (ctx, _sink) = setup();
    let game = create_game(&ctx, "Alice").await.expect("create");

    let first = tokio::spawn({
        let ctx = ctx.clone();
        let id = game.id.clone();
        async move { make_move(&ctx, &id, 0).await }
    });
    let second = tokio::spawn({
        let ctx = ctx.clone();
        let id = game.id.clone();
        async move { make_move(&ctx, &id, 0).await }
    });

    let results = [first.await.expect("join"), second.await.expect("join")];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(GameError::CellOccupied(0)))));

    let game = get_game(&ctx, &game.id).await.expect("game");
    assert_eq!(marks(&game, Mark::X), 1);
    assert_eq!(marks(&game, Mark::O), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn thinking_delay_does_not_stall_other_requests() {
    let (ctx, _sink) = setup_with(OpponentConfig {
        min_delay_ms: 400,
        max_delay_ms: 400,
    });
    let slow = create_game(&ctx, "Alice").await.expect("create");

    let pending = tokio::spawn({
        let ctx = ctx.clone();
        let id = slow.id.clone();
        async move { make_move(&ctx, &id, 4).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let quick = Duration::from_millis(150);
    let mid_turn = tokio::time::timeout(quick, get_game(&ctx, &slow.id))
        .await
        .expect("get while thinking")
        .expect("game");
    assert_eq!(mid_turn.board.get(4), Some(Mark::X));
    assert_eq!(mid_turn.current, PlayerSlot::Player2);

    let other = tokio::time::timeout(quick, create_game(&ctx, "Bob"))
        .await
        .expect("create while thinking")
        .expect("create");
    let listed = tokio::time::timeout(quick, list_games(&ctx))
        .await
        .expect("list while thinking");
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|g| g.id == other.id));

    let finished = pending.await.expect("join").expect("move");
    assert_eq!(marks(&finished, Mark::O), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ending_game_while_computer_thinks_skips_the_reply() {
    let (ctx, sink) = setup_with(OpponentConfig {
        min_delay_ms: 200,
        max_delay_ms: 200,
    });
    let game = create_game(&ctx, "Alice").await.expect("create");
    sink.take();

    let pending = tokio::spawn({
        let ctx = ctx.clone();
        let id = game.id.clone();
        async move { make_move(&ctx, &id, 4).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    end_game(&ctx, &game.id).await.expect("end");

    let last = pending.await.expect("join").expect("move");
    assert_eq!(marks(&last, Mark::O), 0);

    let events = sink.take();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Recorded::Updated(_)));
    assert!(matches!(events[1], Recorded::Ended(_)));
}

/// Parks `end_game` and then `other` behind a held game lock, then releases
/// it so both run in queue order.
async fn end_then<F, T>(ctx: &GameContext, id: &GameId, other: F) -> T
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handle = ctx.registry.handle(id).await.expect("handle");
    let guard = handle.lock().await;

    let ending = tokio::spawn({
        let ctx = ctx.clone();
        let id = id.clone();
        async move { end_game(&ctx, &id).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    let queued = tokio::spawn(other);
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(guard);

    ending.await.expect("join").expect("end");
    queued.await.expect("join")
}

#[tokio::test]
async fn move_queued_behind_end_game_is_not_found() {
    let (ctx, sink) = setup();
    let game = create_game(&ctx, "Alice").await.expect("create");
    sink.take();

    let result = end_then(&ctx, &game.id, {
        let ctx = ctx.clone();
        let id = game.id.clone();
        async move { make_move(&ctx, &id, 4).await }
    })
    .await;

    assert_eq!(result, Err(GameError::NotFound(game.id.clone())));
    let events = sink.take();
    assert!(matches!(events.as_slice(), [Recorded::Ended(id)] if *id == game.id));
}

#[tokio::test]
async fn join_queued_behind_end_game_skips_callback() {
    let (ctx, sink) = setup();
    let game = create_game(&ctx, "Alice").await.expect("create");
    sink.take();

    let called = Arc::new(Mutex::new(false));
    let result = end_then(&ctx, &game.id, {
        let ctx = ctx.clone();
        let id = game.id.clone();
        let called = called.clone();
        async move {
            join_game(&ctx, &id, |_| *called.lock().expect("flag") = true)
                .await
                .map(|_| ())
        }
    })
    .await;

    assert_eq!(result, Err(GameError::NotFound(game.id.clone())));
    assert!(!*called.lock().expect("flag"));
    assert!(matches!(sink.take().as_slice(), [Recorded::Ended(_)]));
}
