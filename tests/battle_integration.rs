//! Battle engine integration tests
//!
//! Drives the public engine API the way a front end would, then checks the
//! game-wide invariants with proptest over random rosters and intent streams.

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use dbd_tactics::battle::*;
use dbd_tactics::core::{CellId, EngineConfig, IllegalAction, RetreatPolicy, Side, TacticsError, UnitId};
use dbd_tactics::scenario::ScenarioDocument;

fn cell(q: i32, r: i32) -> CellId {
    BoardGraph::standard()
        .cell_at(HexCoord::new(q, r))
        .expect("on board")
}

fn id(s: &str) -> UnitId {
    UnitId::from(s)
}

fn regular(name: &str, side: Side, ty: UnitType, at: CellId) -> Unit {
    Unit::new(name, side, ty, Quality::Regular, at)
}

fn scripted(doc: &ScenarioDocument, rolls: Vec<u8>) -> GameEngine {
    GameEngine::new(doc, EngineConfig::default().with_seed(7))
        .expect("valid scenario")
        .with_dice(ScriptedDice::new(rolls))
}

fn duel() -> ScenarioDocument {
    ScenarioDocument::new(STANDARD_BOARD_ID, 6, 3)
        .with_unit(regular("b1", Side::Blue, UnitType::Infantry, cell(0, 0)))
        .with_unit(regular("r1", Side::Red, UnitType::Infantry, cell(1, 0)))
}

#[test]
fn test_standard_board_shape() {
    let board = BoardGraph::standard();
    assert_eq!(board.cell_count(), STANDARD_CELL_COUNT);
    assert!(board.is_connected());
    assert_eq!(board.degree_range(), (2, 6));
    assert_eq!(board.neighbors(cell(0, 0)).len(), 6);
}

#[test]
fn test_infantry_hit_then_retreat() {
    let mut game = scripted(&duel(), vec![5, 4]);
    let outcome = game.resolve_attack(&id("b1"), &id("r1")).unwrap();

    assert_eq!(outcome.pool.total, 2);
    assert_eq!(outcome.hits, 1);
    assert_eq!(outcome.retreats, 1);
    assert_eq!(outcome.cancelled, 0);
    assert_eq!(outcome.retreat_moves, 1);
    assert_eq!(outcome.defender_hp, 3);

    let defender = game.unit(&id("r1")).unwrap();
    let origin = HexCoord::new(0, 0);
    let now = game.board().coord(defender.cell).unwrap();
    assert_eq!(origin.distance(&now), 2);
}

#[test]
fn test_infantry_hit_boxed_in() {
    // Every cell that leads away from the attacker is water
    let mut doc = duel();
    for coord in HexCoord::new(1, 0).neighbors() {
        if HexCoord::new(0, 0).distance(&coord) == 2 {
            doc = doc.with_terrain(cell(coord.q, coord.r), TerrainTag::Water);
        }
    }
    let mut game = scripted(&doc, vec![5, 4]);
    let outcome = game.resolve_attack(&id("b1"), &id("r1")).unwrap();

    assert_eq!(outcome.retreat_moves, 0);
    assert_eq!(outcome.blocked_steps, 1);
    assert_eq!(outcome.defender_hp, 2);
    assert_eq!(game.unit(&id("r1")).unwrap().cell, cell(1, 0));
}

#[test]
fn test_capturing_the_last_standard_ends_the_game() {
    let doc = ScenarioDocument::new(STANDARD_BOARD_ID, 6, 3)
        .with_unit(regular("b1", Side::Blue, UnitType::Cavalry, cell(0, 0)))
        .with_unit(regular("b2", Side::Blue, UnitType::Infantry, cell(-4, 0)))
        .with_unit(regular("r1", Side::Red, UnitType::Archer, cell(1, 0)).with_hp(1))
        .with_unit(regular("r2", Side::Red, UnitType::Infantry, cell(4, 2)))
        .with_standards(Side::Blue, 5);
    let mut game = scripted(&doc, vec![6, 1, 1]);

    let snapshot = game.attack(&id("b1"), &id("r1")).unwrap();
    assert_eq!(snapshot.winner, Some(Side::Blue));
    assert_eq!(snapshot.standards[&Side::Blue], 6);
    assert_eq!(game.score(Side::Blue), 6);

    let err = game.move_unit(&id("b2"), cell(-4, 1)).unwrap_err();
    assert!(matches!(err, TacticsError::GameOver { winner: Side::Blue }));
    assert!(matches!(game.end_turn(), Err(TacticsError::GameOver { .. })));

    let kinds: Vec<&BattleEventKind> = game.events().iter().map(|e| &e.kind).collect();
    assert!(kinds
        .iter()
        .any(|k| matches!(k, BattleEventKind::Victory { winner: Side::Blue, standards: 6 })));
}

#[test]
fn test_reset_clears_game_over() {
    let mut doc = duel().with_standards(Side::Blue, 5);
    doc.units[1].hp = 1;
    let mut game = scripted(&doc, vec![6, 6]);
    game.attack(&id("b1"), &id("r1")).unwrap();
    assert_eq!(game.winner(), Some(Side::Blue));

    let snapshot = game.reset(&duel()).unwrap();
    assert_eq!(snapshot.winner, None);
    assert_eq!(snapshot.units.len(), 2);
    assert_eq!(game.events().len(), 1);
    assert!(game.pass(&id("b1")).is_ok());
}

#[test]
fn test_last_turn_number_cannot_end() {
    let mut doc = ScenarioDocument::new(STANDARD_BOARD_ID, 6, 3)
        .with_unit(regular("b1", Side::Blue, UnitType::Infantry, cell(-3, 0)))
        .with_unit(regular("r1", Side::Red, UnitType::Infantry, cell(3, 0)));
    doc.turn.turn_number = u32::MAX;
    let mut game = scripted(&doc, vec![]);
    game.pass(&id("b1")).unwrap();
    let before = game.snapshot();

    assert!(matches!(
        game.end_turn(),
        Err(TacticsError::IllegalAction(IllegalAction::TurnLimitReached(u32::MAX)))
    ));
    assert_eq!(game.snapshot(), before);
    assert_eq!(game.turn().side, Side::Blue);
}

#[test]
fn test_turn_cycle_through_intents() {
    let doc = ScenarioDocument::new(STANDARD_BOARD_ID, 6, 3)
        .with_unit(regular("b1", Side::Blue, UnitType::Infantry, cell(-3, 0)))
        .with_unit(regular("r1", Side::Red, UnitType::Infantry, cell(3, 0)));
    let mut game = scripted(&doc, vec![]);

    let script = Intent::parse_script(
        r#"[
            {"action": "pass", "unit": "b1"},
            {"action": "endTurn"},
            {"action": "pass", "unit": "r1"},
            {"action": "endTurn"}
        ]"#,
    )
    .unwrap();
    for intent in &script {
        game.apply(intent).unwrap();
    }

    let snapshot = game.snapshot();
    assert_eq!(snapshot.turn.side, Side::Blue);
    assert_eq!(snapshot.turn.turn_number, 3);
    assert_eq!(snapshot.turn.activations_left, 3);
    assert!(snapshot.units.iter().all(|u| !u.acted));
}

#[test]
fn test_wrong_side_rejected() {
    let mut game = scripted(&duel(), vec![]);
    let err = game.pass(&id("r1")).unwrap_err();
    assert!(matches!(
        err,
        TacticsError::IllegalAction(IllegalAction::WrongSide {
            active: Side::Blue,
            attempted: Side::Red
        })
    ));
}

#[test]
fn test_unknown_ids_are_not_found() {
    let mut game = scripted(&duel(), vec![]);
    assert!(matches!(
        game.pass(&id("ghost")),
        Err(TacticsError::NotFound(_))
    ));
    assert!(matches!(
        game.move_unit(&id("b1"), CellId(999)),
        Err(TacticsError::NotFound(_))
    ));
}

#[test]
fn test_events_since_returns_tail() {
    let doc = ScenarioDocument::new(STANDARD_BOARD_ID, 6, 3)
        .with_unit(regular("b1", Side::Blue, UnitType::Infantry, cell(-3, 0)))
        .with_unit(regular("b2", Side::Blue, UnitType::Infantry, cell(-3, 2)))
        .with_unit(regular("r1", Side::Red, UnitType::Infantry, cell(3, 0)));
    let mut game = scripted(&doc, vec![]);
    let mark = game.snapshot().next_event;
    game.pass(&id("b1")).unwrap();
    game.pass(&id("b2")).unwrap();

    let tail = game.events_since(mark);
    assert_eq!(tail.len(), 2);
    assert!(matches!(tail[0].kind, BattleEventKind::UnitPassed { .. }));
    assert_eq!(tail[1].seq, mark + 1);
}

#[test]
fn test_snapshot_serializes_camel_case() {
    let game = scripted(&duel(), vec![]);
    let json = serde_json::to_value(game.snapshot()).unwrap();
    assert_eq!(json["turn"]["activationsLeft"], 3);
    assert_eq!(json["standardsToWin"], 6);
    assert_eq!(json["units"][0]["maxHp"], 4);
    assert_eq!(json["units"][0]["cellId"], u64::from(cell(0, 0).0));
}

#[test]
fn test_interactive_retreat_resume() {
    let config = EngineConfig::default()
        .with_seed(1)
        .with_retreat_policy(RetreatPolicy::Interactive);
    let mut game = GameEngine::new(&duel(), config)
        .unwrap()
        .with_dice(ScriptedDice::new(vec![4, 4]));

    game.attack(&id("b1"), &id("r1")).unwrap();
    let pending = game.pending_retreat().expect("waiting on a choice");
    assert_eq!(pending.unit, id("r1"));
    assert_eq!(pending.remaining, 2);
    assert!(matches!(
        game.end_turn(),
        Err(TacticsError::IllegalAction(IllegalAction::RetreatInProgress))
    ));
    assert!(game.export().is_err());

    let bogus = cell(-1, 0);
    assert!(matches!(
        game.choose_retreat(bogus),
        Err(TacticsError::IllegalAction(IllegalAction::NotARetreatOption(_)))
    ));

    while let Some(pending) = game.pending_retreat() {
        game.choose_retreat(pending.options[0]).unwrap();
    }
    assert_eq!(game.phase(), EnginePhase::Normal);
    let at = game.board().coord(game.unit(&id("r1")).unwrap().cell).unwrap();
    assert_eq!(HexCoord::new(0, 0).distance(&at), 3);
    assert!(game
        .events()
        .iter()
        .any(|e| matches!(e.kind, BattleEventKind::AttackResolved(_))));
}

#[test]
fn test_export_resumes_mid_turn() {
    let doc = ScenarioDocument::new(STANDARD_BOARD_ID, 6, 3)
        .with_unit(regular("b1", Side::Blue, UnitType::Infantry, cell(-3, 0)))
        .with_unit(regular("b2", Side::Blue, UnitType::Infantry, cell(-3, 2)))
        .with_unit(regular("r1", Side::Red, UnitType::Infantry, cell(3, 0)));
    let mut game = scripted(&doc, vec![]);
    game.move_unit(&id("b1"), cell(-2, 0)).unwrap();

    let saved = game.export().unwrap();
    assert_eq!(saved.turn.activations_left, 2);
    assert_eq!(saved.acted, vec![id("b1")]);

    let mut resumed = scripted(&saved, vec![]);
    assert!(matches!(
        resumed.pass(&id("b1")),
        Err(TacticsError::IllegalAction(IllegalAction::AlreadyActed(_)))
    ));
    resumed.pass(&id("b2")).unwrap();
    assert_eq!(resumed.turn().activations_left(), 1);
}

// ===== PROPERTIES =====

const QUALITIES: [Quality; 3] = [Quality::Green, Quality::Regular, Quality::Veteran];

/// Cells within three hexes of the centre, where units meet quickly
fn cluster() -> Vec<CellId> {
    let board = BoardGraph::standard();
    let centre = HexCoord::new(0, 0);
    board
        .cell_ids()
        .filter(|c| board.coord(*c).map_or(false, |h| h.distance(&centre) <= 3))
        .collect()
}

#[derive(Debug, Clone)]
struct Recruit {
    slot: usize,
    red: bool,
    unit_type: usize,
    quality: usize,
}

fn arb_roster() -> impl Strategy<Value = Vec<Recruit>> {
    prop::collection::vec(
        (0usize..37, any::<bool>(), 0usize..5, 0usize..3).prop_map(|(slot, red, unit_type, quality)| {
            Recruit {
                slot,
                red,
                unit_type,
                quality,
            }
        }),
        2..12,
    )
}

fn build_scenario(roster: &[Recruit]) -> ScenarioDocument {
    let cells = cluster();
    let mut used = BTreeSet::new();
    let mut doc = ScenarioDocument::new(STANDARD_BOARD_ID, 6, 3);
    for (i, recruit) in roster.iter().enumerate() {
        let at = cells[recruit.slot % cells.len()];
        if !used.insert(at) {
            continue;
        }
        let side = if recruit.red { Side::Red } else { Side::Blue };
        doc = doc.with_unit(Unit::new(
            format!("u{i}"),
            side,
            UnitType::ALL[recruit.unit_type],
            QUALITIES[recruit.quality],
            at,
        ));
    }
    doc
}

/// Turn an abstract op into an intent against the current state
fn pick_intent(game: &GameEngine, op: (u8, usize, u16)) -> Intent {
    let (kind, pick, target) = op;
    if let Some(pending) = game.pending_retreat() {
        return Intent::ChooseRetreat {
            cell: pending.options[pick % pending.options.len()],
        };
    }
    let ids: Vec<UnitId> = game.units().map(|u| u.id.clone()).collect();
    if ids.is_empty() {
        return Intent::EndTurn;
    }
    let unit = ids[pick % ids.len()].clone();
    match kind % 5 {
        0 => Intent::Move {
            unit,
            to: CellId(target % STANDARD_CELL_COUNT as u16),
        },
        1 => {
            let targets = game.attack_targets(&unit).unwrap_or_default();
            let defender = targets
                .first()
                .cloned()
                .unwrap_or_else(|| ids[usize::from(target) % ids.len()].clone());
            Intent::Attack {
                attacker: unit,
                defender,
            }
        }
        2 => Intent::Pass { unit },
        3 => Intent::EndTurn,
        _ => {
            let moves = game.legal_moves(&unit).unwrap_or_default();
            match moves.get(usize::from(target) % moves.len().max(1)) {
                Some(&to) => Intent::Move { unit, to },
                None => Intent::Pass { unit },
            }
        }
    }
}

fn hp_by_unit(game: &GameEngine) -> BTreeMap<UnitId, u8> {
    game.units().map(|u| (u.id.clone(), u.hp)).collect()
}

fn policy(index: u8) -> RetreatPolicy {
    match index % 3 {
        0 => RetreatPolicy::LowestCellId,
        1 => RetreatPolicy::Random,
        _ => RetreatPolicy::Interactive,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Units never share a cell, activations stay within the limit and
    /// never go backwards within a turn, and rejected intents change nothing.
    #[test]
    fn prop_engine_invariants_hold(
        roster in arb_roster(),
        ops in prop::collection::vec((any::<u8>(), any::<usize>(), any::<u16>()), 1..60),
        seed in any::<u64>(),
        policy_index in 0u8..3,
    ) {
        let doc = build_scenario(&roster);
        let config = EngineConfig::default()
            .with_seed(seed)
            .with_retreat_policy(policy(policy_index));
        let mut game = GameEngine::new(&doc, config).unwrap();

        for op in ops {
            let before = game.snapshot();
            let intent = pick_intent(&game, op);
            match game.apply(&intent) {
                Ok(after) => {
                    let cells: BTreeSet<CellId> = after.units.iter().map(|u| u.unit.cell).collect();
                    prop_assert_eq!(cells.len(), after.units.len());

                    let used = after.turn.activation_limit - after.turn.activations_left;
                    prop_assert!(used <= after.turn.activation_limit);
                    if after.turn.turn_number == before.turn.turn_number {
                        let used_before = before.turn.activation_limit - before.turn.activations_left;
                        prop_assert!(used >= used_before);
                    }
                    for view in &after.units {
                        prop_assert!(view.unit.hp >= 1 && view.unit.hp <= view.max_hp);
                    }
                }
                Err(TacticsError::GameOver { .. }) => break,
                Err(_) => {
                    prop_assert_eq!(game.snapshot(), before);
                }
            }
        }
    }

    /// HP lost equals hits plus blocked steps, only the defender is hurt,
    /// and each retreat step moves strictly away from the attacker.
    #[test]
    fn prop_attack_conserves_hp_and_retreats_outward(
        roster in arb_roster(),
        seed in any::<u64>(),
    ) {
        let doc = build_scenario(&roster);
        let mut game = GameEngine::new(&doc, EngineConfig::default().with_seed(seed)).unwrap();
        let blue_units: Vec<UnitId> = game
            .units()
            .filter(|u| u.side == Side::Blue)
            .map(|u| u.id.clone())
            .collect();

        for attacker in blue_units.into_iter().take(3) {
            let Ok(targets) = game.attack_targets(&attacker) else { continue };
            let Some(defender) = targets.first().cloned() else { continue };
            let Some(attacker_cell) = game.unit(&attacker).map(|u| u.cell) else { continue };

            let before = hp_by_unit(&game);
            let mark = game.snapshot().next_event;
            let outcome = match game.resolve_attack(&attacker, &defender) {
                Ok(outcome) => outcome,
                Err(TacticsError::GameOver { .. }) => break,
                Err(err) => return Err(TestCaseError::fail(format!("{err}"))),
            };

            let lost = u8::try_from(outcome.hits + outcome.blocked_steps).unwrap_or(u8::MAX);
            let expected = before[&defender].saturating_sub(lost);
            prop_assert_eq!(outcome.defender_hp, expected);
            prop_assert_eq!(outcome.destroyed, expected == 0);
            prop_assert_eq!(game.unit(&defender).map_or(0, |u| u.hp), expected);

            let after = hp_by_unit(&game);
            for (unit, hp) in &before {
                if *unit != defender {
                    prop_assert_eq!(after.get(unit), Some(hp));
                }
            }

            let board = game.board();
            let origin = board.coord(attacker_cell).unwrap();
            for event in game.events_since(mark) {
                if let BattleEventKind::RetreatStep { from, to, .. } = event.kind {
                    let d_from = origin.distance(&board.coord(from).unwrap());
                    let d_to = origin.distance(&board.coord(to).unwrap());
                    prop_assert!(d_to > d_from);
                }
            }
        }
    }

    /// Clearing a blocker never shrinks the reachable set
    #[test]
    fn prop_reachability_is_monotone(
        origin in 0u16..157,
        blockers in prop::collection::btree_set(0u16..157, 1..40),
        removed in any::<prop::sample::Index>(),
        budget in 1u32..4,
    ) {
        let board = BoardGraph::standard();
        let blockers: Vec<u16> = blockers.into_iter().filter(|b| *b != origin).collect();
        prop_assume!(!blockers.is_empty());

        let place = |skip: Option<u16>| {
            let mut units = UnitRegistry::new();
            for (i, &b) in blockers.iter().enumerate() {
                if Some(b) == skip {
                    continue;
                }
                let blocker = Unit::new(format!("x{i}"), Side::Red, UnitType::Infantry, Quality::Regular, CellId(b));
                units.insert(blocker).unwrap();
            }
            units
        };

        let gone = blockers[removed.index(blockers.len())];
        let crowded: BTreeSet<CellId> =
            reachable_within(&board, &place(None), CellId(origin), budget).into_iter().collect();
        let cleared: BTreeSet<CellId> =
            reachable_within(&board, &place(Some(gone)), CellId(origin), budget).into_iter().collect();

        prop_assert!(crowded.is_subset(&cleared));
    }
}
