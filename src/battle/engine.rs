//! Game engine: the single owner of board, units, turn and score
//!
//! Every mutation goes through an intent method. Intents are checked in
//! full before anything changes, so a rejected intent leaves the engine
//! exactly as it was.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::battle::board::BoardGraph;
use crate::battle::constants::BLOCKED_RETREAT_DAMAGE;
use crate::battle::dice::{DiceSource, SeededDice};
use crate::battle::engagement::{attack_targets, is_engaged, is_flanked, support_info};
use crate::battle::events::{BattleEvent, BattleEventKind, BattleEventLog};
use crate::battle::intent::Intent;
use crate::battle::pathfinding::{distance_field, legal_moves, retreat_candidates};
use crate::battle::resolution::{cancel_count, dice_pool, tally, AttackOutcome, RetreatContext};
use crate::battle::turn::{EnginePhase, TurnState};
use crate::battle::units::{PlacementConflict, Unit, UnitRegistry};
use crate::battle::victory::{standards_for, VictoryTracker};
use crate::core::config::{EngineConfig, RetreatPolicy};
use crate::core::error::{IllegalAction, NotFound, Result, TacticsError};
use crate::core::types::{CellId, Side, UnitId};
use crate::scenario::document::{ScenarioDocument, TurnBlock, SCHEMA_VERSION};
use crate::scenario::validation::{validate_with, ValidationError, ValidationRules};

/// A forced retreat waiting on the defending side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRetreat {
    pub unit: UnitId,
    pub side: Side,
    pub from: CellId,
    pub options: Vec<CellId>,
    pub remaining: u32,
}

/// A unit as shown in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitView {
    #[serde(flatten)]
    pub unit: Unit,
    pub max_hp: u8,
    pub acted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnView {
    pub side: Side,
    pub turn_number: u32,
    pub activations_left: u32,
    pub activation_limit: u32,
}

/// Read-only view of the whole game after an intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub board: String,
    pub phase: EnginePhase,
    pub turn: TurnView,
    pub units: Vec<UnitView>,
    pub standards: BTreeMap<Side, u32>,
    pub standards_to_win: u32,
    pub winner: Option<Side>,
    pub pending_retreat: Option<PendingRetreat>,
    /// Sequence number the next event will carry
    pub next_event: u64,
}

/// Unit count and total HP left on one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideTotals {
    pub units: usize,
    pub hp: u32,
}

/// A retreat paused mid-resolution, with the attack it belongs to
#[derive(Debug, Clone)]
struct RetreatInProgress {
    context: RetreatContext,
    outcome: AttackOutcome,
    options: Vec<CellId>,
}

/// How a retreat loop ended
enum RetreatStatus {
    Finished,
    AwaitingChoice,
}

#[derive(Debug)]
pub struct GameEngine {
    config: EngineConfig,
    board: BoardGraph,
    units: UnitRegistry,
    turn: TurnState,
    victory: VictoryTracker,
    phase: EnginePhase,
    retreat: Option<RetreatInProgress>,
    dice: Box<dyn DiceSource>,
    log: BattleEventLog,
}

impl GameEngine {
    /// Load a scenario on its built-in board
    pub fn new(scenario: &ScenarioDocument, config: EngineConfig) -> Result<Self> {
        let board = BoardGraph::builtin(&scenario.board)?;
        Self::with_board(scenario, board, config)
    }

    /// Load a scenario on an explicit board. Dice come from `config.seed`.
    pub fn with_board(
        scenario: &ScenarioDocument,
        board: BoardGraph,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate().map_err(TacticsError::Config)?;
        let dice: Box<dyn DiceSource> = match config.seed {
            Some(seed) => Box::new(SeededDice::new(seed)),
            None => Box::new(SeededDice::from_entropy()),
        };

        let mut engine = Self {
            turn: TurnState::new(Side::Blue, config.activation_limit),
            victory: VictoryTracker::new(scenario.standards_to_win),
            config,
            board,
            units: UnitRegistry::new(),
            phase: EnginePhase::Normal,
            retreat: None,
            dice,
            log: BattleEventLog::new(),
        };
        engine.reset(scenario)?;
        Ok(engine)
    }

    /// Replace the dice source
    pub fn with_dice(mut self, dice: impl DiceSource + 'static) -> Self {
        self.dice = Box::new(dice);
        self
    }

    pub fn set_dice(&mut self, dice: Box<dyn DiceSource>) {
        self.dice = dice;
    }

    // ===== INTENTS =====

    /// Load a fresh scenario, discarding all state and the event log
    ///
    /// The document is re-validated against this engine's board and
    /// activation limit. On failure the current game is left untouched.
    pub fn reset(&mut self, scenario: &ScenarioDocument) -> Result<GameSnapshot> {
        let rules = ValidationRules::for_board(&self.board, self.config.activation_limit);
        let errors = validate_with(&scenario.to_value()?, &rules);
        if !errors.is_empty() {
            return Err(TacticsError::InvalidScenario(errors));
        }

        let board = self.board.clone().with_terrain(scenario.terrain.clone())?;
        let mut units = UnitRegistry::new();
        for unit in &scenario.units {
            // Validation has already ruled both conflicts out
            if let Err(conflict) = units.insert(unit.clone()) {
                let error = match conflict {
                    PlacementConflict::DuplicateId(id) => ValidationError::DuplicateUnitId { id: id.0 },
                    PlacementConflict::CellOccupied { cell, occupant } => ValidationError::CellShared {
                        cell: u64::from(cell.0),
                        first: occupant.0,
                        second: unit.id.0.clone(),
                    },
                };
                return Err(TacticsError::InvalidScenario(vec![error]));
            }
        }

        let limit = self.config.activation_limit;
        let mut turn = TurnState::new(scenario.turn.side, limit);
        turn.turn_number = scenario.turn.turn_number;
        turn.activations_used = limit.saturating_sub(scenario.turn.activations_left);
        turn.acted = scenario.acted.clone();

        let mut victory = VictoryTracker::new(scenario.standards_to_win);
        for side in Side::ALL {
            victory.add_score(side, scenario.standards_of(side));
        }

        self.board = board;
        self.units = units;
        self.turn = turn;
        self.victory = victory;
        self.phase = EnginePhase::Normal;
        self.retreat = None;
        self.log = BattleEventLog::new();

        info!(
            board = %scenario.board,
            units = self.units.len(),
            side = %self.turn.side,
            "Scenario loaded"
        );
        self.record(BattleEventKind::ScenarioLoaded {
            board: scenario.board.clone(),
            units: self.units.len(),
        });
        Ok(self.snapshot())
    }

    pub fn apply(&mut self, intent: &Intent) -> Result<GameSnapshot> {
        match intent {
            Intent::Move { unit, to } => self.move_unit(unit, *to),
            Intent::Attack { attacker, defender } => self.attack(attacker, defender),
            Intent::EndTurn => self.end_turn(),
            Intent::Pass { unit } => self.pass(unit),
            Intent::ChooseRetreat { cell } => self.choose_retreat(*cell),
        }
    }

    /// Move a unit to a cell in its legal-move set
    pub fn move_unit(&mut self, unit_id: &UnitId, to: CellId) -> Result<GameSnapshot> {
        self.ensure_normal()?;
        let unit = self.find_unit(unit_id)?.clone();
        self.turn
            .check_can_activate(unit.side, &unit.id)
            .map_err(TacticsError::IllegalAction)?;
        if !self.board.contains(to) {
            return Err(TacticsError::NotFound(NotFound::Cell(to)));
        }
        if !legal_moves(&self.board, &self.units, &unit).contains(&to) {
            let reason = if is_engaged(&self.board, &self.units, &unit) {
                IllegalAction::Engaged(unit.id.clone())
            } else {
                IllegalAction::Unreachable {
                    unit: unit.id.clone(),
                    to,
                }
            };
            return Err(TacticsError::IllegalAction(reason));
        }

        self.units.relocate(&unit.id, to);
        self.turn.consume(unit.id.clone());
        debug!(unit = %unit.id, from = %unit.cell, %to, "Unit moved");
        self.record(BattleEventKind::UnitMoved {
            unit: unit.id,
            from: unit.cell,
            to,
        });
        Ok(self.snapshot())
    }

    pub fn attack(&mut self, attacker: &UnitId, defender: &UnitId) -> Result<GameSnapshot> {
        self.resolve_attack(attacker, defender)?;
        Ok(self.snapshot())
    }

    /// Resolve one melee attack
    ///
    /// Under the interactive retreat policy the returned outcome may still
    /// have `retreat_pending` steps; the final outcome is logged once the
    /// last step is chosen.
    pub fn resolve_attack(&mut self, attacker_id: &UnitId, defender_id: &UnitId) -> Result<AttackOutcome> {
        self.ensure_normal()?;
        let attacker = self.find_unit(attacker_id)?.clone();
        let defender = self.find_unit(defender_id)?.clone();

        if attacker.side == defender.side {
            return Err(TacticsError::IllegalAction(IllegalAction::FriendlyTarget {
                attacker: attacker.id,
                defender: defender.id,
            }));
        }
        if !self.board.are_adjacent(attacker.cell, defender.cell) {
            return Err(TacticsError::IllegalAction(IllegalAction::NotAdjacent {
                attacker: attacker.id,
                defender: defender.id,
            }));
        }
        self.turn
            .check_can_activate(attacker.side, &attacker.id)
            .map_err(TacticsError::IllegalAction)?;

        // Preconditions hold: the activation is spent whatever the dice say
        self.turn.consume(attacker.id.clone());

        let flanked = is_flanked(&self.board, &self.units, &defender);
        let cover = self.board.terrain_of(defender.cell).provides_cover();
        let pool = dice_pool(attacker.unit_type, flanked, cover);
        let rolls = self.dice.roll_pool(pool.total);
        let rolled = tally(&rolls);

        let support = support_info(&self.board, &self.units, &defender);
        let cancelled = cancel_count(defender.quality, support).min(rolled.retreats);
        let net_retreats = rolled.retreats - cancelled;

        debug!(
            attacker = %attacker.id,
            defender = %defender.id,
            dice = pool.total,
            ?rolls,
            hits = rolled.hits,
            retreats = rolled.retreats,
            cancelled,
            "Attack rolled"
        );

        let hits = u8::try_from(rolled.hits).unwrap_or(u8::MAX);
        let hp = self.units.damage(&defender.id, hits).unwrap_or(0);
        let mut outcome = AttackOutcome {
            attacker: attacker.id.clone(),
            defender: defender.id.clone(),
            pool,
            rolls,
            hits: rolled.hits,
            retreats: rolled.retreats,
            cancelled,
            net_retreats,
            retreat_moves: 0,
            blocked_steps: 0,
            defender_hp: hp,
            destroyed: false,
            points_awarded: 0,
            retreat_pending: 0,
        };

        if hp == 0 {
            outcome.points_awarded = self.destroy(&defender.id, attacker.side);
            outcome.destroyed = true;
        } else if net_retreats > 0 {
            let context = RetreatContext {
                attacker: attacker.id.clone(),
                defender: defender.id.clone(),
                attacker_cell: attacker.cell,
                field: distance_field(&self.board, attacker.cell),
                remaining: net_retreats,
            };
            if let RetreatStatus::AwaitingChoice = self.run_retreat(context, &mut outcome) {
                return Ok(outcome);
            }
        }

        self.finish_attack(&outcome);
        Ok(outcome)
    }

    /// Spend a unit's activation without acting
    pub fn pass(&mut self, unit_id: &UnitId) -> Result<GameSnapshot> {
        self.ensure_normal()?;
        let unit = self.find_unit(unit_id)?;
        let (side, id) = (unit.side, unit.id.clone());
        self.turn
            .check_can_activate(side, &id)
            .map_err(TacticsError::IllegalAction)?;

        self.turn.consume(id.clone());
        debug!(unit = %id, "Unit passed");
        self.record(BattleEventKind::UnitPassed { unit: id });
        Ok(self.snapshot())
    }

    pub fn end_turn(&mut self) -> Result<GameSnapshot> {
        self.ensure_normal()?;
        self.turn.advance().map_err(TacticsError::IllegalAction)?;
        info!(side = %self.turn.side, turn = self.turn.turn_number, "Turn ended");
        self.record(BattleEventKind::TurnEnded {
            next: self.turn.side,
            turn: self.turn.turn_number,
        });
        Ok(self.snapshot())
    }

    /// Pick the destination of the pending retreat step
    pub fn choose_retreat(&mut self, cell: CellId) -> Result<GameSnapshot> {
        if let Some(winner) = self.victory.winner() {
            return Err(TacticsError::GameOver { winner });
        }
        let Some(pending) = self.retreat.as_ref() else {
            return Err(TacticsError::IllegalAction(IllegalAction::NoRetreatPending));
        };
        if !self.board.contains(cell) {
            return Err(TacticsError::NotFound(NotFound::Cell(cell)));
        }
        if !pending.options.contains(&cell) {
            return Err(TacticsError::IllegalAction(IllegalAction::NotARetreatOption(cell)));
        }

        let Some(RetreatInProgress {
            mut context,
            mut outcome,
            ..
        }) = self.retreat.take()
        else {
            return Err(TacticsError::IllegalAction(IllegalAction::NoRetreatPending));
        };
        self.phase = EnginePhase::Normal;

        self.step_to(&mut context, &mut outcome, cell);
        if let RetreatStatus::Finished = self.run_retreat(context, &mut outcome) {
            self.finish_attack(&outcome);
        }
        Ok(self.snapshot())
    }

    // ===== QUERIES =====

    pub fn legal_moves(&self, unit_id: &UnitId) -> Result<Vec<CellId>> {
        let unit = self.find_unit(unit_id)?;
        Ok(legal_moves(&self.board, &self.units, unit))
    }

    /// Enemies adjacent to the unit, by cell id
    pub fn attack_targets(&self, unit_id: &UnitId) -> Result<Vec<UnitId>> {
        let unit = self.find_unit(unit_id)?;
        Ok(attack_targets(&self.board, &self.units, unit)
            .into_iter()
            .map(|u| u.id.clone())
            .collect())
    }

    pub fn pending_retreat(&self) -> Option<PendingRetreat> {
        let pending = self.retreat.as_ref()?;
        let unit = self.units.get(&pending.context.defender)?;
        Some(PendingRetreat {
            unit: unit.id.clone(),
            side: unit.side,
            from: unit.cell,
            options: pending.options.clone(),
            remaining: pending.context.remaining,
        })
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let units = self
            .units
            .iter()
            .map(|u| UnitView {
                unit: u.clone(),
                max_hp: u.max_hp(),
                acted: self.turn.has_acted(&u.id),
            })
            .collect();
        let standards = Side::ALL
            .into_iter()
            .map(|s| (s, self.victory.current_score(s)))
            .collect();

        GameSnapshot {
            board: self.board.id().to_string(),
            phase: self.phase,
            turn: TurnView {
                side: self.turn.side,
                turn_number: self.turn.turn_number,
                activations_left: self.turn.activations_left(),
                activation_limit: self.turn.activation_limit,
            },
            units,
            standards,
            standards_to_win: self.victory.standards_to_win,
            winner: self.victory.winner(),
            pending_retreat: self.pending_retreat(),
            next_event: self.log.next_seq(),
        }
    }

    /// Current state as a scenario document
    ///
    /// Not available mid-retreat: the document format has no way to express
    /// a half-finished attack.
    pub fn export(&self) -> Result<ScenarioDocument> {
        if self.phase == EnginePhase::RetreatInProgress {
            return Err(TacticsError::IllegalAction(IllegalAction::RetreatInProgress));
        }
        let standards = Side::ALL
            .into_iter()
            .map(|s| (s, self.victory.current_score(s)))
            .filter(|(_, score)| *score > 0)
            .collect();

        Ok(ScenarioDocument {
            schema: SCHEMA_VERSION.to_string(),
            board: self.board.id().to_string(),
            standards_to_win: self.victory.standards_to_win,
            terrain: self.board.terrain_map().clone(),
            units: self.units.iter().cloned().collect(),
            turn: TurnBlock {
                side: self.turn.side,
                turn_number: self.turn.turn_number,
                activations_left: self.turn.activations_left(),
            },
            standards,
            acted: self.turn.acted.clone(),
        })
    }

    pub fn events(&self) -> &[BattleEvent] {
        self.log.events()
    }

    pub fn events_since(&self, seq: u64) -> &[BattleEvent] {
        self.log.since(seq)
    }

    pub fn side_totals(&self, side: Side) -> SideTotals {
        self.units.on_side(side).fold(SideTotals::default(), |mut t, u| {
            t.units += 1;
            t.hp += u32::from(u.hp);
            t
        })
    }

    pub fn score(&self, side: Side) -> u32 {
        self.victory.current_score(side)
    }

    pub fn winner(&self) -> Option<Side> {
        self.victory.winner()
    }

    pub fn unit(&self, id: &UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.units.iter()
    }

    pub fn board(&self) -> &BoardGraph {
        &self.board
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ===== INTERNALS =====

    fn ensure_normal(&self) -> Result<()> {
        if let Some(winner) = self.victory.winner() {
            return Err(TacticsError::GameOver { winner });
        }
        if self.phase == EnginePhase::RetreatInProgress {
            return Err(TacticsError::IllegalAction(IllegalAction::RetreatInProgress));
        }
        Ok(())
    }

    fn find_unit(&self, id: &UnitId) -> Result<&Unit> {
        self.units
            .get(id)
            .ok_or_else(|| TacticsError::NotFound(NotFound::Unit(id.clone())))
    }

    fn record(&mut self, kind: BattleEventKind) {
        self.log.push(self.turn.turn_number, self.turn.side, kind);
    }

    /// Execute retreat steps until done, destroyed, or a choice is needed
    fn run_retreat(&mut self, mut context: RetreatContext, outcome: &mut AttackOutcome) -> RetreatStatus {
        while context.remaining > 0 {
            let Some(defender) = self.units.get(&context.defender) else {
                break;
            };
            let from = defender.cell;
            let candidates = retreat_candidates(&self.board, &self.units, &context.field, from);

            if candidates.is_empty() {
                if self.blocked_step(&mut context, outcome) {
                    break;
                }
                continue;
            }

            let choice = match (candidates.len(), self.config.retreat_policy) {
                (1, _) | (_, RetreatPolicy::LowestCellId) => candidates[0],
                (n, RetreatPolicy::Random) => candidates[self.dice.pick(n).min(n - 1)],
                (_, RetreatPolicy::Interactive) => {
                    let unit = context.defender.clone();
                    outcome.retreat_pending = context.remaining;
                    debug!(%unit, options = ?candidates, "Retreat awaiting choice");
                    self.record(BattleEventKind::RetreatChoiceNeeded {
                        unit,
                        options: candidates.clone(),
                    });
                    self.phase = EnginePhase::RetreatInProgress;
                    self.retreat = Some(RetreatInProgress {
                        context,
                        outcome: outcome.clone(),
                        options: candidates,
                    });
                    return RetreatStatus::AwaitingChoice;
                }
            };
            self.step_to(&mut context, outcome, choice);
        }
        outcome.retreat_pending = 0;
        RetreatStatus::Finished
    }

    fn step_to(&mut self, context: &mut RetreatContext, outcome: &mut AttackOutcome, to: CellId) {
        let Some(from) = self.units.get(&context.defender).map(|u| u.cell) else {
            context.remaining = 0;
            return;
        };
        debug_assert!(context.distance(to) > context.distance(from));
        self.units.relocate(&context.defender, to);
        context.remaining -= 1;
        outcome.retreat_moves += 1;
        debug!(unit = %context.defender, %from, %to, "Retreat step");
        self.record(BattleEventKind::RetreatStep {
            unit: context.defender.clone(),
            from,
            to,
        });
    }

    /// Nowhere to go: the step costs HP instead. Returns true if the
    /// defender was destroyed.
    fn blocked_step(&mut self, context: &mut RetreatContext, outcome: &mut AttackOutcome) -> bool {
        let hp = self
            .units
            .damage(&context.defender, BLOCKED_RETREAT_DAMAGE)
            .unwrap_or(0);
        context.remaining -= 1;
        outcome.blocked_steps += 1;
        outcome.defender_hp = hp;
        debug!(unit = %context.defender, hp, "Retreat blocked");
        self.record(BattleEventKind::RetreatBlocked {
            unit: context.defender.clone(),
            hp,
        });

        if hp == 0 {
            let by = self.turn.side;
            outcome.points_awarded = self.destroy(&context.defender, by);
            outcome.destroyed = true;
            context.remaining = 0;
            return true;
        }
        false
    }

    /// Remove a unit, score it for `by`, and check for a winner
    fn destroy(&mut self, id: &UnitId, by: Side) -> u32 {
        let Some(unit) = self.units.remove(id) else {
            return 0;
        };
        let points = standards_for(unit.is_general());
        self.victory.add_score(by, points);
        info!(unit = %unit.id, %by, points, "Unit destroyed");
        self.record(BattleEventKind::UnitDestroyed {
            unit: unit.id,
            by,
            points,
        });

        if let Some(winner) = self.victory.check_victory() {
            let standards = self.victory.current_score(winner);
            info!(%winner, standards, "Victory");
            self.record(BattleEventKind::Victory { winner, standards });
        }
        points
    }

    fn finish_attack(&mut self, outcome: &AttackOutcome) {
        let mut outcome = outcome.clone();
        if !outcome.destroyed {
            outcome.defender_hp = self.units.get(&outcome.defender).map_or(0, |u| u.hp);
        }
        self.record(BattleEventKind::AttackResolved(outcome));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::dice::ScriptedDice;
    use crate::battle::hex::HexCoord;
    use crate::battle::terrain::TerrainTag;
    use crate::battle::unit_type::{Quality, UnitType};

    fn cell(q: i32, r: i32) -> CellId {
        BoardGraph::standard()
            .cell_at(HexCoord::new(q, r))
            .expect("on board")
    }

    fn unit(id: &str, side: Side, ty: UnitType, q: i32, r: i32) -> Unit {
        Unit::new(id, side, ty, Quality::Regular, cell(q, r))
    }

    fn engine(doc: ScenarioDocument, rolls: Vec<u8>) -> GameEngine {
        GameEngine::new(&doc, EngineConfig::default().with_seed(1))
            .expect("valid scenario")
            .with_dice(ScriptedDice::new(rolls))
    }

    fn duel() -> ScenarioDocument {
        ScenarioDocument::new("DBD-157-v1", 6, 3)
            .with_unit(unit("b1", Side::Blue, UnitType::Infantry, 0, 0))
            .with_unit(unit("r1", Side::Red, UnitType::Infantry, 1, 0))
    }

    fn id(s: &str) -> UnitId {
        UnitId::from(s)
    }

    #[test]
    fn test_hit_and_retreat_example() {
        let mut game = engine(duel(), vec![5, 4]);
        let outcome = game.resolve_attack(&id("b1"), &id("r1")).unwrap();

        assert_eq!(outcome.hits, 1);
        assert_eq!(outcome.retreats, 1);
        assert_eq!(outcome.cancelled, 0);
        assert_eq!(outcome.retreat_moves, 1);
        let r1 = game.unit(&id("r1")).unwrap();
        assert_eq!(r1.hp, 3);
        let field = distance_field(game.board(), cell(0, 0));
        assert_eq!(field[r1.cell.index()], 2);
        assert_eq!(game.turn().activations_left(), 2);
    }

    #[test]
    fn test_boxed_in_retreat_costs_hp() {
        // Every cell farther from the attacker is water
        let doc = duel()
            .with_terrain(cell(2, 0), TerrainTag::Water)
            .with_terrain(cell(2, -1), TerrainTag::Water)
            .with_terrain(cell(1, 1), TerrainTag::Water);

        let mut game = engine(doc, vec![5, 4]);
        let outcome = game.resolve_attack(&id("b1"), &id("r1")).unwrap();
        assert_eq!(outcome.blocked_steps, 1);
        assert_eq!(outcome.retreat_moves, 0);
        assert_eq!(outcome.defender_hp, 2);
        let r1 = game.unit(&id("r1")).unwrap();
        assert_eq!(r1.hp, 2);
        assert_eq!(r1.cell, cell(1, 0));
    }

    #[test]
    fn test_support_cancels_retreat() {
        let doc = duel().with_unit(unit("r2", Side::Red, UnitType::Archer, 1, 1));
        let mut game = engine(doc, vec![4, 4]);
        let outcome = game.resolve_attack(&id("b1"), &id("r1")).unwrap();
        assert_eq!(outcome.retreats, 2);
        assert_eq!(outcome.cancelled, 1);
        assert_eq!(outcome.retreat_moves, 1);
    }

    #[test]
    fn test_destruction_scores_and_wins() {
        let doc = duel().with_standards(Side::Blue, 5);
        let mut doc = doc;
        doc.units[1].hp = 1;
        let mut game = engine(doc, vec![6, 1]);

        let outcome = game.resolve_attack(&id("b1"), &id("r1")).unwrap();
        assert!(outcome.destroyed);
        assert_eq!(outcome.points_awarded, 1);
        assert_eq!(game.score(Side::Blue), 6);
        assert_eq!(game.winner(), Some(Side::Blue));
        assert!(game.unit(&id("r1")).is_none());

        let err = game.move_unit(&id("b1"), cell(1, 0)).unwrap_err();
        assert!(matches!(err, TacticsError::GameOver { winner: Side::Blue }));
        assert!(matches!(game.end_turn(), Err(TacticsError::GameOver { .. })));
    }

    #[test]
    fn test_general_worth_two() {
        let mut doc = ScenarioDocument::new("DBD-157-v1", 6, 3)
            .with_unit(unit("b1", Side::Blue, UnitType::Cavalry, 0, 0))
            .with_unit(unit("rg", Side::Red, UnitType::General, 1, 0));
        doc.units[1].hp = 1;
        let mut game = engine(doc, vec![5, 1, 1]);
        game.attack(&id("b1"), &id("rg")).unwrap();
        assert_eq!(game.score(Side::Blue), 2);
    }

    #[test]
    fn test_move_gating() {
        let doc = ScenarioDocument::new("DBD-157-v1", 6, 3)
            .with_unit(unit("b1", Side::Blue, UnitType::Infantry, 0, 0))
            .with_unit(unit("r1", Side::Red, UnitType::Infantry, 4, 0));
        let mut game = engine(doc, vec![]);

        let err = game.move_unit(&id("r1"), cell(3, 0)).unwrap_err();
        assert!(matches!(
            err,
            TacticsError::IllegalAction(IllegalAction::WrongSide { .. })
        ));
        let err = game.move_unit(&id("b1"), cell(2, 0)).unwrap_err();
        assert!(matches!(
            err,
            TacticsError::IllegalAction(IllegalAction::Unreachable { .. })
        ));
        assert!(matches!(
            game.move_unit(&id("zz"), cell(1, 0)),
            Err(TacticsError::NotFound(NotFound::Unit(_)))
        ));
        assert!(matches!(
            game.move_unit(&id("b1"), CellId(999)),
            Err(TacticsError::NotFound(NotFound::Cell(CellId(999))))
        ));

        game.move_unit(&id("b1"), cell(1, 0)).unwrap();
        assert_eq!(game.unit(&id("b1")).unwrap().cell, cell(1, 0));
        let err = game.move_unit(&id("b1"), cell(2, 0)).unwrap_err();
        assert!(matches!(
            err,
            TacticsError::IllegalAction(IllegalAction::AlreadyActed(_))
        ));
        assert_eq!(game.turn().activations_left(), 2);
    }

    #[test]
    fn test_engaged_unit_cannot_move() {
        let mut game = engine(duel(), vec![]);
        let err = game.move_unit(&id("b1"), cell(-1, 0)).unwrap_err();
        assert!(matches!(
            err,
            TacticsError::IllegalAction(IllegalAction::Engaged(_))
        ));
        assert!(game.legal_moves(&id("b1")).unwrap().is_empty());
        assert_eq!(game.attack_targets(&id("b1")).unwrap(), vec![id("r1")]);
    }

    #[test]
    fn test_attack_preconditions_do_not_mutate() {
        let doc = duel().with_unit(unit("b2", Side::Blue, UnitType::Infantry, -1, 0));
        let mut game = engine(doc, vec![5, 5]);
        let before = game.snapshot();

        assert!(matches!(
            game.attack(&id("b1"), &id("b2")),
            Err(TacticsError::IllegalAction(IllegalAction::FriendlyTarget { .. }))
        ));
        assert!(matches!(
            game.attack(&id("b2"), &id("r1")),
            Err(TacticsError::IllegalAction(IllegalAction::NotAdjacent { .. }))
        ));
        assert!(matches!(
            game.attack(&id("r1"), &id("b1")),
            Err(TacticsError::IllegalAction(IllegalAction::WrongSide { .. }))
        ));
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_miss_still_consumes_activation() {
        let mut game = engine(duel(), vec![1, 2]);
        let outcome = game.resolve_attack(&id("b1"), &id("r1")).unwrap();
        assert_eq!(outcome.hits, 0);
        assert_eq!(game.turn().activations_left(), 2);
        assert!(game.turn().has_acted(&id("b1")));
    }

    #[test]
    fn test_activation_limit_enforced() {
        let mut doc = ScenarioDocument::new("DBD-157-v1", 6, 3);
        for (i, q) in [-6, -4, -2, 0].iter().enumerate() {
            doc = doc.with_unit(unit(&format!("b{i}"), Side::Blue, UnitType::Infantry, *q, 3));
        }
        let mut game = engine(doc, vec![]);
        for i in 0..3 {
            game.pass(&id(&format!("b{i}"))).unwrap();
        }
        assert!(matches!(
            game.pass(&id("b3")),
            Err(TacticsError::IllegalAction(IllegalAction::NoActivationsLeft))
        ));

        let snap = game.end_turn().unwrap();
        assert_eq!(snap.turn.side, Side::Red);
        assert_eq!(snap.turn.turn_number, 2);
        assert_eq!(snap.turn.activations_left, 3);
        assert!(game.turn().acted.is_empty());
    }

    #[test]
    fn test_flank_and_cover_change_pool() {
        let doc = duel()
            .with_unit(unit("b2", Side::Blue, UnitType::Infantry, 2, 0))
            .with_terrain(cell(1, 0), TerrainTag::Woods);
        let mut game = engine(doc, vec![1, 1, 1]);
        let outcome = game.resolve_attack(&id("b1"), &id("r1")).unwrap();
        assert_eq!(outcome.pool.base, 2);
        assert_eq!(outcome.pool.flank_bonus, 1);
        assert_eq!(outcome.pool.cover_penalty, 1);
        assert_eq!(outcome.rolls.len(), 2);
    }

    #[test]
    fn test_interactive_retreat_pauses() {
        let config = EngineConfig::default()
            .with_seed(3)
            .with_retreat_policy(RetreatPolicy::Interactive);
        let mut game = GameEngine::new(&duel(), config)
            .unwrap()
            .with_dice(ScriptedDice::new([4, 1]));

        let outcome = game.resolve_attack(&id("b1"), &id("r1")).unwrap();
        assert_eq!(outcome.retreat_pending, 1);
        assert_eq!(game.phase(), EnginePhase::RetreatInProgress);

        let pending = game.pending_retreat().expect("pending");
        assert_eq!(pending.side, Side::Red);
        assert_eq!(pending.options.len(), 3);

        assert!(matches!(
            game.end_turn(),
            Err(TacticsError::IllegalAction(IllegalAction::RetreatInProgress))
        ));
        assert!(game.export().is_err());
        assert!(matches!(
            game.choose_retreat(cell(0, 1)),
            Err(TacticsError::IllegalAction(IllegalAction::NotARetreatOption(_)))
        ));

        let target = pending.options[2];
        let snap = game.choose_retreat(target).unwrap();
        assert_eq!(snap.phase, EnginePhase::Normal);
        assert!(snap.pending_retreat.is_none());
        assert_eq!(game.unit(&id("r1")).unwrap().cell, target);
        assert!(matches!(
            game.events().last().map(|e| &e.kind),
            Some(BattleEventKind::AttackResolved(o)) if o.retreat_moves == 1
        ));
    }

    #[test]
    fn test_choose_retreat_without_pending() {
        let mut game = engine(duel(), vec![]);
        assert!(matches!(
            game.choose_retreat(cell(2, 0)),
            Err(TacticsError::IllegalAction(IllegalAction::NoRetreatPending))
        ));
    }

    #[test]
    fn test_random_policy_is_seeded() {
        let config = EngineConfig::default()
            .with_seed(11)
            .with_retreat_policy(RetreatPolicy::Random);
        let play = || {
            let mut game = GameEngine::new(&duel(), config.clone()).unwrap();
            let mut attacks = 0;
            for _ in 0..3 {
                if game.winner().is_some() || game.unit(&id("r1")).is_none() || game.unit(&id("b1")).is_none() {
                    break;
                }
                let adjacent = game.attack_targets(&id("b1")).unwrap();
                if adjacent.is_empty() {
                    break;
                }
                game.attack(&id("b1"), &id("r1")).unwrap();
                attacks += 1;
                if game.winner().is_none() {
                    game.end_turn().unwrap();
                    game.end_turn().unwrap();
                }
            }
            (attacks, game.snapshot())
        };
        let (attacks, first) = play();
        assert!(attacks >= 1);
        assert_eq!(first, play().1);
    }

    #[test]
    fn test_export_round_trip() {
        let doc = duel()
            .with_terrain(cell(3, 3), TerrainTag::Hill)
            .with_standards(Side::Red, 2);
        let game = engine(doc.clone(), vec![]);
        assert_eq!(game.export().unwrap(), doc);
    }

    #[test]
    fn test_reset_rejects_invalid_and_keeps_state() {
        let mut game = engine(duel(), vec![]);
        game.pass(&id("b1")).unwrap();
        let mut bad = duel();
        bad.units[1].cell = bad.units[0].cell;
        assert!(matches!(
            game.reset(&bad),
            Err(TacticsError::InvalidScenario(_))
        ));
        assert!(game.turn().has_acted(&id("b1")));

        let snap = game.reset(&duel()).unwrap();
        assert_eq!(snap.turn.activations_left, 3);
        assert_eq!(game.events().len(), 1);
    }

    #[test]
    fn test_side_totals() {
        let game = engine(duel(), vec![]);
        assert_eq!(game.side_totals(Side::Red), SideTotals { units: 1, hp: 4 });
    }
}
