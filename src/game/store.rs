//! Entity Store
//!
//! The mirrored world: snakes keyed by player id plus the ordered food list.
//! The methods here are the merge primitives the reconciler composes; each
//! one enforces its own invariant (frozen snakes, stable food ids) so no
//! caller can bypass it.

use std::collections::HashMap;
use serde::Serialize;

use crate::core::grid::GridPosition;
use crate::core::ids::PlayerId;
use crate::game::food::{FoodItem, FoodTuple};
use crate::game::score::ScoreClaim;
use crate::game::snake::Snake;

/// Incremental update for one snake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnakePatch {
    /// New head cell
    pub position: GridPosition,
    /// Replacement tail
    pub tail: Vec<GridPosition>,
    /// Replacement score
    pub score: u32,
    /// Server reports the snake as dead
    pub is_dead: bool,
}

/// Result of applying a [`SnakePatch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchOutcome {
    /// No snake with that id; nothing changed.
    UnknownEntity,
    /// The snake is already dead; nothing changed.
    Frozen,
    /// Fields were overwritten. `died` is set when the patch carries a death
    /// that the caller still has to drive through the death transition.
    Applied {
        /// Patch marks the snake dead
        died: bool,
    },
}

/// Mirrored world model.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EntityStore {
    snakes: HashMap<PlayerId, Snake>,
    food: Vec<FoodItem>,
}

impl EntityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // READ ACCESS
    // =========================================================================

    /// All snakes.
    pub fn snakes(&self) -> &HashMap<PlayerId, Snake> {
        &self.snakes
    }

    /// Snake for a player.
    pub fn snake(&self, id: &PlayerId) -> Option<&Snake> {
        self.snakes.get(id)
    }

    /// Number of snakes.
    pub fn snake_count(&self) -> usize {
        self.snakes.len()
    }

    /// Food in server order.
    pub fn food(&self) -> &[FoodItem] {
        &self.food
    }

    /// Food item by id.
    pub fn food_item(&self, id: u32) -> Option<&FoodItem> {
        self.food.iter().find(|f| f.id == id)
    }

    // =========================================================================
    // MERGE PRIMITIVES
    // =========================================================================

    /// Append the initial food list.
    pub fn seed_food<I>(&mut self, tuples: I)
    where
        I: IntoIterator<Item = FoodTuple>,
    {
        self.food.extend(tuples.into_iter().map(FoodItem::from));
    }

    /// Insert or overwrite a snake. A roster snapshot is authoritative, so
    /// a previously frozen snake is replaced as well.
    pub fn replace_snake(&mut self, id: PlayerId, snake: Snake) -> Option<Snake> {
        self.snakes.insert(id, snake)
    }

    /// Apply an incremental update. Never creates a snake and never touches
    /// a frozen one.
    pub fn apply_patch(&mut self, id: &PlayerId, patch: SnakePatch) -> PatchOutcome {
        let Some(snake) = self.snakes.get_mut(id) else {
            return PatchOutcome::UnknownEntity;
        };

        if snake.is_dead {
            return PatchOutcome::Frozen;
        }

        snake.tail = patch.tail;
        snake.score = patch.score;
        snake.set_position(patch.position);

        PatchOutcome::Applied { died: patch.is_dead }
    }

    /// Drive a snake through its death transition.
    pub fn stop_snake(&mut self, id: &PlayerId, anonymous: bool) -> Option<ScoreClaim> {
        self.snakes.get_mut(id)?.stop(id, anonymous)
    }

    /// Move and re-type a food item. Unknown ids are ignored; returns
    /// whether an item was updated.
    pub fn update_food(&mut self, tuple: FoodTuple) -> bool {
        match self.food.iter_mut().find(|f| f.id == tuple.id()) {
            Some(item) => {
                item.update(tuple.position(), tuple.kind());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::food::FoodKind;
    use crate::game::snake::{SnakeColors, SnakeKind};

    fn live_snake(x: i32, y: i32) -> Snake {
        Snake::new(SnakeKind::Player, GridPosition::new(x, y), SnakeColors::random(), 0)
    }

    fn patch(x: i32, y: i32, score: u32, is_dead: bool) -> SnakePatch {
        SnakePatch {
            position: GridPosition::new(x, y),
            tail: vec![GridPosition::new(x - 1, y)],
            score,
            is_dead,
        }
    }

    #[test]
    fn test_patch_unknown_id_is_noop() {
        let mut store = EntityStore::new();
        store.replace_snake(PlayerId::new("a"), live_snake(1, 1));
        let before = store.clone();

        let outcome = store.apply_patch(&PlayerId::new("ghost"), patch(2, 2, 1, false));
        assert_eq!(outcome, PatchOutcome::UnknownEntity);
        assert_eq!(store, before);
    }

    #[test]
    fn test_patch_frozen_is_noop() {
        let mut store = EntityStore::new();
        let id = PlayerId::new("a");
        store.replace_snake(id.clone(), live_snake(1, 1));
        store.stop_snake(&id, false);
        let before = store.clone();

        let outcome = store.apply_patch(&id, patch(9, 9, 50, false));
        assert_eq!(outcome, PatchOutcome::Frozen);
        assert_eq!(store, before);
    }

    #[test]
    fn test_patch_overwrites_fields() {
        let mut store = EntityStore::new();
        let id = PlayerId::new("a");
        store.replace_snake(id.clone(), live_snake(1, 1));

        let outcome = store.apply_patch(&id, patch(3, 4, 2, true));
        assert_eq!(outcome, PatchOutcome::Applied { died: true });

        let snake = store.snake(&id).unwrap();
        assert_eq!(snake.position, GridPosition::new(3, 4));
        assert_eq!(snake.tail, vec![GridPosition::new(2, 4)]);
        assert_eq!(snake.score, 2);
        // The caller runs the death transition.
        assert!(!snake.is_dead);
    }

    #[test]
    fn test_replace_unfreezes() {
        let mut store = EntityStore::new();
        let id = PlayerId::new("a");
        store.replace_snake(id.clone(), live_snake(1, 1));
        store.stop_snake(&id, false);

        store.replace_snake(id.clone(), live_snake(5, 5));
        let snake = store.snake(&id).unwrap();
        assert!(!snake.is_dead);
        assert_eq!(snake.position, GridPosition::new(5, 5));
    }

    #[test]
    fn test_update_food_in_place() {
        let mut store = EntityStore::new();
        store.seed_food(vec![
            FoodTuple(1, 1, 3, FoodKind::Cherry),
            FoodTuple(2, 2, 4, FoodKind::Chili),
        ]);

        assert!(store.update_food(FoodTuple(5, 6, 3, FoodKind::Banana)));
        let item = store.food_item(3).unwrap();
        assert_eq!(item.position, GridPosition::new(5, 6));
        assert_eq!(item.kind, FoodKind::Banana);

        let other = store.food_item(4).unwrap();
        assert_eq!(other.position, GridPosition::new(2, 2));
        assert_eq!(other.kind, FoodKind::Chili);
    }

    #[test]
    fn test_update_food_unknown_id() {
        let mut store = EntityStore::new();
        store.seed_food(vec![FoodTuple(1, 1, 3, FoodKind::Cherry)]);
        let before = store.food().to_vec();

        assert!(!store.update_food(FoodTuple(5, 6, 99, FoodKind::Banana)));
        assert_eq!(store.food(), before.as_slice());
    }

    #[test]
    fn test_stop_unknown_snake() {
        let mut store = EntityStore::new();
        assert!(store.stop_snake(&PlayerId::new("nobody"), false).is_none());
    }
}
