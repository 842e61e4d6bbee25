//! Food Items
//!
//! Food is created once from the initial `config` snapshot and afterwards
//! only moved or re-typed in place. Ids stay stable for the session.

use std::fmt;

use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::grid::GridPosition;

/// Visual kind of a food item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FoodKind {
    /// Red apple
    RedApple,
    /// Green apple
    GreenApple,
    /// Yellow apple
    YellowApple,
    /// Strawberry
    Strawberry,
    /// Cherry
    Cherry,
    /// Chili
    Chili,
    /// Banana
    Banana,
    /// A kind this client does not know yet
    #[serde(other)]
    Unknown,
}

/// A food item on the grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FoodItem {
    /// Stable identifier
    pub id: u32,
    /// Cell
    pub position: GridPosition,
    /// Visual kind
    pub kind: FoodKind,
}

impl FoodItem {
    /// Move and re-type in place. The id never changes.
    pub fn update(&mut self, position: GridPosition, kind: FoodKind) {
        self.position = position;
        self.kind = kind;
    }
}

/// Wire tuple `[col, row, id, type]`. Trailing elements are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FoodTuple(pub i32, pub i32, pub u32, pub FoodKind);

impl<'de> Deserialize<'de> for FoodTuple {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TupleVisitor;

        impl<'de> Visitor<'de> for TupleVisitor {
            type Value = FoodTuple;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an array [col, row, id, type]")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<FoodTuple, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let col = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let row = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let id = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                let kind = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(3, &self))?;
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(FoodTuple(col, row, id, kind))
            }
        }

        deserializer.deserialize_seq(TupleVisitor)
    }
}

impl FoodTuple {
    /// Cell of the tuple.
    pub fn position(&self) -> GridPosition {
        GridPosition::new(self.0, self.1)
    }

    /// Food id.
    pub fn id(&self) -> u32 {
        self.2
    }

    /// Food kind.
    pub fn kind(&self) -> FoodKind {
        self.3
    }
}

impl From<FoodTuple> for FoodItem {
    fn from(t: FoodTuple) -> Self {
        FoodItem {
            id: t.id(),
            position: t.position(),
            kind: t.kind(),
        }
    }
}
