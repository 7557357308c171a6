use std::collections::{BTreeMap, HashMap};

use crate::parser::NodeId;

/// What is known at compile time about a value.
///
/// `Bottom ⊑ Constant(v) ⊑ Top` for every `v`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatticeValue {
    /// Not observed yet.
    Bottom,
    Constant(i32),
    /// Not a compile-time constant.
    Top,
}

impl LatticeValue {
    pub fn join(self, other: LatticeValue) -> LatticeValue {
        match (self, other) {
            (LatticeValue::Bottom, x) | (x, LatticeValue::Bottom) => x,
            (LatticeValue::Constant(a), LatticeValue::Constant(b)) if a == b => self,
            _ => LatticeValue::Top,
        }
    }

    pub fn constant(&self) -> Option<i32> {
        match self {
            LatticeValue::Constant(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.constant().is_some()
    }
}

impl From<i32> for LatticeValue {
    fn from(value: i32) -> Self {
        LatticeValue::Constant(value)
    }
}

impl From<bool> for LatticeValue {
    fn from(value: bool) -> Self {
        LatticeValue::Constant(value as i32)
    }
}

/// Per-variable analysis state at one program point.
pub type VariableStateMap = BTreeMap<String, LatticeValue>;

/// Joins `other` into `into`, pointwise. A name missing from either side is
/// taken to be `Bottom` there.
pub fn join_maps(into: &mut VariableStateMap, other: &VariableStateMap) {
    for (name, value) in other {
        into.entry(name.clone())
            .and_modify(|v| *v = v.join(*value))
            .or_insert(*value);
    }
}

/// Lattice value computed for each expression node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LatticeTable {
    values: HashMap<NodeId, LatticeValue>,
}

impl LatticeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes the analysis never reached are `Top`.
    pub fn get(&self, id: NodeId) -> LatticeValue {
        self.values.get(&id).copied().unwrap_or(LatticeValue::Top)
    }

    pub fn set(&mut self, id: NodeId, value: LatticeValue) {
        self.values.insert(id, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
