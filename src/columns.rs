use crate::saving::Groups;
use crate::source::Attributes;
use indexmap::IndexSet;

/// Everything that can happen to the visible column list.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnAction {
    Append(String),
    Delete(usize),
    Select(usize),
    Set(Vec<String>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnState {
    pub columns: Vec<String>,
    pub selected: Option<usize>,
}

impl ColumnState {
    pub fn new(columns: Vec<String>) -> Self {
        ColumnState {
            columns,
            selected: None,
        }
    }

    /// Appending keeps the selection, deleting and replacing clear it.
    pub fn reduce(self, action: ColumnAction) -> Self {
        let ColumnState {
            mut columns,
            selected,
        } = self;
        match action {
            ColumnAction::Append(ticker) => {
                columns.push(ticker);
                ColumnState { columns, selected }
            }
            ColumnAction::Delete(index) => {
                if index < columns.len() {
                    columns.remove(index);
                }
                ColumnState {
                    columns,
                    selected: None,
                }
            }
            ColumnAction::Select(index) => ColumnState {
                columns,
                selected: Some(index),
            },
            ColumnAction::Set(columns) => ColumnState {
                columns,
                selected: None,
            },
        }
    }
}

/// Known attribute names, in discovery order. Grows, never shrinks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowSet {
    rows: IndexSet<String>,
}

impl RowSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_new_rows(&mut self, attributes: &Attributes) {
        for name in attributes.keys() {
            if !self.rows.contains(name) {
                self.rows.insert(name.clone());
            }
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Named snapshots of the column list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SavedGroups {
    groups: Groups,
}

impl SavedGroups {
    pub fn new(groups: Groups) -> Self {
        SavedGroups { groups }
    }

    pub fn save(&mut self, name: &str, columns: &[String]) {
        self.groups.insert(name.to_string(), columns.to_vec());
    }

    pub fn delete(&mut self, name: &str) -> bool {
        self.groups.shift_remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Groups {
        &self.groups
    }
}

/// Trims and uppercases typed ticker input. Blank input gives `None`.
pub fn normalize_ticker(input: &str) -> Option<String> {
    let ticker = input.trim().to_uppercase();
    (!ticker.is_empty()).then_some(ticker)
}
