use crate::model::{Phase, SortKey, SortOrder};
use crate::roster::{self, RosterTable};

pub struct UiState {
    pub tab: usize,
    pub phase: Phase,
    pub info: String,

    /// Roster exactly as displayed; uploads send this order.
    pub table: RosterTable,
    pub selected: usize,

    /// Column the next sort applies to.
    pub sort_key: SortKey,
    /// Sort currently reflected by `table`, if any.
    pub sorted_by: Option<(SortKey, SortOrder)>,

    pub save_snapshots: bool,
    pub last_exported_path: Option<String>,
    pub fetch_count: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            phase: Phase::Idle,
            info: String::new(),
            table: RosterTable::default(),
            selected: 0,
            sort_key: SortKey::default(),
            sorted_by: None,
            save_snapshots: false,
            last_exported_path: None,
            fetch_count: 0,
        }
    }
}

impl UiState {
    /// Replace the displayed roster and clamp the selection.
    pub fn set_table(&mut self, table: RosterTable, sorted_by: Option<(SortKey, SortOrder)>) {
        self.table = table;
        self.sorted_by = sorted_by;
        self.clamp_selection();
    }

    /// Sort the displayed rows by `sort_key`. Sorting again by the same column flips the order.
    pub fn sort_displayed(&mut self) {
        let order = match self.sorted_by {
            Some((key, order)) if key == self.sort_key => order.toggled(),
            _ => SortOrder::Ascending,
        };
        let rebuilt = roster::rebuild(&self.table, self.sort_key, order);
        self.set_table(rebuilt, Some((self.sort_key, order)));
        self.info = format!("Sorted by {:?} ({order:?})", self.sort_key);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.table.len() {
            self.selected += 1;
        }
    }

    pub fn selected_row(&self) -> Option<&[String; 5]> {
        self.table.rows.get(self.selected)
    }

    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.table.len() {
            self.selected = self.table.len().saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Student;

    fn state_with(names: &[&str]) -> UiState {
        let students: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, n)| Student {
                id: i.to_string(),
                first_name: n.to_string(),
                ..Default::default()
            })
            .collect();
        let mut state = UiState::default();
        state.set_table(RosterTable::from_students(&students), None);
        state
    }

    fn first_names(state: &UiState) -> Vec<String> {
        state.table.rows.iter().map(|r| r[1].clone()).collect()
    }

    #[test]
    fn repeated_sort_toggles_order() {
        let mut state = state_with(&["Zoe", "Amy", "Bob"]);
        state.sort_displayed();
        assert_eq!(first_names(&state), ["Amy", "Bob", "Zoe"]);
        state.sort_displayed();
        assert_eq!(first_names(&state), ["Zoe", "Bob", "Amy"]);
        assert_eq!(
            state.sorted_by,
            Some((SortKey::FirstName, SortOrder::Descending))
        );
    }

    #[test]
    fn changing_column_starts_ascending() {
        let mut state = state_with(&["Zoe", "Amy"]);
        state.sort_displayed();
        state.sort_key = SortKey::Id;
        state.sort_displayed();
        assert_eq!(state.sorted_by, Some((SortKey::Id, SortOrder::Ascending)));
        assert_eq!(first_names(&state), ["Zoe", "Amy"]);
    }

    #[test]
    fn selection_is_clamped_on_shorter_roster() {
        let mut state = state_with(&["A", "B", "C"]);
        state.select_next();
        state.select_next();
        state.select_next();
        assert_eq!(state.selected, 2);
        state.set_table(RosterTable::default(), None);
        assert_eq!(state.selected, 0);
        assert!(state.selected_row().is_none());
    }
}
