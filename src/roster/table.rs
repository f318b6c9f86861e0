use crate::model::{SortKey, SortOrder, Student};
use icu::collator::{options::CollatorOptions, Collator, CollatorBorrowed};
use std::cmp::Ordering;
use std::sync::OnceLock;

pub const COLUMNS: [&str; 5] = ["ID", "First Name", "Last Name", "Email", "IP Address"];

/// Rendered form of a roster: one row of cell text per record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterTable {
    pub rows: Vec<[String; 5]>,
}

impl RosterTable {
    /// One row per record, in order.
    pub fn from_students(students: &[Student]) -> Self {
        let rows = students
            .iter()
            .map(|s| s.fields().map(str::to_string))
            .collect();
        Self { rows }
    }

    /// Read the records back out of the rendered cells.
    pub fn to_students(&self) -> Vec<Student> {
        self.rows
            .iter()
            .map(|[id, first_name, last_name, email, ip_address]| Student {
                id: id.clone(),
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                email: email.clone(),
                ip_address: ip_address.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column widths in characters, header included.
    pub fn column_widths(&self) -> [usize; 5] {
        let mut widths = COLUMNS.map(|c| c.chars().count());
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row.iter()) {
                *w = (*w).max(cell.chars().count());
            }
        }
        widths
    }

    /// Lay the table out as aligned text, header and separator first.
    pub fn render_text(&self) -> Vec<String> {
        let widths = self.column_widths();
        let fmt_row = |cells: [&str; 5]| {
            cells
                .iter()
                .zip(widths.iter())
                .map(|(c, w)| format!("{c:<w$}", w = *w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(fmt_row(COLUMNS));
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        for row in &self.rows {
            lines.push(fmt_row([
                row[0].as_str(),
                row[1].as_str(),
                row[2].as_str(),
                row[3].as_str(),
                row[4].as_str(),
            ]));
        }
        lines
    }
}

fn collator() -> Option<&'static CollatorBorrowed<'static>> {
    static COLLATOR: OnceLock<Option<CollatorBorrowed<'static>>> = OnceLock::new();
    COLLATOR
        .get_or_init(|| match Collator::try_new(Default::default(), CollatorOptions::default()) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(error = %e, "collator unavailable, sorting by lowercase text");
                None
            }
        })
        .as_ref()
}

/// Compare two cell values for `key`. Text uses root-locale collation and
/// falls back to the raw value so the ordering stays total; ids compare
/// numerically when both parse.
pub fn compare_field(key: SortKey, a: &str, b: &str) -> Ordering {
    if key == SortKey::Id {
        if let (Ok(x), Ok(y)) = (a.trim().parse::<u64>(), b.trim().parse::<u64>()) {
            return x.cmp(&y);
        }
    }
    let ord = match collator() {
        Some(c) => c.compare(a, b),
        None => a.to_lowercase().cmp(&b.to_lowercase()),
    };
    ord.then_with(|| a.cmp(b))
}

/// Stable sort; records with equal keys keep their relative order.
pub fn sort_students(students: &mut [Student], key: SortKey, order: SortOrder) {
    students.sort_by(|a, b| {
        let ord = compare_field(key, a.field(key), b.field(key));
        match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });
}

/// Extract the records from `table`, sort them and render a fresh table.
/// Rows whose cells are all empty are dropped from the result.
pub fn rebuild(table: &RosterTable, key: SortKey, order: SortOrder) -> RosterTable {
    let mut students = table.to_students();
    sort_students(&mut students, key, order);
    students.retain(|s| s.fields().iter().any(|c| !c.is_empty()));
    RosterTable::from_students(&students)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str, first: &str, last: &str) -> Student {
        Student {
            id: id.into(),
            first_name: first.into(),
            last_name: last.into(),
            email: format!("{}@example.com", first.to_lowercase()),
            ip_address: format!("10.0.0.{id}"),
        }
    }

    #[test]
    fn extraction_reproduces_rendered_values() {
        let students = vec![student("1", "Zoe", "Adams"), student("2", "Amy", "Brown")];
        let table = RosterTable::from_students(&students);
        assert_eq!(table.to_students(), students);
    }

    #[test]
    fn empty_record_survives_render_and_extract() {
        let students =
            crate::roster::parse_body("h\n1,A,B,a@b.c,1.1.1.1\n,,,,", crate::model::HeaderMode::Skip)
                .unwrap();
        assert_eq!(students.len(), 2);
        let table = RosterTable::from_students(&students);
        assert_eq!(table.len(), 2);
        assert_eq!(table.to_students(), students);
    }

    #[test]
    fn rebuild_drops_empty_rows() {
        let table = RosterTable::from_students(&[Student::default(), student("1", "Zoe", "Adams")]);
        let rebuilt = rebuild(&table, SortKey::FirstName, SortOrder::Ascending);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt.rows[0][1], "Zoe");
    }

    #[test]
    fn sorts_by_first_name_case_insensitively() {
        let mut students = vec![
            student("1", "zoe", "A"),
            student("2", "Amy", "B"),
            student("3", "bob", "C"),
        ];
        sort_students(&mut students, SortKey::FirstName, SortOrder::Ascending);
        let names: Vec<_> = students.iter().map(|s| s.first_name.as_str()).collect();
        assert_eq!(names, ["Amy", "bob", "zoe"]);
    }

    #[test]
    fn accented_names_sort_with_their_base_letter() {
        let mut students = vec![
            student("1", "Zoe", "A"),
            student("2", "Émile", "B"),
            student("3", "Eve", "C"),
        ];
        sort_students(&mut students, SortKey::FirstName, SortOrder::Ascending);
        let names: Vec<_> = students.iter().map(|s| s.first_name.as_str()).collect();
        assert_eq!(names, ["Émile", "Eve", "Zoe"]);
    }

    #[test]
    fn sort_is_stable_for_equal_first_names() {
        let mut students = vec![
            student("1", "Sam", "First"),
            student("2", "Ann", "Only"),
            student("3", "Sam", "Second"),
            student("4", "Sam", "Third"),
        ];
        sort_students(&mut students, SortKey::FirstName, SortOrder::Ascending);
        let lasts: Vec<_> = students.iter().map(|s| s.last_name.as_str()).collect();
        assert_eq!(lasts, ["Only", "First", "Second", "Third"]);
    }

    #[test]
    fn ids_sort_numerically() {
        let mut students = vec![
            student("10", "A", "A"),
            student("9", "B", "B"),
            student("100", "C", "C"),
        ];
        sort_students(&mut students, SortKey::Id, SortOrder::Ascending);
        let ids: Vec<_> = students.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["9", "10", "100"]);
    }

    #[test]
    fn descending_reverses_order() {
        let mut students = vec![student("1", "Amy", "A"), student("2", "Zoe", "B")];
        sort_students(&mut students, SortKey::FirstName, SortOrder::Descending);
        assert_eq!(students[0].first_name, "Zoe");
    }

    #[test]
    fn rebuild_sorts_table_contents() {
        let table = RosterTable::from_students(&[
            student("1", "Zoe", "Adams"),
            student("2", "Amy", "Brown"),
        ]);
        let rebuilt = rebuild(&table, SortKey::FirstName, SortOrder::Ascending);
        assert_eq!(rebuilt.rows[0][1], "Amy");
        assert_eq!(rebuilt.rows[1][1], "Zoe");
        assert_eq!(rebuilt.len(), table.len());
    }

    #[test]
    fn text_rendering_aligns_columns() {
        let table = RosterTable::from_students(&[student("1", "Zoe", "Adams")]);
        let lines = table.render_text();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID  First Name"));
        assert!(lines[1].starts_with("--  ----------"));
        assert!(lines[2].starts_with("1   Zoe"));
    }
}
