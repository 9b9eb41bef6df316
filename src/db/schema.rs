//! Static knowledge about the normalized tables.
//!
//! The DDL itself lives in the migration files; this module names the
//! parent/child relationships and facet-to-table mapping that the auditor and
//! repair engine walk.

use crate::models::Facet;

/// A child table and the foreign key that ties it to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildTable {
    pub table: &'static str,
    pub parent_column: &'static str,
    pub parent_table: &'static str,
}

impl ChildTable {
    const fn new(
        table: &'static str,
        parent_column: &'static str,
        parent_table: &'static str,
    ) -> Self {
        Self {
            table,
            parent_column,
            parent_table,
        }
    }

    /// `SELECT id, parent` for rows whose parent is missing.
    pub fn orphan_query(&self) -> String {
        format!(
            "SELECT c.id, c.{col} FROM {table} c \
             LEFT JOIN {parent} p ON p.id = c.{col} \
             WHERE p.id IS NULL ORDER BY c.id",
            col = self.parent_column,
            table = self.table,
            parent = self.parent_table,
        )
    }
}

/// Every child table, parents before children.
pub const CHILD_TABLES: [ChildTable; 7] = [
    ChildTable::new("pronunciations", "word_id", "words"),
    ChildTable::new("definitions", "word_id", "words"),
    ChildTable::new("definition_examples", "definition_id", "definitions"),
    ChildTable::new("definition_idioms", "definition_id", "definitions"),
    ChildTable::new("idiom_examples", "idiom_id", "definition_idioms"),
    ChildTable::new("sentences", "word_id", "words"),
    ChildTable::new("word_forms", "word_id", "words"),
];

/// Every table that holds word data, for corpus statistics.
pub const DATA_TABLES: [&str; 8] = [
    "words",
    "pronunciations",
    "definitions",
    "definition_examples",
    "definition_idioms",
    "idiom_examples",
    "sentences",
    "word_forms",
];

/// Query returning 1 when `?1` (a word id) has at least one usable row for
/// `facet`. Rows without text count as absent, like empty facets in a blob.
pub fn facet_presence_query(facet: Facet) -> &'static str {
    match facet {
        Facet::Pronunciation => {
            "SELECT EXISTS(SELECT 1 FROM pronunciations WHERE word_id = ?1 AND phonetic <> '')"
        }
        Facet::Basic => DEFINITION_PRESENCE[0],
        Facet::Web => DEFINITION_PRESENCE[1],
        Facet::Authoritative => DEFINITION_PRESENCE[2],
        Facet::Bilingual => DEFINITION_PRESENCE[3],
        Facet::English => DEFINITION_PRESENCE[4],
        Facet::Sentences => {
            "SELECT EXISTS(SELECT 1 FROM sentences WHERE word_id = ?1 \
             AND (english <> '' OR chinese <> ''))"
        }
        Facet::WordForms => {
            "SELECT EXISTS(SELECT 1 FROM word_forms WHERE word_id = ?1 AND form_word <> '')"
        }
    }
}

macro_rules! definition_presence {
    ($def_type:literal) => {
        concat!(
            "SELECT EXISTS(SELECT 1 FROM definitions WHERE word_id = ?1 AND def_type = '",
            $def_type,
            "' AND (meaning <> '' OR chinese_meaning <> '' OR english_meaning <> ''))"
        )
    };
}

const DEFINITION_PRESENCE: [&str; 5] = [
    definition_presence!("basic"),
    definition_presence!("web"),
    definition_presence!("authoritative"),
    definition_presence!("bilingual"),
    definition_presence!("english"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orphan_query_joins_child_to_parent() {
        let sql = CHILD_TABLES[2].orphan_query();
        assert!(sql.contains("FROM definition_examples c"));
        assert!(sql.contains("LEFT JOIN definitions p ON p.id = c.definition_id"));
    }

    #[test]
    fn definition_presence_filters_by_type() {
        assert!(facet_presence_query(Facet::Bilingual).contains("def_type = 'bilingual'"));
        assert!(facet_presence_query(Facet::Web).contains("def_type = 'web'"));
    }

    #[test]
    fn every_child_table_is_a_data_table() {
        for child in CHILD_TABLES {
            assert!(DATA_TABLES.contains(&child.table));
            assert!(DATA_TABLES.contains(&child.parent_table));
        }
    }
}
