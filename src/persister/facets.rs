//! Row writers, one per facet.
//!
//! Every writer upserts the fresh rows on their natural key and then deletes
//! whatever rows of that facet were not part of the fresh set, so writing the
//! same record twice leaves identical row counts.

use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::models::{
    DefinitionId, DefinitionType, ExamplePair, Facet, Idiom, Pronunciations, Sentence,
    WordForm, WordId, WordRecord,
};

/// Gloss payload of one definition row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionText {
    pub meaning: String,
    pub chinese_meaning: String,
    pub english_meaning: String,
    pub linked_words: Vec<String>,
}

impl DefinitionText {
    pub fn has_text(&self) -> bool {
        !self.meaning.is_empty()
            || !self.chinese_meaning.is_empty()
            || !self.english_meaning.is_empty()
    }
}

/// Writes one facet of `record` for `word_id`. Returns the number of rows
/// written, counting children.
pub fn write_facet(
    conn: &Connection,
    word_id: WordId,
    record: &WordRecord,
    facet: Facet,
    now: i64,
) -> Result<usize> {
    match facet {
        Facet::Pronunciation => write_pronunciations(conn, word_id, &record.pronunciation, now),
        Facet::Basic => {
            let rows = record
                .definitions
                .basic
                .iter()
                .map(|d| DefinitionDraft::simple(&d.part_of_speech, &d.meaning))
                .collect();
            write_definitions(conn, word_id, DefinitionType::Basic, rows, now)
        }
        Facet::Web => {
            let rows = record
                .definitions
                .web
                .iter()
                .map(|d| {
                    DefinitionDraft::simple(d.part_of_speech.as_deref().unwrap_or(""), &d.meaning)
                })
                .collect();
            write_definitions(conn, word_id, DefinitionType::Web, rows, now)
        }
        Facet::Authoritative => {
            let mut rows = Vec::new();
            for entry in &record.definitions.authoritative {
                let start = rows.len();
                rows.extend(
                    entry
                        .definitions
                        .iter()
                        .filter(|d| d.has_text())
                        .map(|d| DefinitionDraft::sense(&entry.part_of_speech, d)),
                );
                match rows.get_mut(start) {
                    Some(first) => first.idioms = entry.idioms.clone(),
                    None if !entry.idioms.is_empty() => tracing::debug!(
                        word_id = %word_id,
                        part_of_speech = %entry.part_of_speech,
                        "idioms dropped: block has no numbered definition"
                    ),
                    None => {}
                }
            }
            write_definitions(conn, word_id, DefinitionType::Authoritative, rows, now)
        }
        Facet::Bilingual => {
            let rows = record
                .definitions
                .bilingual
                .iter()
                .flat_map(|entry| {
                    entry
                        .definitions
                        .iter()
                        .filter(|d| d.has_text())
                        .map(|d| DefinitionDraft::sense(&entry.part_of_speech, d))
                })
                .collect();
            write_definitions(conn, word_id, DefinitionType::Bilingual, rows, now)
        }
        Facet::English => {
            let rows = record
                .definitions
                .english
                .iter()
                .flat_map(|entry| {
                    entry.definitions.iter().map(|d| DefinitionDraft {
                        part_of_speech: entry.part_of_speech.clone(),
                        text: DefinitionText {
                            meaning: d.meaning.clone(),
                            linked_words: d.linked_words.clone(),
                            ..DefinitionText::default()
                        },
                        ..DefinitionDraft::default()
                    })
                })
                .collect();
            write_definitions(conn, word_id, DefinitionType::English, rows, now)
        }
        Facet::Sentences => write_sentences(conn, word_id, &record.sentences),
        Facet::WordForms => write_word_forms(conn, word_id, &record.word_forms),
    }
}

fn write_pronunciations(
    conn: &Connection,
    word_id: WordId,
    pronunciations: &Pronunciations,
    now: i64,
) -> Result<usize> {
    let mut kept = Vec::new();
    for (accent, p) in pronunciations.iter() {
        if p.phonetic.is_empty() {
            continue;
        }
        conn.execute(
            "INSERT INTO pronunciations (word_id, accent, phonetic, audio_url, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(word_id, accent) DO UPDATE SET
                 phonetic = excluded.phonetic,
                 audio_url = excluded.audio_url,
                 updated_at = excluded.updated_at",
            params![word_id.get(), accent.as_str(), p.phonetic, p.audio_url, now],
        )
        .with_context(|| format!("Failed to upsert {accent} pronunciation"))?;
        kept.push(accent.as_str());
    }

    let mut stmt = conn.prepare("SELECT accent FROM pronunciations WHERE word_id = ?1")?;
    let existing: Vec<String> = stmt
        .query_map([word_id.get()], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    for accent in existing.iter().filter(|a| !kept.contains(&a.as_str())) {
        conn.execute(
            "DELETE FROM pronunciations WHERE word_id = ?1 AND accent = ?2",
            params![word_id.get(), accent],
        )?;
    }

    Ok(kept.len())
}

#[derive(Debug, Clone, Default)]
struct DefinitionDraft {
    part_of_speech: String,
    text: DefinitionText,
    examples: Vec<ExamplePair>,
    idioms: Vec<Idiom>,
}

impl DefinitionDraft {
    fn simple(part_of_speech: &str, meaning: &str) -> Self {
        Self {
            part_of_speech: part_of_speech.to_string(),
            text: DefinitionText {
                meaning: meaning.to_string(),
                ..DefinitionText::default()
            },
            ..Self::default()
        }
    }

    fn sense(part_of_speech: &str, sense: &crate::models::SenseDefinition) -> Self {
        Self {
            part_of_speech: part_of_speech.to_string(),
            text: DefinitionText {
                chinese_meaning: sense.chinese_meaning.clone(),
                english_meaning: sense.english_meaning.clone(),
                ..DefinitionText::default()
            },
            examples: sense.examples.clone(),
            idioms: Vec::new(),
        }
    }
}

/// Writes every row of one definition family. Orders are 1-based and count
/// per part of speech, matching the `(word, type, pos, order)` key.
fn write_definitions(
    conn: &Connection,
    word_id: WordId,
    def_type: DefinitionType,
    drafts: Vec<DefinitionDraft>,
    now: i64,
) -> Result<usize> {
    let mut next_order: HashMap<String, i64> = HashMap::new();
    let mut kept = BTreeSet::new();
    let mut written = 0;

    for draft in drafts.into_iter().filter(|d| d.text.has_text()) {
        let order = next_order.entry(draft.part_of_speech.clone()).or_insert(0);
        *order += 1;

        let id = upsert_definition(
            conn,
            word_id,
            def_type,
            &draft.part_of_speech,
            *order,
            &draft.text,
            now,
        )?;
        kept.insert(id.get());
        written += 1;

        written += replace_examples(conn, ExampleParent::Definition(id), &draft.examples)?;
        written += replace_idioms(conn, id, &draft.idioms)?;
    }

    let mut stmt =
        conn.prepare("SELECT id FROM definitions WHERE word_id = ?1 AND def_type = ?2")?;
    let existing: Vec<i64> = stmt
        .query_map(params![word_id.get(), def_type.as_str()], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    for stale in existing.into_iter().filter(|id| !kept.contains(id)) {
        conn.execute("DELETE FROM definitions WHERE id = ?1", [stale])?;
    }

    Ok(written)
}

/// Inserts or updates one definition row and returns its id.
pub fn upsert_definition(
    conn: &Connection,
    word_id: WordId,
    def_type: DefinitionType,
    part_of_speech: &str,
    order: i64,
    text: &DefinitionText,
    now: i64,
) -> Result<DefinitionId> {
    let linked_words = if text.linked_words.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&text.linked_words)?)
    };

    let id: i64 = conn
        .query_row(
            "INSERT INTO definitions
                 (word_id, def_type, part_of_speech, def_order, meaning,
                  chinese_meaning, english_meaning, linked_words, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(word_id, def_type, part_of_speech, def_order) DO UPDATE SET
                 meaning = excluded.meaning,
                 chinese_meaning = excluded.chinese_meaning,
                 english_meaning = excluded.english_meaning,
                 linked_words = excluded.linked_words,
                 updated_at = excluded.updated_at
             RETURNING id",
            params![
                word_id.get(),
                def_type.as_str(),
                part_of_speech,
                order,
                text.meaning,
                text.chinese_meaning,
                text.english_meaning,
                linked_words,
                now
            ],
            |row| row.get(0),
        )
        .with_context(|| format!("Failed to upsert {def_type} definition #{order}"))?;

    Ok(DefinitionId::new(id))
}

/// Owner of an ordered list of example pairs.
#[derive(Debug, Clone, Copy)]
pub enum ExampleParent {
    Definition(DefinitionId),
    Idiom(i64),
}

impl ExampleParent {
    fn table(self) -> (&'static str, &'static str, i64) {
        match self {
            Self::Definition(id) => ("definition_examples", "definition_id", id.get()),
            Self::Idiom(id) => ("idiom_examples", "idiom_id", id),
        }
    }
}

/// Makes the parent's examples exactly `examples`, numbered from 1.
pub fn replace_examples(
    conn: &Connection,
    parent: ExampleParent,
    examples: &[ExamplePair],
) -> Result<usize> {
    let (table, column, parent_id) = parent.table();
    let fresh: Vec<&ExamplePair> = examples.iter().filter(|e| !e.is_empty()).collect();

    let upsert = format!(
        "INSERT INTO {table} ({column}, ex_order, english, chinese) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT({column}, ex_order) DO UPDATE SET
             english = excluded.english,
             chinese = excluded.chinese"
    );
    for (i, example) in fresh.iter().enumerate() {
        conn.execute(
            &upsert,
            params![parent_id, i as i64 + 1, example.english, example.chinese],
        )?;
    }
    conn.execute(
        &format!("DELETE FROM {table} WHERE {column} = ?1 AND ex_order > ?2"),
        params![parent_id, fresh.len() as i64],
    )?;

    Ok(fresh.len())
}

fn replace_idioms(conn: &Connection, definition_id: DefinitionId, idioms: &[Idiom]) -> Result<usize> {
    let fresh: Vec<&Idiom> = idioms.iter().filter(|i| !i.title.is_empty()).collect();
    let mut written = 0;

    for (i, idiom) in fresh.iter().enumerate() {
        let idiom_id: i64 = conn.query_row(
            "INSERT INTO definition_idioms (definition_id, idiom_order, title, meaning)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(definition_id, idiom_order) DO UPDATE SET
                 title = excluded.title,
                 meaning = excluded.meaning
             RETURNING id",
            params![definition_id.get(), i as i64 + 1, idiom.title, idiom.meaning],
            |row| row.get(0),
        )?;
        written += 1;
        written += replace_examples(conn, ExampleParent::Idiom(idiom_id), &idiom.examples)?;
    }
    conn.execute(
        "DELETE FROM definition_idioms WHERE definition_id = ?1 AND idiom_order > ?2",
        params![definition_id.get(), fresh.len() as i64],
    )?;

    Ok(written)
}

fn write_sentences(conn: &Connection, word_id: WordId, sentences: &[Sentence]) -> Result<usize> {
    let fresh: Vec<&Sentence> = sentences
        .iter()
        .filter(|s| !s.english.is_empty() || !s.chinese.is_empty())
        .collect();

    for (i, sentence) in fresh.iter().enumerate() {
        conn.execute(
            "INSERT INTO sentences (word_id, sentence_order, english, chinese, audio_url, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(word_id, sentence_order) DO UPDATE SET
                 english = excluded.english,
                 chinese = excluded.chinese,
                 audio_url = excluded.audio_url,
                 source = excluded.source",
            params![
                word_id.get(),
                i as i64 + 1,
                sentence.english,
                sentence.chinese,
                sentence.audio_url,
                sentence.source
            ],
        )
        .with_context(|| format!("Failed to write sentence #{}", i + 1))?;
    }
    conn.execute(
        "DELETE FROM sentences WHERE word_id = ?1 AND sentence_order > ?2",
        params![word_id.get(), fresh.len() as i64],
    )?;

    Ok(fresh.len())
}

fn write_word_forms(conn: &Connection, word_id: WordId, forms: &[WordForm]) -> Result<usize> {
    let mut kept: Vec<&str> = Vec::new();
    for form in forms.iter().filter(|f| !f.word.is_empty()) {
        conn.execute(
            "INSERT INTO word_forms (word_id, form_type, form_word) VALUES (?1, ?2, ?3)
             ON CONFLICT(word_id, form_type) DO UPDATE SET form_word = excluded.form_word",
            params![word_id.get(), form.form_type, form.word],
        )?;
        if !kept.contains(&form.form_type.as_str()) {
            kept.push(&form.form_type);
        }
    }

    let mut stmt = conn.prepare("SELECT form_type FROM word_forms WHERE word_id = ?1")?;
    let existing: Vec<String> = stmt
        .query_map([word_id.get()], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    for form_type in existing.iter().filter(|t| !kept.contains(&t.as_str())) {
        conn.execute(
            "DELETE FROM word_forms WHERE word_id = ?1 AND form_type = ?2",
            params![word_id.get(), form_type],
        )?;
    }

    Ok(kept.len())
}
