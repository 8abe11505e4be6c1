//! AnkiConnect client.
//!
//! Every call is a JSON POST of `{action, version, params}` answered by
//! `{result, error}`. Notes are treated as cards: the note id is the remote
//! id and the `Front`/`Back` fields carry the text.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::card::{Card, CardStamp};
use crate::errors::Error;

use super::CardSource;

const API_VERSION: u8 = 6;
const NOTE_MODEL: &str = "Basic";

#[derive(Serialize)]
struct Request<'a> {
    action: &'a str,
    version: u8,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Response<T> {
    result: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Field {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteInfo {
    note_id: Option<i64>,
    #[serde(default)]
    fields: HashMap<String, Field>,
    #[serde(rename = "mod", default)]
    modified: i64,
    #[serde(default)]
    cards: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteModTime {
    note_id: i64,
    #[serde(rename = "mod")]
    modified: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardDeck {
    #[serde(default)]
    deck_name: Option<String>,
}

/// Blocking AnkiConnect client.
pub struct AnkiConnect {
    client: Client,
    url: String,
}

impl AnkiConnect {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::anki(e.to_string()))?;
        Ok(AnkiConnect {
            client,
            url: url.to_string(),
        })
    }

    fn invoke<T: DeserializeOwned>(
        &self,
        action: &str,
        params: serde_json::Value,
    ) -> Result<T, Error> {
        tracing::trace!(action, "AnkiConnect request");
        let response = self
            .client
            .post(&self.url)
            .json(&Request {
                action,
                version: API_VERSION,
                params,
            })
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::anki(format!("{action}: {e}")))?;

        let body: Response<serde_json::Value> = response
            .json()
            .map_err(|e| Error::Parse(format!("{action}: invalid JSON response: {e}")))?;
        decode(action, body)
    }

    /// Deck name of each note, looked up through its first card.
    fn note_decks(&self, notes: &[NoteInfo]) -> Result<HashMap<i64, String>, Error> {
        let first_cards: Vec<i64> = notes.iter().filter_map(|n| n.cards.first().copied()).collect();
        if first_cards.is_empty() {
            return Ok(HashMap::new());
        }

        let decks: Vec<CardDeck> = self.invoke("cardsInfo", json!({ "cards": first_cards }))?;
        Ok(first_cards
            .into_iter()
            .zip(decks)
            .filter_map(|(card_id, deck)| deck.deck_name.map(|name| (card_id, name)))
            .collect())
    }
}

/// Unwrap an AnkiConnect envelope into `T`.
fn decode<T: DeserializeOwned>(action: &str, body: Response<serde_json::Value>) -> Result<T, Error> {
    if let Some(error) = body.error {
        return Err(Error::anki(format!("{action}: {error}")));
    }
    let result = body.result.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(result)
        .map_err(|e| Error::Parse(format!("{action}: unexpected response shape: {e}")))
}

fn parse_ids(ids: &[String]) -> Result<Vec<i64>, Error> {
    ids.iter()
        .map(|id| {
            id.parse::<i64>()
                .map_err(|_| Error::InvalidInput(format!("not an Anki note id: {id}")))
        })
        .collect()
}

/// Convert a note to a `Card`, or `None` when it lacks the expected fields.
fn note_to_card(note: NoteInfo, decks: &HashMap<i64, String>) -> Option<Card> {
    let note_id = note.note_id?;
    let deck_name = note.cards.first().and_then(|c| decks.get(c))?.clone();
    let mut fields = note.fields;
    let front = fields.remove("Front")?.value;
    let back = fields.remove("Back").map(|f| f.value).unwrap_or_default();
    Some(Card {
        remote_id: note_id.to_string(),
        deck_name,
        front,
        back,
        last_modified: note.modified,
    })
}

/// Search for notes directly in `deck`, excluding its subdecks.
///
/// `*` and `_` are wildcards in Anki searches, so they are escaped along
/// with quotes and backslashes.
fn deck_query(deck: &str) -> String {
    let mut escaped = String::with_capacity(deck.len());
    for c in deck.chars() {
        if matches!(c, '\\' | '"' | '*' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("deck:\"{escaped}\" -deck:\"{escaped}::*\"")
}

impl CardSource for AnkiConnect {
    fn list_decks(&self) -> Result<Vec<String>, Error> {
        let mut decks: Vec<String> = self.invoke("deckNames", json!({}))?;
        decks.sort();
        Ok(decks)
    }

    fn list_card_ids(&self, deck: &str) -> Result<Vec<String>, Error> {
        let ids: Vec<i64> = self.invoke("findNotes", json!({ "query": deck_query(deck) }))?;
        Ok(ids.into_iter().map(|id| id.to_string()).collect())
    }

    fn get_cards(&self, ids: &[String]) -> Result<Vec<Card>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let notes: Vec<NoteInfo> = self.invoke("notesInfo", json!({ "notes": parse_ids(ids)? }))?;
        let decks = self.note_decks(&notes)?;

        let mut cards = Vec::with_capacity(notes.len());
        for note in notes {
            let note_id = note.note_id;
            match note_to_card(note, &decks) {
                Some(card) => cards.push(card),
                None => tracing::warn!(?note_id, "skipping note without Front field or deck"),
            }
        }
        Ok(cards)
    }

    fn add_card(&self, deck: &str, front: &str, back: &str) -> Result<String, Error> {
        let note_id: Option<i64> = self.invoke(
            "addNote",
            json!({
                "note": {
                    "deckName": deck,
                    "modelName": NOTE_MODEL,
                    "fields": { "Front": front, "Back": back },
                    "options": { "allowDuplicate": true },
                    "tags": []
                }
            }),
        )?;
        note_id
            .map(|id| id.to_string())
            .ok_or_else(|| Error::Parse("addNote: no note id returned".to_string()))
    }

    fn update_card(&self, remote_id: &str, front: &str, back: &str) -> Result<(), Error> {
        let id = parse_ids(&[remote_id.to_string()])?[0];
        let _: serde_json::Value = self.invoke(
            "updateNoteFields",
            json!({ "note": { "id": id, "fields": { "Front": front, "Back": back } } }),
        )?;
        Ok(())
    }

    fn card_stamps(&self, ids: &[String]) -> Result<Vec<CardStamp>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let times: Vec<NoteModTime> =
            self.invoke("notesModTime", json!({ "notes": parse_ids(ids)? }))?;
        Ok(times
            .into_iter()
            .map(|t| CardStamp {
                remote_id: t.note_id.to_string(),
                last_modified: t.modified,
            })
            .collect())
    }
}
