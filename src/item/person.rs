use std::fmt;

use serde::{Deserialize, Serialize};

/// A client record, as read from the person file.
///
/// Field names follow the file's header convention (`birthDay`), so a
/// reader configured with the field names `name,email,birthDay,age,id`
/// deserializes lines directly into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub birth_day: String,
    pub age: u32,
    /// Reference to the client's photo thumbnail, set by enrichment.
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Person {
    /// Returns a copy of this person carrying the given thumbnail.
    pub fn with_thumbnail(&self, thumbnail: String) -> Person {
        Person {
            thumbnail: Some(thumbnail),
            ..self.clone()
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Person[id={}, name={}, email={}, birthDay={}, age={}, thumbnail={}]",
            self.id,
            self.name,
            self.email,
            self.birth_day,
            self.age,
            self.thumbnail.as_deref().unwrap_or("null")
        )
    }
}

/// Photo resource returned by the thumbnail lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: u64,
    pub thumbnail_url: String,
}
