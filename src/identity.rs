use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One half of the couple. Exactly two of these exist in the whole
/// system; there is no general identity scheme behind them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

const AVATAR_BASE: &str = "https://picsum.photos/seed";

fn participant(id: &str, name: &str) -> Participant {
    Participant {
        id: id.to_string(),
        name: name.to_string(),
        avatar: format!("{AVATAR_BASE}/{id}/40/40"),
    }
}

pub fn vishnu() -> Participant {
    participant("p1", "Vishnu")
}

pub fn vaishakhanandini() -> Participant {
    participant("p2", "Vaishakhanandini")
}

impl Participant {
    /// The other half, used by clients to label the far side of the chat.
    pub fn other(&self) -> Participant {
        if self.id == "p1" {
            vaishakhanandini()
        } else {
            vishnu()
        }
    }
}

/// Resolve a participant from a stored id (the client-side identity
/// marker records only the id).
pub fn by_id(id: &str) -> Option<Participant> {
    match id {
        "p1" => Some(vishnu()),
        "p2" => Some(vaishakhanandini()),
        _ => None,
    }
}

/// The pet-name gate. Case-insensitive match against the two secret
/// names; this is an access ritual, not a security boundary.
pub fn authenticate(secret: &str) -> Result<Participant, AppError> {
    let secret = secret.trim();
    if secret.is_empty() {
        return Err(AppError::Validation(
            "You must enter our secret name.".into(),
        ));
    }

    match secret.to_lowercase().as_str() {
        "vishnu" => Ok(vishnu()),
        "vaishakhanandini" => Ok(vaishakhanandini()),
        _ => Err(AppError::Auth(
            "That's not the secret name I know.".into(),
        )),
    }
}
