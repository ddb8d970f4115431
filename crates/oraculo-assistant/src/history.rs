//! Chat-history hygiene.
//!
//! The generation API requires strictly alternating turns, starting with
//! `user`; since the caller's new message is appended as the next `user`
//! turn, the history must also not end with one. Violations make the
//! service reject the whole call, so the transcript is cleaned before
//! every request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Model,
}

/// One turn of the running conversation, as the UI stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
  pub role: Role,
  pub text: String,
}

/// Clean a transcript for submission: blank turns are dropped, consecutive
/// same-role turns collapse to the first, the result starts with `user` and
/// never ends with `user`.
pub fn normalize_history(history: &[ChatTurn]) -> Vec<ChatTurn> {
  let mut cleaned: Vec<ChatTurn> = Vec::new();

  for turn in history {
    if turn.text.trim().is_empty() {
      continue;
    }
    if cleaned.last().map(|t| t.role) == Some(turn.role) {
      continue;
    }
    cleaned.push(turn.clone());
  }

  while cleaned.first().map(|t| t.role) == Some(Role::Model) {
    cleaned.remove(0);
  }
  if cleaned.last().map(|t| t.role) == Some(Role::User) {
    cleaned.pop();
  }

  cleaned
}

/// Whether a message is an opportunity-radar query, which gets the
/// web-search tool instead of the status-update function.
pub fn is_radar_query(message: &str) -> bool {
  let lower = message.to_lowercase();
  lower.contains("radar") || lower.contains("busca") || lower.contains("licitaç")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn turn(role: Role, text: &str) -> ChatTurn {
    ChatTurn { role, text: text.to_string() }
  }

  #[test]
  fn drops_blank_turns() {
    let cleaned = normalize_history(&[
      turn(Role::User, "oi"),
      turn(Role::Model, "   "),
      turn(Role::Model, "olá"),
    ]);
    assert_eq!(cleaned.len(), 2);
    assert_eq!(cleaned[1].text, "olá");
  }

  #[test]
  fn collapses_consecutive_same_role_turns_keeping_the_first() {
    let cleaned = normalize_history(&[
      turn(Role::User, "primeira"),
      turn(Role::User, "segunda"),
      turn(Role::Model, "resposta"),
    ]);
    assert_eq!(cleaned.len(), 2);
    assert_eq!(cleaned[0].text, "primeira");
  }

  #[test]
  fn strips_leading_model_turns() {
    let cleaned = normalize_history(&[
      turn(Role::Model, "saudação inicial"),
      turn(Role::User, "pergunta"),
      turn(Role::Model, "resposta"),
    ]);
    assert_eq!(cleaned[0].role, Role::User);
    assert_eq!(cleaned.len(), 2);
  }

  #[test]
  fn drops_a_trailing_user_turn() {
    let cleaned = normalize_history(&[
      turn(Role::User, "pergunta"),
      turn(Role::Model, "resposta"),
      turn(Role::User, "pendente"),
    ]);
    assert_eq!(cleaned.len(), 2);
    assert_eq!(cleaned.last().unwrap().role, Role::Model);
  }

  #[test]
  fn empty_history_stays_empty() {
    assert!(normalize_history(&[]).is_empty());
  }

  #[test]
  fn radar_heuristic_matches_portuguese_keywords() {
    assert!(is_radar_query("Radar de oportunidades hoje"));
    assert!(is_radar_query("faça uma BUSCA por pregões"));
    assert!(is_radar_query("novas licitações de kits"));
    assert!(!is_radar_query("mude o status do pregão 12"));
  }
}
