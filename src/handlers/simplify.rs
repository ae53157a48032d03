//! # Word Simplification Endpoint
//!
//! `POST /api/simplify-word`: returns a simpler alternative for a difficult
//! word, with a short explanation and an example sentence.
//!
//! Resolution order:
//! 1. AI provider (when configured) — a chat completion asked to reply with
//!    a JSON object; any call or parse failure falls through silently.
//! 2. Static lookup table keyed by the lowercased word, with naive plural
//!    stripping (`-s`, then `-es`).
//! 3. Chunking heuristic — the word split into 3-character groups joined by
//!    `-`, so the child can at least sound it out in parts.

use crate::error::AppResult;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct SimplifyRequest {
    pub word: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Simplification {
    pub simplified: String,
    pub explanation: String,
    pub example: String,
}

/// Static entry in the word table.
struct Entry {
    word: &'static str,
    simplified: &'static str,
    explanation: &'static str,
    example: &'static str,
}

/// Common difficult words and their child-friendly alternatives.
const WORD_TABLE: &[Entry] = &[
    Entry {
        word: "difficult",
        simplified: "hard",
        explanation: "Something that is not easy to do or understand.",
        example: "This puzzle is hard to solve.",
    },
    Entry {
        word: "magnificent",
        simplified: "amazing",
        explanation: "Something very beautiful or impressive.",
        example: "The sunset was amazing.",
    },
    Entry {
        word: "enormous",
        simplified: "huge",
        explanation: "Very, very big.",
        example: "The elephant is huge.",
    },
    Entry {
        word: "frightened",
        simplified: "scared",
        explanation: "Feeling afraid of something.",
        example: "The cat was scared of the dog.",
    },
    Entry {
        word: "exhausted",
        simplified: "very tired",
        explanation: "When you feel like you have no energy left.",
        example: "After running, I felt very tired.",
    },
    Entry {
        word: "peculiar",
        simplified: "strange",
        explanation: "Something that seems odd or different.",
        example: "That is a strange hat!",
    },
    Entry {
        word: "ancient",
        simplified: "very old",
        explanation: "Something from a long, long time ago.",
        example: "The pyramids are very old.",
    },
    Entry {
        word: "delicious",
        simplified: "yummy",
        explanation: "Food that tastes really good.",
        example: "This cake is yummy!",
    },
    Entry {
        word: "teach",
        simplified: "shows",
        explanation: "To show someone how to do something.",
        example: "The teacher shows us math.",
    },
    Entry {
        word: "discover",
        simplified: "found",
        explanation: "Finding something new or hidden.",
        example: "I found a treasure!",
    },
    Entry {
        word: "quickly",
        simplified: "fast",
        explanation: "Moving with speed.",
        example: "The rabbit ran fast.",
    },
    Entry {
        word: "curious",
        simplified: "interested",
        explanation: "Wanting to know or learn about something.",
        example: "I am interested in space.",
    },
];

pub async fn simplify_word(
    state: web::Data<AppState>,
    body: web::Json<SimplifyRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let context = req.context.as_deref().unwrap_or("");

    if let Some(ai) = &state.ai {
        match simplify_via_provider(ai, &req.word, context).await {
            Ok(result) => return Ok(HttpResponse::Ok().json(result)),
            Err(err) => {
                // Failures here never surface to the client; the static
                // path answers instead.
                debug!(word = %req.word, error = %err, "Provider simplification failed, using fallback");
            }
        }
    }

    Ok(HttpResponse::Ok().json(fallback_simplify(&req.word)))
}

/// Ask the provider for a simplification as a JSON object.
async fn simplify_via_provider(
    ai: &crate::ai::ProviderClient,
    word: &str,
    context: &str,
) -> anyhow::Result<Simplification> {
    let prompt = format!(
        "Given the word \"{}\" in context: \"{}\"\n\
         Provide:\n\
         1. A simpler alternative suitable for a child learning to read\n\
         2. A one-sentence explanation (max 15 words)\n\
         3. A simple example sentence\n\
         Respond with only a JSON object with keys \"simplified\", \"explanation\", \"example\".",
        word, context
    );

    let reply = ai.generate(&prompt).await?;

    // Models sometimes wrap the object in a markdown code fence.
    let cleaned = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let result: Simplification = serde_json::from_str(cleaned)?;
    Ok(result)
}

/// Static simplification: table lookup with naive plural stripping, then the
/// chunking heuristic for anything unknown.
pub fn fallback_simplify(word: &str) -> Simplification {
    let lower = word.trim().to_lowercase();

    let entry = lookup(&lower)
        .or_else(|| lower.strip_suffix('s').and_then(lookup))
        .or_else(|| lower.strip_suffix("es").and_then(lookup));

    if let Some(entry) = entry {
        return Simplification {
            simplified: entry.simplified.to_string(),
            explanation: entry.explanation.to_string(),
            example: entry.example.to_string(),
        };
    }

    // Unknown word: break it into bite-sized chunks. The example keeps the
    // original input unchanged so the client can still render it.
    Simplification {
        simplified: chunk_word(&lower),
        explanation: format!("Break \"{}\" into small parts and say each part slowly.", word),
        example: word.to_string(),
    }
}

fn lookup(word: &str) -> Option<&'static Entry> {
    WORD_TABLE.iter().find(|entry| entry.word == word)
}

/// Split a word into groups of 3 characters joined by `-`.
fn chunk_word(word: &str) -> String {
    word.chars()
        .collect::<Vec<_>>()
        .chunks(3)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}
