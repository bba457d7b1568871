use anyhow::{anyhow, Result};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use shared::agent_api::{StreamChunk, Turn, TurnPart};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Serialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Serialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    #[serde(rename = "googleSearch")]
    google_search: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
    #[serde(rename = "groundingMetadata")]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroundingMetadata {
    #[serde(rename = "groundingChunks", default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<GroundingWeb>,
}

#[derive(Debug, Deserialize)]
struct GroundingWeb {
    uri: Option<String>,
    title: Option<String>,
}

pub struct GeminiClient {
    http: Client,
    auth_token: String,
    model: String,
}

impl GeminiClient {
    pub fn new(model: &str) -> Result<Self> {
        let key = env::var("GEMINI_API_KEY").map_err(|_| anyhow!("GEMINI_API_KEY not set"))?;
        Ok(Self {
            http: Client::builder().timeout(Duration::from_secs(120)).build()?,
            auth_token: key,
            model: model.to_string(),
        })
    }

    /// Streams one exchange. Text fragments, citations, and finally `Done`
    /// arrive on `tx` in order; the receiver side accumulates them.
    pub async fn generate_stream(
        &self,
        system_instruction: &str,
        turns: &[Turn],
        search_enabled: bool,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.model, self.auth_token
        );

        let contents = turns.iter().map(to_gemini_content).collect();
        let req = GeminiRequest {
            contents,
            system_instruction: Some(GeminiSystemInstruction {
                parts: vec![GeminiTextPart {
                    text: system_instruction.to_string(),
                }],
            }),
            tools: search_enabled.then(|| {
                vec![GeminiTool {
                    google_search: serde_json::Map::new(),
                }]
            }),
        };

        let resp = self.http.post(url).json(&req).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(800).collect();
            if detail.trim().is_empty() {
                return Err(anyhow!("gemini error: {}", status));
            }
            return Err(anyhow!("gemini error: {}\n{}", status, detail));
        }

        let mut parser = crate::sse::SseParser::new();
        let mut stream = resp.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| anyhow!("stream read error: {}", e))?;
            for event in parser.feed(&bytes) {
                match serde_json::from_str::<GeminiStreamResponse>(&event.data) {
                    Ok(resp) => emit_candidates(&resp, &tx),
                    Err(_) => {
                        // Skip unparseable SSE lines
                    }
                }
            }
        }

        let _ = tx.send(StreamChunk::Done);
        Ok(())
    }
}

fn to_gemini_content(turn: &Turn) -> GeminiContent {
    // Gemini expects roles "user" | "model".
    let role = match turn.role.as_str() {
        "assistant" => "model",
        other => other,
    };
    let parts = turn
        .parts
        .iter()
        .map(|part| match part {
            TurnPart::Text(text) => GeminiPart {
                text: Some(text.clone()),
                inline_data: None,
            },
            TurnPart::InlineData { mime_type, data } => GeminiPart {
                text: None,
                inline_data: Some(GeminiInlineData {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                }),
            },
        })
        .collect();
    GeminiContent {
        role: role.to_string(),
        parts,
    }
}

fn emit_candidates(resp: &GeminiStreamResponse, tx: &UnboundedSender<StreamChunk>) {
    for candidate in &resp.candidates {
        if let Some(content) = &candidate.content {
            for part in &content.parts {
                if let Some(text) = &part.text {
                    if !text.is_empty() {
                        let _ = tx.send(StreamChunk::Text(text.clone()));
                    }
                }
            }
        }
        if let Some(grounding) = &candidate.grounding_metadata {
            for chunk in &grounding.grounding_chunks {
                let Some(web) = &chunk.web else { continue };
                let (Some(uri), Some(title)) = (&web.uri, &web.title) else {
                    continue;
                };
                let _ = tx.send(StreamChunk::Citation {
                    uri: uri.clone(),
                    title: title.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_mapping() {
        let content = to_gemini_content(&Turn::model("hi"));
        assert_eq!(content.role, "model");
        let content = to_gemini_content(&Turn {
            role: "assistant".to_string(),
            parts: vec![TurnPart::Text("hi".to_string())],
        });
        assert_eq!(content.role, "model");
        let content = to_gemini_content(&Turn::user("hi"));
        assert_eq!(content.role, "user");
    }

    #[test]
    fn test_stream_event_parsing() {
        let data = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "echo hi"}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://a.com", "title": "A"}},
                        {"web": {"uri": "https://b.com"}}
                    ]
                }
            }]
        }"#;
        let resp: GeminiStreamResponse = serde_json::from_str(data).unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        emit_candidates(&resp, &tx);
        drop(tx);

        let mut texts = Vec::new();
        let mut citations = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            match chunk {
                StreamChunk::Text(t) => texts.push(t),
                StreamChunk::Citation { uri, .. } => citations.push(uri),
                StreamChunk::Done => {}
            }
        }
        assert_eq!(texts, vec!["echo hi"]);
        // the sourceless grounding chunk is dropped
        assert_eq!(citations, vec!["https://a.com"]);
    }

    #[test]
    fn test_search_tool_serialization() {
        let req = GeminiRequest {
            contents: vec![],
            system_instruction: None,
            tools: Some(vec![GeminiTool {
                google_search: serde_json::Map::new(),
            }]),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json["tools"][0]["googleSearch"].is_object());
    }
}
