//! Attachment processing for outgoing messages.
//!
//! Images become inline binary parts. Archives are expanded into a
//! synthetic project-context block. Everything else is treated as a text
//! file and quoted into a fenced code block with a language inferred from
//! the extension.

use anyhow::{Context, Result};
use base64::Engine;
use flate2::read::GzDecoder;
use std::io::Read;

use shared::agent_api::TurnPart;

/// Marker inserted for archive entries that do not decode as text.
pub const BINARY_ENTRY: &str = "[Could not read file content - likely binary.]";

/// An attachment as handed in by the UI: a filename plus raw bytes.
pub struct Attachment {
    pub name: String,
    pub data: Vec<u8>,
}

/// Attachments folded into the pieces of an outgoing user turn.
pub struct PreparedAttachments {
    /// Inline binary parts (images), sent alongside the text part.
    pub parts: Vec<TurnPart>,
    /// Context text appended to the user's message text.
    pub context: String,
}

/// Syntax-highlighting label for a filename, or empty when unknown.
pub fn language_for(name: &str) -> &'static str {
    let extension = name.rsplit('.').next().unwrap_or_default().to_lowercase();
    match extension.as_str() {
        "js" => "javascript",
        "ts" => "typescript",
        "jsx" => "jsx",
        "tsx" => "tsx",
        "py" => "python",
        "html" => "html",
        "css" => "css",
        "json" => "json",
        "md" => "markdown",
        "sh" => "bash",
        "ps1" => "powershell",
        "yml" | "yaml" => "yaml",
        "sql" => "sql",
        "java" => "java",
        "c" => "c",
        "cpp" => "cpp",
        "go" => "go",
        "rb" => "ruby",
        "php" => "php",
        _ => "",
    }
}

fn image_mime(name: &str) -> Option<&'static str> {
    let extension = name.rsplit('.').next()?.to_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn is_archive(name: &str) -> bool {
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Processes all attachments for one outgoing message. A failure here
/// aborts the whole exchange before anything is sent.
pub fn prepare(attachments: &[Attachment]) -> Result<PreparedAttachments> {
    let mut parts = Vec::new();
    let mut context = String::new();

    for attachment in attachments {
        if let Some(mime_type) = image_mime(&attachment.name) {
            parts.push(TurnPart::InlineData {
                mime_type: mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(&attachment.data),
            });
        } else if is_archive(&attachment.name) {
            context.push_str(&expand_archive(&attachment.name, &attachment.data)?);
        } else {
            context.push_str(&quote_text_file(attachment));
        }
    }

    Ok(PreparedAttachments { parts, context })
}

/// Header line summarizing attached files, shown in the user message.
pub fn uploaded_files_header(attachments: &[Attachment]) -> Option<String> {
    if attachments.is_empty() {
        return None;
    }
    let names: Vec<&str> = attachments.iter().map(|a| a.name.as_str()).collect();
    Some(format!("[Uploaded Files: {}]", names.join(", ")))
}

fn quote_text_file(attachment: &Attachment) -> String {
    let content = String::from_utf8_lossy(&attachment.data);
    let lang = language_for(&attachment.name);
    format!(
        "\n\n--- FILE CONTEXT FROM {} ---\n```{}\n{}\n```\n\n--- END OF FILE CONTEXT ---\n",
        attachment.name,
        lang,
        content.trim()
    )
}

/// Expands a gzipped tar archive into a structure listing plus the content
/// of every regular entry.
fn expand_archive(name: &str, data: &[u8]) -> Result<String> {
    let mut entries: Vec<(String, Option<String>)> = Vec::new();

    let mut archive = tar::Archive::new(GzDecoder::new(data));
    for entry in archive
        .entries()
        .with_context(|| format!("reading archive {name}"))?
    {
        let mut entry = entry.with_context(|| format!("reading archive {name}"))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?.display().to_string();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        let content = String::from_utf8(bytes).ok();
        entries.push((path, content));
    }

    let mut out = format!("\n\n--- PROJECT CONTEXT FROM {name} ---\n\n");
    out.push_str("## Project Structure:\n```\n");
    for (path, _) in &entries {
        out.push_str(path);
        out.push('\n');
    }
    out.push_str("```\n\n## File Contents:\n");

    for (path, content) in &entries {
        out.push_str(&format!("\n### Path: /{path}\n"));
        match content {
            Some(text) => {
                let lang = language_for(path);
                out.push_str(&format!("```{}\n{}\n```\n", lang, text.trim()));
            }
            None => {
                out.push_str(&format!("```\n{BINARY_ENTRY}\n```\n"));
            }
        }
    }
    out.push_str("\n--- END OF PROJECT CONTEXT ---\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn make_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_language_lookup() {
        assert_eq!(language_for("setup.sh"), "bash");
        assert_eq!(language_for("deploy.ps1"), "powershell");
        assert_eq!(language_for("config.yaml"), "yaml");
        assert_eq!(language_for("mystery.bin"), "");
    }

    #[test]
    fn test_text_file_quoted_with_language() {
        let prepared = prepare(&[Attachment {
            name: "main.py".to_string(),
            data: b"print('hi')\n".to_vec(),
        }])
        .unwrap();
        assert!(prepared.parts.is_empty());
        assert!(prepared.context.contains("--- FILE CONTEXT FROM main.py ---"));
        assert!(prepared.context.contains("```python\nprint('hi')\n```"));
    }

    #[test]
    fn test_image_becomes_inline_part() {
        let prepared = prepare(&[Attachment {
            name: "shot.png".to_string(),
            data: vec![1, 2, 3],
        }])
        .unwrap();
        assert!(prepared.context.is_empty());
        match &prepared.parts[0] {
            TurnPart::InlineData { mime_type, data } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(data, &base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3]));
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn test_archive_expansion_flags_binary_entries() {
        let archive = make_archive(&[
            ("src/app.js", b"console.log(1)"),
            ("logo.bin", &[0xff, 0xfe, 0x00, 0x80]),
        ]);
        let prepared = prepare(&[Attachment {
            name: "project.tar.gz".to_string(),
            data: archive,
        }])
        .unwrap();
        let context = &prepared.context;
        assert!(context.contains("--- PROJECT CONTEXT FROM project.tar.gz ---"));
        assert!(context.contains("src/app.js"));
        assert!(context.contains("```javascript\nconsole.log(1)\n```"));
        assert!(context.contains(BINARY_ENTRY));
    }

    #[test]
    fn test_corrupt_archive_is_an_error() {
        let result = prepare(&[Attachment {
            name: "broken.tar.gz".to_string(),
            data: vec![0, 1, 2, 3],
        }]);
        assert!(result.is_err());
    }

    #[test]
    fn test_uploaded_files_header() {
        assert_eq!(uploaded_files_header(&[]), None);
        let header = uploaded_files_header(&[
            Attachment { name: "a.sh".to_string(), data: vec![] },
            Attachment { name: "b.py".to_string(), data: vec![] },
        ]);
        assert_eq!(header.as_deref(), Some("[Uploaded Files: a.sh, b.py]"));
    }
}
