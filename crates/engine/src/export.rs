//! Project export: collect generated files out of assistant messages and
//! package them into a gzipped tar archive.

use anyhow::{bail, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use regex::Regex;
use std::io::Write;
use std::sync::OnceLock;

use shared::types::{ChatSession, MessageSender};

fn file_block_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `### File: path` headers followed by a fenced code block
    RE.get_or_init(|| {
        Regex::new(r"###\s+File:\s+`?([^`\s]+)`?\s*\n```(?:\w*\n)?([\s\S]*?)```").unwrap()
    })
}

fn download_marker_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[Download Project Archive\]\(download_archive:([^)]+)\)").unwrap()
    })
}

/// Extracts the archive filename from a download marker the assistant
/// emitted, if the content carries one.
pub fn find_download_marker(content: &str) -> Option<String> {
    download_marker_pattern()
        .captures(content)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// Collects every `### File:` block from the session's assistant messages.
/// When a path appears more than once the last occurrence wins, so later
/// revisions of a file replace earlier ones.
pub fn collect_files(session: &ChatSession) -> Vec<(String, String)> {
    let mut files: Vec<(String, String)> = Vec::new();
    for message in &session.messages {
        if message.sender != MessageSender::Assistant {
            continue;
        }
        for captures in file_block_pattern().captures_iter(&message.content) {
            let path = captures[1].to_string();
            let content = captures[2].trim().to_string();
            if let Some(existing) = files.iter_mut().find(|(p, _)| *p == path) {
                existing.1 = content;
            } else {
                files.push((path, content));
            }
        }
    }
    files
}

/// Packages collected files into gzipped tar bytes.
pub fn package(files: &[(String, String)]) -> Result<Vec<u8>> {
    if files.is_empty() {
        bail!("no files found to export; the assistant must emit '### File: ...' blocks");
    }
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, content) in files {
        let bytes = content.as_bytes();
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, bytes)?;
    }
    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

/// Collects and packages in one step, writing the archive to `writer`.
pub fn export_session(session: &ChatSession, mut writer: impl Write) -> Result<usize> {
    let files = collect_files(session);
    let bytes = package(&files)?;
    writer.write_all(&bytes)?;
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use shared::types::{ChatMessage, ChatSession, Platform};
    use std::io::Read;

    fn session_with_assistant(content: &str) -> ChatSession {
        let mut session = ChatSession::new(Platform::Linux, vec![], None);
        let mut message = ChatMessage::assistant_placeholder();
        message.content = content.to_string();
        session.messages.push(message);
        session
    }

    #[test]
    fn test_collect_fenced_file_blocks() {
        let session = session_with_assistant(
            "Here you go.\n\n### File: src/index.js\n```javascript\nconsole.log(1);\n```\n\n\
             ### File: `package.json`\n```json\n{}\n```\n",
        );
        let files = collect_files(&session);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0], ("src/index.js".to_string(), "console.log(1);".to_string()));
        assert_eq!(files[1], ("package.json".to_string(), "{}".to_string()));
    }

    #[test]
    fn test_later_revision_of_a_path_wins() {
        let session = session_with_assistant(
            "### File: app.py\n```python\nprint(1)\n```\n\
             fixed version:\n### File: app.py\n```python\nprint(2)\n```\n",
        );
        let files = collect_files(&session);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1, "print(2)");
    }

    #[test]
    fn test_user_messages_are_ignored() {
        let mut session = session_with_assistant("no files here");
        session
            .messages
            .push(ChatMessage::user("### File: a.sh\n```bash\necho no\n```"));
        assert!(collect_files(&session).is_empty());
    }

    #[test]
    fn test_package_round_trip() {
        let files = vec![("dir/a.txt".to_string(), "hello".to_string())];
        let bytes = package(&files).unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(&bytes[..]));
        let mut entries = archive.entries().unwrap();
        let mut entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().display().to_string(), "dir/a.txt");
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");
    }

    #[test]
    fn test_package_refuses_empty_set() {
        assert!(package(&[]).is_err());
    }

    #[test]
    fn test_download_marker_extraction() {
        let content =
            "Of course. [Download Project Archive](download_archive:saas-starter.tar.gz)";
        assert_eq!(
            find_download_marker(content).as_deref(),
            Some("saas-starter.tar.gz")
        );
        assert_eq!(find_download_marker("no marker"), None);
    }
}
