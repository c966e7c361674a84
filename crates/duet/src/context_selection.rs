use anyhow::Result;
use async_trait::async_trait;

use crate::files::{relative_path, FileMap};
use crate::models::message::Message;

/// Narrows the project files sent with a request to those relevant to the conversation
#[async_trait]
pub trait ContextSelector: Send + Sync {
    async fn select(
        &self,
        messages: &[Message],
        files: &FileMap,
        summary: Option<&str>,
    ) -> Result<FileMap>;
}

/// Keeps the files whose relative path or file name is mentioned in the conversation or
/// the summary. When nothing is mentioned the full map is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathMentionSelector;

impl PathMentionSelector {
    fn is_mentioned(path: &str, corpus: &str) -> bool {
        let relative = relative_path(path);
        if !relative.is_empty() && corpus.contains(relative) {
            return true;
        }
        relative
            .rsplit('/')
            .next()
            .filter(|name| name.contains('.'))
            .is_some_and(|name| corpus.contains(name))
    }
}

#[async_trait]
impl ContextSelector for PathMentionSelector {
    async fn select(
        &self,
        messages: &[Message],
        files: &FileMap,
        summary: Option<&str>,
    ) -> Result<FileMap> {
        let mut corpus: Vec<&str> = messages.iter().map(Message::text).collect();
        if let Some(summary) = summary {
            corpus.push(summary);
        }
        let corpus = corpus.join("\n");

        let selected: FileMap = files
            .iter()
            .filter(|(path, _)| Self::is_mentioned(path, &corpus))
            .map(|(path, entry)| (path.clone(), entry.clone()))
            .collect();

        if selected.is_empty() {
            return Ok(files.clone());
        }
        tracing::debug!(
            selected = selected.len(),
            total = files.len(),
            "Selected files mentioned in conversation"
        );
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileEntry;

    fn project() -> FileMap {
        [
            "/home/project/src/App.tsx",
            "/home/project/src/utils/math.ts",
            "/home/project/README.md",
        ]
        .iter()
        .map(|p| (p.to_string(), FileEntry::text("...")))
        .collect()
    }

    #[tokio::test]
    async fn test_selects_mentioned_files() -> Result<()> {
        let messages = vec![Message::user("Add a square function to src/utils/math.ts")];
        let selected = PathMentionSelector
            .select(&messages, &project(), None)
            .await?;

        assert_eq!(selected.len(), 1);
        assert!(selected.contains_key("/home/project/src/utils/math.ts"));
        Ok(())
    }

    #[tokio::test]
    async fn test_file_name_and_summary() -> Result<()> {
        let messages = vec![Message::user("Tweak the styling")];
        let selected = PathMentionSelector
            .select(&messages, &project(), Some("Earlier we edited App.tsx"))
            .await?;

        assert_eq!(selected.len(), 1);
        assert!(selected.contains_key("/home/project/src/App.tsx"));
        Ok(())
    }

    #[tokio::test]
    async fn test_nothing_mentioned_keeps_all() -> Result<()> {
        let messages = vec![Message::user("Make it faster")];
        let selected = PathMentionSelector
            .select(&messages, &project(), None)
            .await?;
        assert_eq!(selected.len(), 3);
        Ok(())
    }
}
