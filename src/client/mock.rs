use super::{Repo, RepositoryClient};
use crate::context::Context;
use async_trait::async_trait;
use nixpub_core::config::CommitAuthor;
use nixpub_core::{NixpubError, NixpubResult};
use std::sync::Mutex;

pub const MOCK_URL_TEMPLATE: &str = "https://dummyhost/download/{{ .Tag }}/{{ .ArtifactName }}";

/// What the mock saw
#[derive(Debug, Clone, Default)]
pub struct MockState {
    pub created_file: bool,
    pub content: String,
    pub path: String,
    pub branch: String,
    pub message: String,
    pub author: CommitAuthor,
    pub opened_pull_request: bool,
    pub pull_request_title: String,
    pub pull_request_base: Option<Repo>,
    pub pull_request_draft: bool,
}

/// In-memory repository client
#[derive(Debug, Default)]
pub struct MockClient {
    state: Mutex<MockState>,
    fail_create: bool,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose file writes are rejected
    pub fn failing() -> Self {
        Self {
            state: Mutex::default(),
            fail_create: true,
        }
    }

    pub fn state(&self) -> MockState {
        self.state.lock().unwrap().clone()
    }
}

#[async_trait]
impl RepositoryClient for MockClient {
    fn release_url_template(&self, _ctx: &Context) -> NixpubResult<String> {
        Ok(MOCK_URL_TEMPLATE.to_string())
    }

    async fn create_file(
        &self,
        author: &CommitAuthor,
        repo: &Repo,
        content: &[u8],
        path: &str,
        message: &str,
    ) -> NixpubResult<()> {
        if self.fail_create {
            return Err(NixpubError::Repository("HTTP 403 - forbidden".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.created_file = true;
        state.content = String::from_utf8_lossy(content).to_string();
        state.path = path.to_string();
        state.branch = repo.branch.clone();
        state.message = message.to_string();
        state.author = author.clone();
        Ok(())
    }

    async fn open_pull_request(
        &self,
        base: &Repo,
        _head: &Repo,
        title: &str,
        draft: bool,
    ) -> NixpubResult<()> {
        let mut state = self.state.lock().unwrap();
        state.opened_pull_request = true;
        state.pull_request_title = title.to_string();
        state.pull_request_base = Some(base.clone());
        state.pull_request_draft = draft;
        Ok(())
    }
}
