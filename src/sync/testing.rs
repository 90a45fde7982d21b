//! In-memory stand-ins for the network, token helper and tag writer

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

use super::events::{EventSink, PipelineEvent};
use crate::remote::{
    Artists, CatalogApi, DownloadLink, EntityMetadata, TokenSource, TrackEntry, TrackListPage,
    TrackMetadata,
};
use crate::track::{ReferenceKind, TrackDescriptor};
use crate::utils::TagWriter;

pub const GOOD_TOKEN: &str = "good-token-0123456789";
pub const FRESH_TOKEN: &str = "fresh-token-9876543210";
pub const AUDIO: &[u8] = b"fake mpeg audio payload";

pub fn audio_url(track_id: &str) -> String {
    format!("https://cdn.test/audio/{}.mp3", track_id)
}

pub fn entry(id: &str, title: &str) -> TrackEntry {
    TrackEntry {
        id: id.to_string(),
        title: Some(title.to_string()),
        artists: Some(Artists::One("Test Artist".to_string())),
        album: Some("Test Album".to_string()),
        cover: Some(format!("https://img.test/{}.jpg", id)),
        release_date: Some("2020-01-01".to_string()),
        track_number: None,
    }
}

pub fn descriptor(id: &str, title: &str) -> TrackDescriptor {
    TrackDescriptor::from_entry(&entry(id, title))
}

pub fn page(entries: Vec<TrackEntry>, next_offset: Option<&str>) -> TrackListPage {
    TrackListPage {
        track_list: Some(entries),
        next_offset: next_offset.map(str::to_string),
    }
}

pub fn rejection(status: u16, message: &str) -> DownloadLink {
    DownloadLink {
        success: false,
        link: None,
        message: Some(message.to_string()),
        status_code: Some(status),
    }
}

type PageKey = (ReferenceKind, String, Option<String>);

/// Scriptable fake of the download service
#[derive(Default)]
pub struct FakeApi {
    entities: Mutex<HashMap<(ReferenceKind, String), EntityMetadata>>,
    tracks: Mutex<HashMap<String, TrackMetadata>>,
    pages: Mutex<HashMap<PageKey, TrackListPage>>,
    valid_tokens: Mutex<HashSet<String>>,
    scripted_links: Mutex<HashMap<String, VecDeque<DownloadLink>>>,
    payloads: Mutex<HashMap<String, Bytes>>,
    pub link_calls: Mutex<Vec<(String, String)>>,
    pub fetch_calls: Mutex<Vec<String>>,
    pub metadata_calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    pages_fail: bool,
}

impl FakeApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.accept_token(GOOD_TOKEN);
        api.accept_token(FRESH_TOKEN);
        api
    }

    /// Block metadata calls until the returned handle is notified
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Fail every track list request
    pub fn failing_pages(mut self) -> Self {
        self.pages_fail = true;
        self
    }

    pub fn accept_token(&self, token: &str) {
        self.valid_tokens.lock().unwrap().insert(token.to_string());
    }

    pub fn with_entity(self, kind: ReferenceKind, id: &str, metadata: EntityMetadata) -> Self {
        self.entities
            .lock()
            .unwrap()
            .insert((kind, id.to_string()), metadata);
        self
    }

    pub fn with_track(self, id: &str, metadata: TrackMetadata) -> Self {
        self.tracks.lock().unwrap().insert(id.to_string(), metadata);
        self
    }

    pub fn with_page(
        self,
        kind: ReferenceKind,
        id: &str,
        offset: Option<&str>,
        page: TrackListPage,
    ) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert((kind, id.to_string(), offset.map(str::to_string)), page);
        self
    }

    /// Queue responses for a track's next link requests, ahead of the default
    /// token-based answer
    pub fn script_links(&self, track_id: &str, responses: Vec<DownloadLink>) {
        self.scripted_links
            .lock()
            .unwrap()
            .entry(track_id.to_string())
            .or_default()
            .extend(responses);
    }

    pub fn with_payload(self, url: &str, data: &[u8]) -> Self {
        self.payloads
            .lock()
            .unwrap()
            .insert(url.to_string(), Bytes::copy_from_slice(data));
        self
    }

    /// Link requests made for `track_id`, as the tokens they carried
    pub fn link_tokens_for(&self, track_id: &str) -> Vec<String> {
        self.link_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == track_id)
            .map(|(_, token)| token.clone())
            .collect()
    }

    pub fn link_call_count(&self) -> usize {
        self.link_calls.lock().unwrap().len()
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl CatalogApi for FakeApi {
    async fn entity_metadata(&self, kind: ReferenceKind, id: &str) -> Result<EntityMetadata> {
        self.wait_for_gate().await;
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.entities
            .lock()
            .unwrap()
            .get(&(kind, id.to_string()))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("connection refused"))
    }

    async fn track_metadata(&self, id: &str) -> Result<TrackMetadata> {
        self.wait_for_gate().await;
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.tracks
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("connection refused"))
    }

    async fn track_list_page(
        &self,
        kind: ReferenceKind,
        id: &str,
        offset: Option<&str>,
    ) -> Result<TrackListPage> {
        if self.pages_fail {
            anyhow::bail!("connection reset");
        }
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&(kind, id.to_string(), offset.map(str::to_string)))
            .cloned()
            .unwrap_or_default())
    }

    async fn download_link(&self, track_id: &str, token: &str) -> Result<DownloadLink> {
        self.link_calls
            .lock()
            .unwrap()
            .push((track_id.to_string(), token.to_string()));

        let scripted = self
            .scripted_links
            .lock()
            .unwrap()
            .get_mut(track_id)
            .and_then(VecDeque::pop_front);
        if let Some(response) = scripted {
            return Ok(response);
        }

        if self.valid_tokens.lock().unwrap().contains(token) {
            Ok(DownloadLink {
                success: true,
                link: Some(audio_url(track_id)),
                message: None,
                status_code: Some(200),
            })
        } else {
            Ok(rejection(403, "Invalid token"))
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        self.fetch_calls.lock().unwrap().push(url.to_string());

        if let Some(data) = self.payloads.lock().unwrap().get(url) {
            return Ok(data.clone());
        }
        if url.starts_with("https://cdn.test/audio/") {
            return Ok(Bytes::from_static(AUDIO));
        }
        if url.starts_with("https://img.test/") {
            return Ok(Bytes::from_static(b"cover bytes"));
        }
        anyhow::bail!("Bad download response: 404 Not Found")
    }
}

/// Token source handing out queued results
#[derive(Default)]
pub struct FakeTokenSource {
    results: Mutex<VecDeque<Result<String, String>>>,
    pub calls: AtomicUsize,
}

impl FakeTokenSource {
    pub fn returning(results: Vec<Result<&str, &str>>) -> Self {
        Self {
            results: Mutex::new(
                results
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for FakeTokenSource {
    async fn acquire(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.results.lock().unwrap().pop_front() {
            Some(Ok(token)) => Ok(token),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("token helper unavailable")),
        }
    }
}

/// Tag writer that records what it was asked to write
#[derive(Default)]
pub struct RecordingTagWriter {
    pub calls: Mutex<Vec<(PathBuf, TrackDescriptor, Option<Vec<u8>>)>>,
    failures_left: AtomicUsize,
}

impl RecordingTagWriter {
    /// Fail the first `n` calls
    pub fn failing(n: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(n),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl TagWriter for RecordingTagWriter {
    fn write_tags(&self, path: &Path, track: &TrackDescriptor, cover: Option<&[u8]>) -> Result<()> {
        self.calls.lock().unwrap().push((
            path.to_path_buf(),
            track.clone(),
            cover.map(<[u8]>::to_vec),
        ));

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            anyhow::bail!("tag container is corrupt");
        }
        Ok(())
    }
}

/// An event sink with room for every event a test run produces
pub fn sink() -> (EventSink, mpsc::Receiver<PipelineEvent>) {
    let (tx, rx) = mpsc::channel(10_000);
    (EventSink::new(tx), rx)
}

/// Collect the events sent so far
pub fn drain(rx: &mut mpsc::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Text of every progress and diagnostic line
pub fn messages(events: &[PipelineEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::Progress { message } | PipelineEvent::Diagnostic { message } => {
                Some(message.clone())
            }
            _ => None,
        })
        .collect()
}
