//! Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use juicebox_core::{MediaRoot, QueueRef, User};
use juicebox_importer::{ImportError, IngestConfig, NoCoverArt, SongIngester, SongTags, TagReader};
use juicebox_playback::{
    DeviceConnector, DeviceStatus, MediaQueueDevice, PlaybackConfig, PlaybackController,
    PlaybackError, QueueFlag, TrackDescriptor, TransportState,
};
use juicebox_server::{create_router, middleware::USER_HEADER, AppState};
use juicebox_storage::LocalLibrary;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "juicebox-test-boundary";

/// Shared state of the in-memory playback daemon
#[derive(Debug, Default)]
pub struct Daemon {
    pub flags: HashMap<QueueFlag, bool>,
    pub queue: Vec<String>,
    pub state: TransportState,
    pub elapsed: Option<f64>,
    pub reachable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDaemon(pub Arc<Mutex<Daemon>>);

impl FakeDaemon {
    pub fn queue(&self) -> Vec<String> {
        self.0.lock().unwrap().queue.clone()
    }

    pub fn state(&self) -> TransportState {
        self.0.lock().unwrap().state
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.0.lock().unwrap().reachable = reachable;
    }
}

#[async_trait]
impl DeviceConnector for FakeDaemon {
    async fn connect(&self) -> Result<Box<dyn MediaQueueDevice>, PlaybackError> {
        if !self.0.lock().unwrap().reachable {
            return Err(PlaybackError::Unavailable("connection refused".to_string()));
        }
        Ok(Box::new(FakeDevice(self.clone())))
    }
}

pub struct FakeDevice(FakeDaemon);

impl FakeDevice {
    fn daemon(&self) -> Result<std::sync::MutexGuard<'_, Daemon>, PlaybackError> {
        let daemon = self.0 .0.lock().unwrap();
        if daemon.reachable {
            Ok(daemon)
        } else {
            Err(PlaybackError::Unavailable("connection reset".to_string()))
        }
    }

    fn track(position: usize, file: &str) -> TrackDescriptor {
        let title = Path::new(file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned());
        TrackDescriptor {
            file: file.to_string(),
            title,
            position: Some(position as u32),
            ..TrackDescriptor::default()
        }
    }
}

#[async_trait]
impl MediaQueueDevice for FakeDevice {
    async fn set_flag(&mut self, flag: QueueFlag, on: bool) -> Result<(), PlaybackError> {
        self.daemon()?.flags.insert(flag, on);
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), PlaybackError> {
        self.daemon()?.queue.clear();
        Ok(())
    }

    async fn add(&mut self, uri: &QueueRef) -> Result<(), PlaybackError> {
        self.daemon()?.queue.push(uri.as_str().to_string());
        Ok(())
    }

    async fn status(&mut self) -> Result<DeviceStatus, PlaybackError> {
        let daemon = self.daemon()?;
        let flag = |f| daemon.flags.get(&f).copied().unwrap_or(false);
        Ok(DeviceStatus {
            state: daemon.state,
            consume: flag(QueueFlag::Consume),
            random: flag(QueueFlag::Random),
            repeat: flag(QueueFlag::Repeat),
            single: flag(QueueFlag::Single),
            queue_length: daemon.queue.len() as u32,
            elapsed: daemon.elapsed,
            ..DeviceStatus::default()
        })
    }

    async fn current_track(&mut self) -> Result<Option<TrackDescriptor>, PlaybackError> {
        let daemon = self.daemon()?;
        Ok(daemon.queue.first().map(|file| Self::track(0, file)))
    }

    async fn queue(&mut self) -> Result<Vec<TrackDescriptor>, PlaybackError> {
        let daemon = self.daemon()?;
        Ok(daemon
            .queue
            .iter()
            .enumerate()
            .map(|(i, file)| Self::track(i, file))
            .collect())
    }

    async fn play(&mut self) -> Result<(), PlaybackError> {
        self.daemon()?.state = TransportState::Play;
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), PlaybackError> {
        self.daemon()?.state = TransportState::Pause;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PlaybackError> {
        self.daemon()?.state = TransportState::Stop;
        Ok(())
    }

    async fn previous(&mut self) -> Result<(), PlaybackError> {
        self.daemon()?;
        Ok(())
    }

    async fn next(&mut self) -> Result<(), PlaybackError> {
        self.daemon()?;
        Ok(())
    }

    async fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
        self.daemon()?.elapsed = Some(position.as_secs_f64());
        Ok(())
    }
}

/// Reads `key=value` lines instead of real audio tags
pub struct StubTagReader;

#[async_trait]
impl TagReader for StubTagReader {
    async fn read_tags(&self, path: &Path) -> Result<SongTags, ImportError> {
        let text = tokio::fs::read_to_string(path).await?;
        let mut tags = SongTags::default();
        for line in text.lines() {
            match line.split_once('=') {
                Some(("title", v)) => tags.title = Some(v.to_string()),
                Some(("artist", v)) => tags.artist = Some(v.to_string()),
                Some(("album", v)) => tags.album = Some(v.to_string()),
                _ => {}
            }
        }
        Ok(tags)
    }
}

/// Fake upload content understood by [`StubTagReader`]
pub fn audio(artist: &str, title: &str) -> Vec<u8> {
    format!("artist={}\ntitle={}\n", artist, title).into_bytes()
}

/// A running app over a temporary database, library and fake daemon
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub daemon: FakeDaemon,
    pub alice: User,
    pub bob: User,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = juicebox_storage::create_pool(&format!("sqlite://{}", db_path.display()))
            .await
            .unwrap();
        juicebox_storage::run_migrations(&pool).await.unwrap();

        let alice = juicebox_storage::users::create(&pool, "alice").await.unwrap();
        let bob = juicebox_storage::users::create(&pool, "bob").await.unwrap();

        let library_dir = temp_dir.path().join("music");
        let config = IngestConfig {
            library_dir: library_dir.clone(),
            scratch_dir: temp_dir.path().join("scratch"),
            ..IngestConfig::default()
        };
        let ingester = SongIngester::new(pool.clone(), config)
            .unwrap()
            .with_tag_reader(Arc::new(StubTagReader))
            .with_normalizer(None)
            .with_cover_art(Arc::new(NoCoverArt));

        let daemon = FakeDaemon::default();
        daemon.set_reachable(true);

        let library = Arc::new(LocalLibrary::new(pool));
        let controller = Arc::new(PlaybackController::new(
            Arc::new(daemon.clone()),
            library.clone(),
            // The daemon mounts the library somewhere else
            MediaRoot::new(library_dir).with_device_root("/var/lib/mpd/music"),
            PlaybackConfig {
                timeout: Duration::from_millis(200),
                reconnect_backoff: Duration::from_millis(1),
            },
        ));

        let state = AppState::new(library, controller, Arc::new(ingester));

        Self {
            router: create_router(state.clone()),
            state,
            daemon,
            alice,
            bob,
            _temp_dir: temp_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, user: &str) -> Response<Body> {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .header(USER_HEADER, user)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// POST a multipart upload with one `file` part
    pub async fn upload(&self, user: &str, filename: &str, content: &[u8]) -> Response<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nignored\r\n\
                 --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                b = BOUNDARY,
                f = filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(USER_HEADER, user)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Upload a song and return its id
    pub async fn song(&self, artist: &str, title: &str) -> i64 {
        let response = self
            .upload("alice", &format!("{}.mp3", title), &audio(artist, title))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["id"].as_i64().unwrap()
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
