//! MPD device on top of the `mpd` client crate
//!
//! The client is blocking, so every exchange runs on the blocking pool with the
//! connection moved in and handed back afterwards. Socket read and write
//! deadlines bound each exchange. When an exchange fails at the connection level
//! the client is not handed back; the device then reports itself broken and the
//! controller reconnects.

use crate::device::{DeviceConnector, MediaQueueDevice};
use crate::error::{PlaybackError, Result};
use crate::types::{DeviceStatus, QueueFlag, TrackDescriptor, TransportState};
use async_trait::async_trait;
use juicebox_core::QueueRef;
use mpd::error::Error as MpdError;
use mpd::status::{State, Status};
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default MPD TCP port
pub const DEFAULT_PORT: u16 = 6600;

/// Where the daemon listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAddress {
    /// `host:port` (port defaults to 6600)
    Tcp(String),
    /// Absolute path of a Unix socket
    Unix(PathBuf),
}

impl FromStr for DeviceAddress {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PlaybackError::InvalidArgument(
                "device address must not be empty".to_string(),
            ));
        }
        if s.starts_with('/') {
            return Ok(DeviceAddress::Unix(PathBuf::from(s)));
        }
        if s.contains(':') {
            Ok(DeviceAddress::Tcp(s.to_string()))
        } else {
            Ok(DeviceAddress::Tcp(format!("{}:{}", s, DEFAULT_PORT)))
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceAddress::Tcp(addr) => f.write_str(addr),
            DeviceAddress::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Byte stream to the daemon with read and write deadlines applied
#[derive(Debug)]
pub enum Socket {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Socket {
    fn open(address: &DeviceAddress, timeout: Duration) -> io::Result<Self> {
        let socket = match address {
            DeviceAddress::Tcp(addr) => Socket::Tcp(connect_tcp(addr, timeout)?),
            #[cfg(unix)]
            DeviceAddress::Unix(path) => {
                Socket::Unix(std::os::unix::net::UnixStream::connect(path)?)
            }
            #[cfg(not(unix))]
            DeviceAddress::Unix(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "unix sockets are not supported on this platform",
                ))
            }
        };

        match &socket {
            Socket::Tcp(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
            }
            #[cfg(unix)]
            Socket::Unix(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
            }
        }
        Ok(socket)
    }
}

fn connect_tcp(addr: &str, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_error = None;
    for candidate in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing")
    }))
}

impl Read for Socket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Socket::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Socket::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Socket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Socket::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Socket::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Socket::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Socket::Unix(stream) => stream.flush(),
        }
    }
}

type Client = mpd::Client<Socket>;

/// Opens [`MpdDevice`] connections
#[derive(Debug, Clone)]
pub struct MpdConnector {
    address: DeviceAddress,
    timeout: Duration,
}

impl MpdConnector {
    pub fn new(address: DeviceAddress, timeout: Duration) -> Self {
        Self { address, timeout }
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }
}

#[async_trait]
impl DeviceConnector for MpdConnector {
    async fn connect(&self) -> Result<Box<dyn MediaQueueDevice>> {
        let device = MpdDevice::connect(&self.address, self.timeout).await?;
        Ok(Box::new(device))
    }
}

/// One connection to an MPD daemon
pub struct MpdDevice {
    /// `None` once a connection-level failure left the stream in an unknown state
    client: Option<Client>,
    timeout: Duration,
    version: String,
}

impl MpdDevice {
    /// Connect and read the greeting
    pub async fn connect(address: &DeviceAddress, timeout: Duration) -> Result<Self> {
        tracing::debug!(address = %address, "Connecting to MPD");

        let target = address.clone();
        let client = tokio::task::spawn_blocking(move || -> Result<Client> {
            let socket = Socket::open(&target, timeout)
                .map_err(|e| PlaybackError::Unavailable(format!("{}: {}", target, e)))?;
            Client::new(socket).map_err(|e| map_error(e, timeout))
        })
        .await
        .map_err(|e| PlaybackError::Unavailable(format!("MPD connect task failed: {}", e)))??;

        let mpd::Version(major, minor, patch) = client.version;
        let version = format!("{}.{}.{}", major, minor, patch);
        tracing::info!(address = %address, version = %version, "Connected to MPD");

        Ok(Self {
            client: Some(client),
            timeout,
            version,
        })
    }

    /// Protocol version announced by the daemon
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Run one exchange on the blocking pool
    async fn call<T, F>(&mut self, command: &'static str, exchange: F) -> Result<T>
    where
        F: FnOnce(&mut Client) -> std::result::Result<T, MpdError> + Send + 'static,
        T: Send + 'static,
    {
        let mut client = self
            .client
            .take()
            .ok_or_else(|| PlaybackError::Unavailable("connection is broken".to_string()))?;

        tracing::trace!(command, "MPD request");
        let timeout = self.timeout;
        let (client, result) = tokio::task::spawn_blocking(move || {
            let result = exchange(&mut client);
            (client, result)
        })
        .await
        .map_err(|e| PlaybackError::Unavailable(format!("MPD {} task failed: {}", command, e)))?;

        let result = result.map_err(|e| map_error(e, timeout));
        match &result {
            Err(e) if e.is_connection_failure() => {
                tracing::debug!(command, error = %e, "MPD connection broken");
            }
            _ => self.client = Some(client),
        }
        result
    }
}

/// Translate client errors; only `Server` (an ACK) keeps the connection usable
fn map_error(err: MpdError, timeout: Duration) -> PlaybackError {
    match err {
        MpdError::Io(e)
            if matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ) =>
        {
            PlaybackError::Timeout(timeout)
        }
        MpdError::Io(e) => PlaybackError::Unavailable(e.to_string()),
        MpdError::Server(e) => PlaybackError::Rejected {
            command: e.command,
            message: e.detail,
        },
        other => PlaybackError::Protocol(other.to_string()),
    }
}

/// Line breaks would end the command early
fn check_arg(arg: &str) -> Result<()> {
    if arg.contains('\n') || arg.contains('\r') {
        return Err(PlaybackError::InvalidArgument(format!(
            "argument contains a line break: {:?}",
            arg
        )));
    }
    Ok(())
}

fn song_ref(uri: &QueueRef) -> mpd::Song {
    mpd::Song {
        file: uri.as_str().to_string(),
        ..mpd::Song::default()
    }
}

fn device_status(status: &Status) -> DeviceStatus {
    DeviceStatus {
        state: match status.state {
            State::Play => TransportState::Play,
            State::Pause => TransportState::Pause,
            State::Stop => TransportState::Stop,
        },
        // -1 when the daemon has no mixer
        volume: u32::try_from(status.volume).ok(),
        consume: status.consume,
        random: status.random,
        repeat: status.repeat,
        single: status.single,
        queue_length: status.queue_len,
        song_position: status.song.as_ref().map(|place| place.pos),
        elapsed: status.elapsed.map(|d| d.as_secs_f64()),
        duration: status
            .duration
            .or_else(|| status.time.map(|(_, total)| total))
            .map(|d| d.as_secs_f64()),
    }
}

fn track(song: mpd::Song) -> TrackDescriptor {
    let album = song
        .tags
        .iter()
        .find(|(key, _)| key.as_str() == "Album")
        .map(|(_, value)| value.to_string());
    TrackDescriptor {
        title: song.title,
        artist: song.artist,
        album,
        position: song.place.as_ref().map(|place| place.pos),
        id: song.place.as_ref().map(|place| place.id.0),
        duration: song.duration.map(|d| d.as_secs_f64()),
        file: song.file,
    }
}

#[async_trait]
impl MediaQueueDevice for MpdDevice {
    async fn set_flag(&mut self, flag: QueueFlag, on: bool) -> Result<()> {
        self.call(flag.command(), move |client| match flag {
            QueueFlag::Consume => client.consume(on),
            QueueFlag::Random => client.random(on),
            QueueFlag::Repeat => client.repeat(on),
            QueueFlag::Single => client.single(on),
        })
        .await
    }

    async fn clear(&mut self) -> Result<()> {
        self.call("clear", |client| client.clear()).await
    }

    async fn add(&mut self, uri: &QueueRef) -> Result<()> {
        check_arg(uri.as_str())?;
        let song = song_ref(uri);
        self.call("addid", move |client| client.push(song).map(drop))
            .await
    }

    async fn add_all(&mut self, uris: &[QueueRef]) -> Result<()> {
        for uri in uris {
            check_arg(uri.as_str())?;
        }
        if uris.is_empty() {
            return Ok(());
        }
        let songs: Vec<mpd::Song> = uris.iter().map(song_ref).collect();
        self.call("addid", move |client| {
            for song in songs {
                client.push(song)?;
            }
            Ok(())
        })
        .await
    }

    async fn status(&mut self) -> Result<DeviceStatus> {
        self.call("status", |client| client.status())
            .await
            .map(|status| device_status(&status))
    }

    async fn current_track(&mut self) -> Result<Option<TrackDescriptor>> {
        self.call("currentsong", |client| client.currentsong())
            .await
            .map(|song| song.map(track))
    }

    async fn queue(&mut self) -> Result<Vec<TrackDescriptor>> {
        self.call("playlistinfo", |client| client.queue())
            .await
            .map(|songs| songs.into_iter().map(track).collect())
    }

    async fn play(&mut self) -> Result<()> {
        self.call("play", |client| client.play()).await
    }

    async fn pause(&mut self) -> Result<()> {
        self.call("pause", |client| client.pause(true)).await
    }

    async fn stop(&mut self) -> Result<()> {
        self.call("stop", |client| client.stop()).await
    }

    async fn previous(&mut self) -> Result<()> {
        self.call("previous", |client| client.prev()).await
    }

    async fn next(&mut self) -> Result<()> {
        self.call("next", |client| client.next()).await
    }

    async fn seek(&mut self, position: Duration) -> Result<()> {
        self.call("seekcur", move |client| client.rewind(position))
            .await
    }
}
