//! Remote source archive: a gzipped tarball fetched over HTTP.
//!
//! The response body is decoded on a producer thread and handed to the pass
//! through a bounded channel, so the pipeline pulls entries lazily and memory
//! stays bounded by the channel size plus one file. Dropping the stream
//! disconnects the channel and the producer stops at its next send.

use std::io::{self, Read};
use std::sync::mpsc::{self, SyncSender};
use std::thread;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::StatusCode;

use super::{EntrySource, EntryStream};
use crate::error::{FikiError, Result};
use crate::ingest::entry::{strip_root_segment, SourceEntry};

/// Entries buffered between the decoder thread and the pass
const ENTRY_BUFFER: usize = 64;

/// Upper bound on the buffer reserved up front from a header's size field
const PREALLOC_LIMIT: u64 = 1 << 20;

/// Tarball fetched over HTTP on every pass
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    url: String,
    timeout: Duration,
}

impl ArchiveSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl EntrySource for ArchiveSource {
    fn entries(&self) -> Result<EntryStream> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("fiki/", env!("CARGO_PKG_VERSION")))
            .build()?;

        log::info!("Fetching wiki tarball from {}", self.url);
        let response = client.get(&self.url).send()?;

        if response.status() != StatusCode::OK {
            return Err(FikiError::SourceStatus {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        Ok(archive_entries(response))
    }

    fn describe(&self) -> String {
        format!("archive {}", self.url)
    }
}

/// Decode a gzipped tarball into a lazy entry stream.
///
/// The first path segment of every entry (the archive's wrapper directory) is
/// stripped. Only regular files and directories come out; links, devices and
/// PAX headers are dropped. A gzip or tar error, a truncated entry or a gzip
/// checksum mismatch ends the stream with `Err`.
pub fn archive_entries<R>(reader: R) -> EntryStream
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(ENTRY_BUFFER);

    thread::spawn(move || {
        if let Err(e) = decode_archive(reader, &tx) {
            let _ = tx.send(Err(e));
        }
    });

    Box::new(rx.into_iter())
}

fn decode_archive<R: Read>(reader: R, tx: &SyncSender<Result<SourceEntry>>) -> Result<()> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let entries = archive
        .entries()
        .map_err(|e| FikiError::Archive(format!("failed to open tar stream: {}", e)))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| FikiError::Archive(format!("error reading tar file: {}", e)))?;

        let Some(source_entry) = read_entry(&mut entry)? else {
            continue;
        };

        if tx.send(Ok(source_entry)).is_err() {
            log::debug!("Archive stream dropped by consumer, stopping decode");
            return Ok(());
        }
    }

    // The tar reader stops at the end-of-archive marker; the gzip checksum is
    // only verified once the trailer is read
    let mut decoder = archive.into_inner();
    io::copy(&mut decoder, &mut io::sink())
        .map_err(|e| FikiError::Archive(format!("corrupt gzip stream: {}", e)))?;

    Ok(())
}

fn read_entry<R: Read>(entry: &mut tar::Entry<'_, R>) -> Result<Option<SourceEntry>> {
    let entry_type = entry.header().entry_type();
    if !entry_type.is_dir() && !entry_type.is_file() {
        return Ok(None);
    }

    let raw_path = match entry.path() {
        Ok(path) => path.to_string_lossy().into_owned(),
        Err(e) => {
            log::warn!("Skipping archive entry with unreadable path: {}", e);
            return Ok(None);
        }
    };

    let Some(relative_path) = strip_root_segment(&raw_path) else {
        // The wrapper directory itself is expected; a bare file up there is not
        if entry_type.is_dir() {
            log::debug!("Skipping archive root entry {}", raw_path);
        } else {
            log::warn!("Skipping archive file outside the root folder: {}", raw_path);
        }
        return Ok(None);
    };

    if entry_type.is_dir() {
        return Ok(Some(SourceEntry::directory(relative_path)));
    }

    // The size field is untrusted; the read itself is bounded by the stream
    let mut content = Vec::with_capacity(entry.size().min(PREALLOC_LIMIT) as usize);
    entry
        .read_to_end(&mut content)
        .map_err(|e| FikiError::Archive(format!("error reading {}: {}", raw_path, e)))?;

    Ok(Some(SourceEntry::file(relative_path, content)))
}
