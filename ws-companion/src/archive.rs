//! Tar import/export of the workspace tree.
//!
//! Archive work is blocking, so the HTTP layer runs it on the blocking pool
//! and bridges the byte stream through a channel in either direction.

use std::io::{self, Read, Write};

use bytes::{Buf, Bytes};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tokio::sync::mpsc;

use crate::files::{EntryKind, FileStore};
use ws_core::{Result, WsError};

/// Compiles download filter patterns into a matcher over root-relative
/// paths. Patterns use `**` to cross directories; a plain `*` stays within
/// one path segment. A leading `/` is stripped so `/src/**` and `src/**`
/// select the same files.
pub fn build_filter(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern.trim_start_matches('/'))
            .literal_separator(true)
            .build()
            .map_err(|e| WsError::PathValidation(format!("invalid filter pattern: {e}")))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| WsError::PathValidation(format!("invalid filter: {e}")))?;
    Ok(Some(set))
}

/// Writes the workspace tree as an uncompressed tar archive. When a filter
/// is given, only matching entries are included.
pub fn write_archive<W: Write>(
    store: &FileStore,
    filter: Option<&GlobSet>,
    writer: W,
) -> Result<()> {
    let mut builder = tar::Builder::new(writer);
    for entry in store.walk()? {
        if let Some(set) = filter {
            if !set.is_match(&entry.path) {
                continue;
            }
        }
        let abs = store.root().join(&entry.path);
        match entry.kind {
            EntryKind::Directory => builder.append_dir(&entry.path, &abs)?,
            EntryKind::File => builder.append_path_with_name(&abs, &entry.path)?,
        }
    }
    let mut inner = builder.into_inner()?;
    inner.flush()?;
    Ok(())
}

/// Replaces the workspace tree with the archive content. The existing tree
/// is purged first; an entry that would escape the root aborts the import.
///
/// Only regular files and directories materialize. Link entries are
/// dropped: a symlink pointing outside the root would let every later
/// entry underneath it write past the confinement check.
pub fn extract_archive<R: Read>(store: &FileStore, reader: R) -> Result<()> {
    store.purge()?;
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let raw = entry.path()?.to_string_lossy().into_owned();
        let dest = store.resolve(&raw)?;
        let kind = entry.header().entry_type();
        if kind.is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else if matches!(
            kind,
            tar::EntryType::Regular | tar::EntryType::Continuous | tar::EntryType::GNUSparse
        ) {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            entry.unpack(&dest)?;
        } else {
            tracing::debug!(path = %raw, ?kind, "dropping non-file archive entry");
        }
    }
    Ok(())
}

/// `io::Write` half of an async bridge: each write becomes one chunk on the
/// channel. Fails with `BrokenPipe` once the consumer is gone, which aborts
/// the blocking archive task instead of filling an unbounded buffer.
pub struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl ChannelWriter {
    pub fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self { tx }
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "download aborted"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// `io::Read` half of the bridge: chunks pushed by the async side are
/// handed to the blocking tar reader. A closed channel reads as EOF.
pub struct ChannelReader {
    rx: mpsc::Receiver<Bytes>,
    pending: Bytes,
}

impl ChannelReader {
    pub fn new(rx: mpsc::Receiver<Bytes>) -> Self {
        Self {
            rx,
            pending: Bytes::new(),
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pending.is_empty() {
            match self.rx.blocking_recv() {
                Some(chunk) => self.pending = chunk,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}
