//! Relay of parsed files to a [`FileStore`].

use crate::errors::Result;
use crate::form::FileEntry;
use crate::shopify::{FileStore, UploadedUrl};
use futures::{StreamExt, TryStreamExt, stream};
use tracing::{Instrument, error, info, info_span};

/// Uploads every entry and returns the URLs in input order.
///
/// At most `concurrency` uploads are in flight; with `1` the next upload starts only after
/// the previous one has finished. The first failure, in input order, is returned and every
/// other upload still pending is dropped. Files already created remotely are left there.
pub async fn relay_files(store: &dyn FileStore, entries: &[FileEntry], concurrency: usize) -> Result<Vec<UploadedUrl>> {
    let total = entries.len();

    // Collected first; mapping inside the stream fails the handler's higher-ranked Send bound
    let uploads: Vec<_> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| upload_one(store, index, total, entry))
        .collect();

    let urls: Vec<UploadedUrl> = stream::iter(uploads)
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    info!(files = urls.len(), "All files relayed");
    Ok(urls)
}

async fn upload_one(store: &dyn FileStore, index: usize, total: usize, entry: &FileEntry) -> Result<UploadedUrl> {
    let span = info_span!("relay_file", file_index = index, filename = %entry.filename, field = %entry.field);

    async move {
        info!(size = entry.content.len(), "Uploading file {}/{}", index + 1, total);
        store.create_file(&entry.filename, &entry.content).await.inspect_err(|e| {
            error!(error = %e, "Upload aborted");
        })
    }
    .instrument(span)
    .await
}
