// Saving binary responses to disk
//
// Bodies are streamed into a temporary file created in the destination
// directory, then renamed into place. A failure at any point drops the
// temporary file, which deletes it. Chunk writes go through the page
// cache and stay on the async task; the fsync and rename run on the
// blocking pool.

use std::io::Write;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Error;

/// Stream `resp` into `dir/file_name` and return the final path.
pub(crate) async fn save_response(
    resp: reqwest::Response,
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf, Error> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    let mut written: u64 = 0;

    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        tmp.write_all(&chunk)?;
        written += chunk.len() as u64;
    }

    let target = dir.join(file_name);
    let persisted = target.clone();
    tokio::task::spawn_blocking(move || -> Result<(), Error> {
        tmp.as_file().sync_all()?;
        tmp.persist(&persisted).map_err(|e| Error::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::other(e)))??;
    debug!(path = %target.display(), bytes = written, "download saved");
    Ok(target)
}

/// File name announced by `Content-Disposition`, reduced to a bare name.
pub(crate) fn attachment_name(resp: &reqwest::Response) -> Option<String> {
    let header = resp.headers().get(CONTENT_DISPOSITION)?.to_str().ok()?;
    parse_disposition_filename(header)
}

fn parse_disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    for part in header.split(';').map(str::trim) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            // RFC 5987 form: filename*=UTF-8''name
            "filename*" => {
                if let Some((_, encoded)) = value.split_once("''") {
                    let decoded: String = url::form_urlencoded::parse(format!("n={encoded}").as_bytes())
                        .map(|(_, v)| v.into_owned())
                        .next()
                        .unwrap_or_default();
                    if let Some(name) = sanitize(&decoded) {
                        return Some(name);
                    }
                }
            }
            "filename" => plain = sanitize(value.trim().trim_matches('"')),
            _ => {}
        }
    }
    plain
}

/// Strip any directory components so a hostile header cannot escape the
/// destination directory.
fn sanitize(raw: &str) -> Option<String> {
    let last = raw.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_owned())
}
