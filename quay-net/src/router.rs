//! Message router: decodes one inbound envelope per frame and dispatches
//! it against the registry and the file store.
//!
//! Every client-facing failure is a unicast `error` envelope — never a
//! broadcast, never fatal to the hub. Dispatch is a pure function of the
//! current hub state and the inbound envelope.

use quay_files::StoreError;
use quay_protocol::envelope::{
    decode_content, decode_envelope, encode_content, encode_envelope, Envelope,
};
use quay_protocol::types::PeerId;

use crate::connection::ConnId;
use crate::fanout;
use crate::hub::HubState;

/// Extensions (with dot, lowercase) the hub will inline-preview.
const PREVIEWABLE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".pdf"];

/// Decode and dispatch one inbound frame.
pub(crate) async fn dispatch(state: &mut HubState, conn_id: ConnId, text: &str) {
    let envelope = match decode_envelope(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(%conn_id, error = %e, "malformed message");
            send_error(state, conn_id, "malformed message");
            return;
        }
    };

    match envelope {
        Envelope::Register { peer_id } => handle_register(state, conn_id, &peer_id).await,
        Envelope::FileListRequest => send_file_list(state, conn_id).await,
        Envelope::FileRequest { filename } => handle_file_request(state, conn_id, &filename).await,
        Envelope::FileUpload {
            filename,
            file_content,
        } => handle_file_upload(state, conn_id, &filename, &file_content).await,
        Envelope::FilePreview { filename } => handle_file_preview(state, conn_id, &filename).await,
        Envelope::Chat { sender, content } => {
            tracing::debug!(sender = %sender, "relaying chat");
            fanout::broadcast(
                &state.registry,
                &state.connections,
                &Envelope::Chat { sender, content },
            );
        }
        // Hub-to-client types arriving inbound are as unknown as an
        // unrecognized tag.
        other => {
            tracing::debug!(%conn_id, envelope = ?other, "unknown request type");
            send_error(state, conn_id, "Unknown request type");
        }
    }
}

async fn handle_register(state: &mut HubState, conn_id: ConnId, raw_id: &str) {
    let Some(peer_id) = PeerId::new(raw_id) else {
        send_error(state, conn_id, "invalid peer ID");
        return;
    };

    // One peer per connection handle.
    if let Some(existing) = state.registry.identifier_for(conn_id) {
        tracing::debug!(%conn_id, peer = %existing, "connection already registered");
        send_error(state, conn_id, "connection already registered");
        return;
    }

    if state.registry.register(peer_id.clone(), conn_id).is_err() {
        tracing::debug!(peer = %peer_id, %conn_id, "identifier conflict");
        send_error(state, conn_id, "PeerID already taken");
        return;
    }

    tracing::info!(peer = %peer_id, %conn_id, "peer registered");

    let peers = state
        .registry
        .peers()
        .iter()
        .map(|p| p.to_string())
        .collect();
    fanout::broadcast(
        &state.registry,
        &state.connections,
        &Envelope::PeerList { peers },
    );
    send_file_list(state, conn_id).await;
}

async fn send_file_list(state: &HubState, conn_id: ConnId) {
    match state.store.list().await {
        Ok(files) => send_to(state, conn_id, &Envelope::FileList { files }),
        Err(e) => {
            tracing::error!(%conn_id, error = %e, "failed to list file store");
            send_error(state, conn_id, "failed to list files");
        }
    }
}

async fn handle_file_request(state: &HubState, conn_id: ConnId, filename: &str) {
    match state.store.read(filename).await {
        Ok(bytes) => send_to(
            state,
            conn_id,
            &Envelope::FileResponse {
                filename: filename.to_string(),
                file_content: encode_content(&bytes),
            },
        ),
        Err(StoreError::NotFound(_)) => {
            send_error(state, conn_id, &format!("File not found: {filename}"));
        }
        Err(StoreError::InvalidName(_)) => {
            send_error(state, conn_id, &format!("invalid filename: {filename}"));
        }
        Err(e) => {
            tracing::error!(file = %filename, error = %e, "file read failed");
            send_error(state, conn_id, &format!("failed to read file: {filename}"));
        }
    }
}

async fn handle_file_upload(state: &mut HubState, conn_id: ConnId, filename: &str, content: &str) {
    let bytes = match decode_content(content) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(%conn_id, file = %filename, error = %e, "bad upload encoding");
            send_error(state, conn_id, "invalid file content encoding");
            return;
        }
    };

    if bytes.len() as u64 > state.max_file_size {
        tracing::warn!(
            %conn_id,
            file = %filename,
            size = bytes.len(),
            limit = state.max_file_size,
            "upload exceeds size limit"
        );
        send_error(state, conn_id, &format!("file too large: {filename}"));
        return;
    }

    match state.store.write(filename, &bytes).await {
        Ok(()) => {
            tracing::info!(file = %filename, size = bytes.len(), "file uploaded");
            fanout::broadcast(
                &state.registry,
                &state.connections,
                &Envelope::FileListUpdate,
            );
        }
        Err(StoreError::InvalidName(_)) => {
            send_error(state, conn_id, &format!("invalid filename: {filename}"));
        }
        Err(e) => {
            // No change signal goes out for a failed write; the uploader
            // hears about it directly.
            tracing::error!(file = %filename, error = %e, "file upload failed");
            send_error(state, conn_id, &format!("failed to store file: {filename}"));
        }
    }
}

async fn handle_file_preview(state: &HubState, conn_id: ConnId, filename: &str) {
    // Existence is checked before the format gate: a missing file is an
    // error even for formats the hub would refuse to preview.
    match state.store.contains(filename).await {
        Ok(true) => {}
        Ok(false) => {
            send_error(state, conn_id, &format!("File not found: {filename}"));
            return;
        }
        Err(StoreError::InvalidName(_)) => {
            send_error(state, conn_id, &format!("invalid filename: {filename}"));
            return;
        }
        Err(e) => {
            tracing::error!(file = %filename, error = %e, "preview stat failed");
            send_error(state, conn_id, &format!("failed to read file: {filename}"));
            return;
        }
    }

    let Some(format) = preview_format(filename) else {
        send_to(
            state,
            conn_id,
            &Envelope::FilePreviewResponse {
                filename: filename.to_string(),
                content: None,
                format: None,
                message: Some(
                    "Preview not supported for this file type. Please download.".to_string(),
                ),
            },
        );
        return;
    };

    match state.store.read(filename).await {
        Ok(bytes) => send_to(
            state,
            conn_id,
            &Envelope::FilePreviewResponse {
                filename: filename.to_string(),
                content: Some(encode_content(&bytes)),
                format: Some(format),
                message: None,
            },
        ),
        Err(e) => {
            tracing::error!(file = %filename, error = %e, "preview read failed");
            send_error(state, conn_id, &format!("failed to read file: {filename}"));
        }
    }
}

/// The dotted lowercase extension if the file is previewable.
fn preview_format(filename: &str) -> Option<String> {
    let ext = std::path::Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    let dotted = format!(".{ext}");
    PREVIEWABLE_EXTENSIONS
        .contains(&dotted.as_str())
        .then_some(dotted)
}

/// Unicast an envelope to one connection, best effort.
fn send_to(state: &HubState, conn_id: ConnId, envelope: &Envelope) {
    let Some(tx) = state.connections.get(&conn_id) else {
        tracing::debug!(%conn_id, "send to unknown connection");
        return;
    };
    match encode_envelope(envelope) {
        Ok(text) => {
            if tx.send(text).is_err() {
                tracing::debug!(%conn_id, "connection closed, dropping message");
            }
        }
        Err(e) => tracing::error!(error = %e, "failed to encode envelope"),
    }
}

fn send_error(state: &HubState, conn_id: ConnId, message: &str) {
    send_to(
        state,
        conn_id,
        &Envelope::Error {
            message: message.to_string(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_format_accepts_listed_extensions() {
        assert_eq!(preview_format("photo.jpg").as_deref(), Some(".jpg"));
        assert_eq!(preview_format("photo.jpeg").as_deref(), Some(".jpeg"));
        assert_eq!(preview_format("icon.png").as_deref(), Some(".png"));
        assert_eq!(preview_format("report.pdf").as_deref(), Some(".pdf"));
    }

    #[test]
    fn preview_format_is_case_insensitive() {
        assert_eq!(preview_format("PHOTO.PNG").as_deref(), Some(".png"));
        assert_eq!(preview_format("Report.Pdf").as_deref(), Some(".pdf"));
    }

    #[test]
    fn preview_format_rejects_everything_else() {
        assert_eq!(preview_format("data.csv"), None);
        assert_eq!(preview_format("archive.tar.gz"), None);
        assert_eq!(preview_format("no_extension"), None);
        assert_eq!(preview_format(".hidden"), None);
    }
}
