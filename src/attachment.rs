//! Attachment resolution: binary speech audio referenced by Speak directives.

use std::io::Read;

/// A readable byte source for one attachment.
///
/// A reader is opened when playback starts and dropped when the utterance
/// retires; the media player owns it in between.
pub trait AttachmentReader: Read + Send {}

impl<T: Read + Send> AttachmentReader for T {}

/// Resolves attachment references from directive payloads to byte sources.
pub trait AttachmentStore: Send + Sync {
    /// Open a reader over the attachment with the given identifier, or None
    /// when the identifier is unknown or the data is gone.
    fn open(&self, attachment_id: &str) -> Option<Box<dyn AttachmentReader>>;
}
