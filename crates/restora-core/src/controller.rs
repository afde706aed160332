//! The session controller.
//!
//! Owns the single `SessionState`, turns user intents into transitions and
//! drives the two suspending collaborators: the file reader and the
//! restoration service. The state lock is never held across an await, so
//! `reset` and `snapshot` stay responsive while a request is in flight.
//!
//! Every upload, restoration and reset bumps a generation counter. Results
//! that come back for an older generation are dropped instead of overwriting
//! whatever the user has done since. A reset does not cancel the service
//! call, so the controller tracks the outstanding request separately and
//! refuses to dispatch another until it settles.

use crate::download::{download_file_name, write_download};
use crate::error::{Result, SessionError, messages};
use crate::file_reader::{FileReader, LocalFileReader, SelectedFile};
use crate::state::{Event, Phase, SessionState};
use parking_lot::Mutex;
use restora_abstraction::{RestorationRequest, RestorationResponse, RestorationService, ServiceError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Instruction sent alongside every image.
pub const RESTORATION_INSTRUCTION: &str = "Restore and colorize this photo with ultra-high quality. \
Remove all scratches, dust, stains, creases and other defects. Sharpen facial details and \
features, enhance texture and brightness, and apply natural, realistic colors throughout. \
Preserve the authenticity and character of the original photograph.";

/// A dispatched restoration request, tagged with the generation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorationTicket {
    generation: u64,
    request: RestorationRequest,
}

impl RestorationTicket {
    /// The request to send to the service.
    pub fn request(&self) -> &RestorationRequest {
        &self.request
    }

    /// Generation this ticket was issued for.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    generation: u64,
    /// Generation of the request still awaiting the service, if any.
    in_flight: Option<u64>,
}

impl Inner {
    fn apply(&mut self, event: Event) {
        if matches!(event, Event::UploadStarted | Event::RestoreStarted | Event::Reset) {
            self.generation += 1;
        }
        self.state = self.state.apply(event);
    }

    fn settle(&mut self, generation: u64) {
        if self.in_flight == Some(generation) {
            self.in_flight = None;
        }
    }
}

/// Coordinates uploads, restorations, downloads and resets for one session.
pub struct SessionController {
    service: Arc<dyn RestorationService>,
    reader: Arc<dyn FileReader>,
    instruction: String,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SessionController")
            .field("model_id", &self.service.model_id())
            .field("phase", &inner.state.phase())
            .field("generation", &inner.generation)
            .field("in_flight", &inner.in_flight)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Creates a controller with an empty session that reads local files.
    pub fn new(service: Arc<dyn RestorationService>) -> Self {
        Self {
            service,
            reader: Arc::new(LocalFileReader),
            instruction: RESTORATION_INSTRUCTION.to_string(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Replaces the file reader.
    #[must_use]
    pub fn with_reader(mut self, reader: Arc<dyn FileReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Replaces the restoration instruction.
    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    /// The current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.inner.lock().state.phase()
    }

    /// The restoration service in use.
    pub fn service(&self) -> &Arc<dyn RestorationService> {
        &self.service
    }

    /// Starts a new session with `file`.
    ///
    /// The previous session is cleared before the file is read. On failure the
    /// session stays empty and carries the read error.
    pub async fn upload(&self, file: SelectedFile) -> Result<()> {
        let generation = {
            let mut inner = self.inner.lock();
            inner.apply(Event::UploadStarted);
            inner.generation
        };
        info!(file = %file.name, generation, "Reading uploaded image");

        let result = self.reader.read(&file).await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(file = %file.name, generation, "Discarding stale upload");
            return Err(SessionError::Superseded);
        }

        match result {
            Ok(image) => {
                inner.apply(Event::UploadSucceeded { image, file_name: file.name });
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to read uploaded image");
                inner.apply(Event::UploadFailed { message: messages::FILE_READ_FAILED.to_string() });
                Err(SessionError::FileRead(e))
            }
        }
    }

    /// Checks preconditions and moves the session into `Restoring`.
    ///
    /// Nothing is sent; the caller dispatches the returned ticket and hands
    /// the outcome to [`Self::complete_restoration`].
    pub fn begin_restoration(&self) -> Result<RestorationTicket> {
        let mut inner = self.inner.lock();

        if let Some(outstanding) = inner.in_flight {
            warn!(outstanding, generation = inner.generation, "Restoration already in progress");
            return Err(SessionError::Busy);
        }

        let Some(image) = inner.state.original_image.clone() else {
            inner.apply(Event::RestoreRejected { message: messages::PRECONDITION_FAILED.to_string() });
            return Err(SessionError::MissingImage);
        };

        if !self.service.has_credential() {
            warn!(model_id = %self.service.model_id(), "No API key configured");
            inner.apply(Event::RestoreRejected { message: messages::PRECONDITION_FAILED.to_string() });
            return Err(SessionError::MissingCredential);
        }

        inner.apply(Event::RestoreStarted);
        inner.in_flight = Some(inner.generation);
        Ok(RestorationTicket {
            generation: inner.generation,
            request: RestorationRequest::new(image, self.instruction.clone()),
        })
    }

    /// Applies the outcome of a dispatched ticket.
    ///
    /// The ticket stops counting as outstanding either way. Returns
    /// `SessionError::Superseded` without touching state if the session moved
    /// on since the ticket was issued.
    pub fn complete_restoration(
        &self,
        ticket: &RestorationTicket,
        result: std::result::Result<RestorationResponse, ServiceError>,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.settle(ticket.generation);
        if inner.generation != ticket.generation {
            info!(
                ticket = ticket.generation,
                current = inner.generation,
                "Discarding stale restoration result"
            );
            return Err(SessionError::Superseded);
        }

        match result {
            Ok(response) => {
                if let Some(image) = response.first_image() {
                    info!(mime_type = %image.mime_type, bytes = image.byte_len(), "Image restored");
                    inner.apply(Event::RestoreSucceeded { image: image.clone() });
                    Ok(())
                } else {
                    let reason = response.finish_reason.clone().or_else(|| response.text());
                    warn!(reason = ?reason, "Service returned no image");
                    inner.apply(Event::RestoreFailed {
                        message: messages::NO_IMAGE_RETURNED.to_string(),
                    });
                    Err(SessionError::Refused { reason })
                }
            }
            Err(e) => {
                warn!(error = %e, "Restoration request failed");
                let err = SessionError::Service(e);
                inner.apply(Event::RestoreFailed { message: err.user_message() });
                Err(err)
            }
        }
    }

    /// Sends the uploaded image to the restoration service.
    ///
    /// At most one request is in flight, even across resets and new uploads;
    /// a second call returns `SessionError::Busy` and leaves the session
    /// untouched.
    pub async fn request_restoration(&self) -> Result<()> {
        let ticket = self.begin_restoration()?;
        debug!(
            generation = ticket.generation,
            model_id = %self.service.model_id(),
            "Dispatching restoration"
        );

        let mut guard = LoadingGuard { controller: self, generation: ticket.generation, armed: true };
        let result = self.service.restore(&ticket.request).await;
        guard.armed = false;

        self.complete_restoration(&ticket, result)
    }

    /// Saves the restored image into `dir`.
    ///
    /// Returns `Ok(None)` without writing anything when there is no restored image.
    pub async fn download(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let (image, original_name) = {
            let inner = self.inner.lock();
            match &inner.state.restored_image {
                Some(image) => (image.clone(), inner.state.file_name.clone()),
                None => {
                    debug!("Nothing to download");
                    return Ok(None);
                }
            }
        };

        let file_name = download_file_name(original_name.as_deref(), &image.mime_type);
        write_download(dir, &file_name, &image).await.map(Some)
    }

    /// Clears the session.
    ///
    /// An in-flight request is not aborted; its result is discarded when it
    /// arrives, and no new restoration starts until then.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.apply(Event::Reset);
        debug!(generation = inner.generation, "Session reset");
    }
}

/// Releases the request slot, and clears `is_loading`, if the restoration
/// future is dropped before completing.
struct LoadingGuard<'a> {
    controller: &'a SessionController,
    generation: u64,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.controller.inner.lock();
        inner.settle(self.generation);
        if inner.generation == self.generation && inner.state.is_loading {
            warn!(generation = self.generation, "Restoration dropped before completion");
            inner.apply(Event::RestoreAbandoned);
        }
    }
}
