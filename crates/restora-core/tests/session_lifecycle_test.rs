//! Integration tests for the upload → restore → download lifecycle.

use async_trait::async_trait;
use restora_abstraction::{
    ContentPart, EncodedImage, RestorationResponse, RestorationService, ServiceError,
};
use restora_core::{
    FileReadError, FileReader, FileSource, Phase, RESTORATION_INSTRUCTION, SelectedFile,
    SessionController, SessionError, SessionState, messages,
};
use restora_models::MockRestorationService;
use std::sync::Arc;
use tokio::sync::Notify;

const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0 grandma in 1952";

fn grandma() -> SelectedFile {
    SelectedFile::from_bytes("grandma.jpg", JPEG_BYTES.to_vec())
}

fn setup(mock: MockRestorationService) -> (Arc<SessionController>, Arc<MockRestorationService>) {
    let mock = Arc::new(mock);
    (Arc::new(SessionController::new(mock.clone())), mock)
}

async fn wait_for_dispatch(mock: &MockRestorationService) {
    while mock.call_count() == 0 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_upload_then_restore_sends_one_request() {
    let (controller, mock) = setup(MockRestorationService::default());

    controller.upload(grandma()).await.unwrap();
    controller.request_restoration().await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].image.decode().unwrap(), JPEG_BYTES);
    assert_eq!(requests[0].image.mime_type, "image/jpeg");
    assert_eq!(requests[0].instruction, RESTORATION_INSTRUCTION);
}

#[tokio::test]
async fn test_restore_without_upload_never_calls_service() {
    let (controller, mock) = setup(MockRestorationService::default());

    let err = controller.request_restoration().await.unwrap_err();

    assert!(matches!(err, SessionError::MissingImage));
    assert_eq!(mock.call_count(), 0);
    assert_eq!(controller.snapshot().error.as_deref(), Some(messages::PRECONDITION_FAILED));
}

#[tokio::test]
async fn test_text_only_response_fails() {
    let (controller, _mock) =
        setup(MockRestorationService::default().refuse("I cannot edit photos of people."));

    controller.upload(grandma()).await.unwrap();
    let err = controller.request_restoration().await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Refused { reason: Some(ref r) } if r == "I cannot edit photos of people."
    ));
    let state = controller.snapshot();
    assert_eq!(state.phase(), Phase::Failed);
    assert_eq!(state.error.as_deref(), Some(messages::NO_IMAGE_RETURNED));
    assert!(state.restored_image.is_none());
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_empty_response_fails() {
    let (controller, _mock) =
        setup(MockRestorationService::default().respond_with(RestorationResponse::default()));

    controller.upload(grandma()).await.unwrap();
    controller.request_restoration().await.unwrap_err();

    let state = controller.snapshot();
    assert_eq!(state.phase(), Phase::Failed);
    assert!(state.error.as_deref().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn test_first_image_part_wins() {
    let first = EncodedImage::from_bytes(b"first", "image/webp");
    let second = EncodedImage::from_bytes(b"second", "image/png");
    let (controller, _mock) = setup(MockRestorationService::default().respond_with(
        RestorationResponse::from_parts(vec![
            ContentPart::text("Here is the restored photo."),
            ContentPart::image(first.clone()),
            ContentPart::image(second),
        ]),
    ));

    controller.upload(grandma()).await.unwrap();
    controller.request_restoration().await.unwrap();

    let state = controller.snapshot();
    assert_eq!(state.restored_image, Some(first));
    assert_eq!(state.phase(), Phase::Restored);
}

#[tokio::test]
async fn test_loading_spans_request_on_success() {
    let gate = Arc::new(Notify::new());
    let (controller, mock) = setup(MockRestorationService::default().with_gate(gate.clone()));
    controller.upload(grandma()).await.unwrap();
    assert!(!controller.snapshot().is_loading);

    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.request_restoration().await })
    };
    wait_for_dispatch(&mock).await;
    assert!(controller.snapshot().is_loading);
    assert_eq!(controller.phase(), Phase::Restoring);

    gate.notify_one();
    task.await.unwrap().unwrap();

    assert!(!controller.snapshot().is_loading);
    assert_eq!(controller.phase(), Phase::Restored);
}

#[tokio::test]
async fn test_loading_spans_request_on_failure() {
    let gate = Arc::new(Notify::new());
    let (controller, mock) = setup(
        MockRestorationService::default()
            .with_gate(gate.clone())
            .fail_with(ServiceError::Request("connection reset".to_string())),
    );
    controller.upload(grandma()).await.unwrap();

    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.request_restoration().await })
    };
    wait_for_dispatch(&mock).await;
    assert!(controller.snapshot().is_loading);

    gate.notify_one();
    task.await.unwrap().unwrap_err();

    let state = controller.snapshot();
    assert!(!state.is_loading);
    assert_eq!(state.phase(), Phase::Failed);
}

#[tokio::test]
async fn test_second_request_while_in_flight_is_rejected() {
    let gate = Arc::new(Notify::new());
    let (controller, mock) = setup(MockRestorationService::default().with_gate(gate.clone()));
    controller.upload(grandma()).await.unwrap();

    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.request_restoration().await })
    };
    wait_for_dispatch(&mock).await;

    let err = controller.request_restoration().await.unwrap_err();
    assert!(matches!(err, SessionError::Busy));
    assert!(controller.snapshot().error.is_none());

    gate.notify_one();
    task.await.unwrap().unwrap();
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_reset_during_flight_discards_late_response() {
    let gate = Arc::new(Notify::new());
    let (controller, mock) = setup(MockRestorationService::default().with_gate(gate.clone()));
    controller.upload(grandma()).await.unwrap();

    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.request_restoration().await })
    };
    wait_for_dispatch(&mock).await;

    controller.reset();
    assert!(controller.snapshot().is_empty());

    gate.notify_one();
    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::Superseded));
    assert_eq!(controller.snapshot(), SessionState::default());
}

#[tokio::test]
async fn test_reset_from_any_state() {
    let (controller, _mock) = setup(
        MockRestorationService::default()
            .fail_with(ServiceError::Request("boom".to_string())),
    );

    controller.reset();
    assert_eq!(controller.snapshot(), SessionState::default());

    controller.upload(grandma()).await.unwrap();
    controller.reset();
    assert_eq!(controller.snapshot(), SessionState::default());

    controller.upload(grandma()).await.unwrap();
    controller.request_restoration().await.unwrap_err();
    assert_eq!(controller.phase(), Phase::Failed);
    controller.reset();
    assert_eq!(controller.snapshot(), SessionState::default());

    controller.upload(grandma()).await.unwrap();
    controller.request_restoration().await.unwrap();
    assert_eq!(controller.phase(), Phase::Restored);
    controller.reset();
    assert_eq!(controller.snapshot(), SessionState::default());
}

#[tokio::test]
async fn test_download_without_result_writes_nothing() {
    let (controller, _mock) = setup(MockRestorationService::default());
    let dir = tempfile::tempdir().unwrap();

    assert_eq!(controller.download(dir.path()).await.unwrap(), None);

    controller.upload(grandma()).await.unwrap();
    assert_eq!(controller.download(dir.path()).await.unwrap(), None);

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_grandma_scenario() {
    let restored = b"restored pixels".to_vec();
    let (controller, _mock) = setup(
        MockRestorationService::default()
            .respond_with_image(EncodedImage::from_bytes(&restored, "image/png")),
    );
    let dir = tempfile::tempdir().unwrap();

    controller.upload(grandma()).await.unwrap();
    let state = controller.snapshot();
    assert_eq!(state.file_name.as_deref(), Some("grandma.jpg"));
    assert_eq!(state.phase(), Phase::Ready);

    controller.request_restoration().await.unwrap();
    let path = controller.download(dir.path()).await.unwrap().unwrap();

    assert_eq!(path.file_name().unwrap(), "grandma-restored.png");
    assert_eq!(std::fs::read(&path).unwrap(), restored);
    assert_eq!(controller.phase(), Phase::Restored);
}

#[tokio::test]
async fn test_missing_credential_scenario() {
    let (controller, mock) = setup(MockRestorationService::default().without_credential());

    controller.upload(grandma()).await.unwrap();
    let err = controller.request_restoration().await.unwrap_err();

    assert!(matches!(err, SessionError::MissingCredential));
    assert_eq!(mock.call_count(), 0);
    let state = controller.snapshot();
    assert_eq!(state.error.as_deref(), Some(messages::PRECONDITION_FAILED));
    assert!(state.original_image.is_some());
    assert!(!state.is_loading);
    assert_eq!(state.phase(), Phase::Ready);
}

#[tokio::test]
async fn test_network_timeout_scenario() {
    let (controller, _mock) = setup(
        MockRestorationService::default()
            .fail_with(ServiceError::Request("network timeout".to_string())),
    );

    controller.upload(grandma()).await.unwrap();
    controller.request_restoration().await.unwrap_err();

    let state = controller.snapshot();
    assert_eq!(state.error.as_deref(), Some("network timeout"));
    assert!(!state.is_loading);
    assert!(state.restored_image.is_none());
}

#[tokio::test]
async fn test_failure_without_detail_uses_generic_message() {
    let (controller, _mock) =
        setup(MockRestorationService::default().fail_with(ServiceError::Serialization(String::new())));

    controller.upload(grandma()).await.unwrap();
    controller.request_restoration().await.unwrap_err();

    assert_eq!(controller.snapshot().error.as_deref(), Some(messages::RESTORE_FAILED));
}

#[tokio::test]
async fn test_retry_after_failure() {
    let (controller, mock) = setup(
        MockRestorationService::default().fail_with(ServiceError::Request("flaky".to_string())),
    );
    controller.upload(grandma()).await.unwrap();

    controller.request_restoration().await.unwrap_err();
    assert_eq!(controller.phase(), Phase::Failed);

    controller.request_restoration().await.unwrap();
    let state = controller.snapshot();
    assert_eq!(state.phase(), Phase::Restored);
    assert!(state.error.is_none());
    assert_eq!(mock.call_count(), 2);
}

struct BrokenReader;

#[async_trait]
impl FileReader for BrokenReader {
    async fn read(&self, file: &SelectedFile) -> Result<EncodedImage, FileReadError> {
        Err(FileReadError::Io {
            name: file.name.clone(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        })
    }
}

#[tokio::test]
async fn test_unreadable_upload_clears_previous_session() {
    let mock = Arc::new(MockRestorationService::default());
    let controller = SessionController::new(mock.clone());
    controller.upload(grandma()).await.unwrap();
    controller.request_restoration().await.unwrap();

    let controller = controller.with_reader(Arc::new(BrokenReader));
    let err = controller.upload(grandma()).await.unwrap_err();

    assert!(matches!(err, SessionError::FileRead(_)));
    let state = controller.snapshot();
    assert!(state.original_image.is_none());
    assert!(state.restored_image.is_none());
    assert_eq!(state.error.as_deref(), Some(messages::FILE_READ_FAILED));
    assert_eq!(state.phase(), Phase::Empty);
}

#[tokio::test]
async fn test_upload_from_missing_path() {
    let (controller, _mock) = setup(MockRestorationService::default());
    let dir = tempfile::tempdir().unwrap();

    let err = controller
        .upload(SelectedFile::from_path(dir.path().join("nope.png")))
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), messages::FILE_READ_FAILED);
    assert_eq!(controller.snapshot().error.as_deref(), Some(messages::FILE_READ_FAILED));
}

#[tokio::test]
async fn test_service_trait_object_is_shared() {
    let (controller, _mock) = setup(MockRestorationService::new("shared-mock"));
    let service: &Arc<dyn RestorationService> = controller.service();
    assert_eq!(service.model_id(), "shared-mock");
}

#[tokio::test]
async fn test_new_upload_does_not_allow_a_second_outstanding_request() {
    let gate = Arc::new(Notify::new());
    let (controller, mock) = setup(MockRestorationService::default().with_gate(gate.clone()));
    controller.upload(grandma()).await.unwrap();

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.request_restoration().await })
    };
    wait_for_dispatch(&mock).await;

    controller
        .upload(SelectedFile::from_bytes("grandpa.png", b"\x89PNG\r\n\x1a\nuniform".to_vec()))
        .await
        .unwrap();
    let err = controller.request_restoration().await.unwrap_err();
    assert!(matches!(err, SessionError::Busy));
    assert_eq!(mock.call_count(), 1);
    assert_eq!(controller.phase(), Phase::Ready);

    gate.notify_one();
    assert!(matches!(first.await.unwrap(), Err(SessionError::Superseded)));

    controller.request_restoration().await.unwrap();
    assert_eq!(mock.call_count(), 2);
    assert_eq!(mock.requests()[1].image.mime_type, "image/png");
    assert_eq!(controller.phase(), Phase::Restored);
}

/// Holds every read until released.
struct GatedReader {
    gate: Arc<Notify>,
    started: Arc<Notify>,
}

#[async_trait]
impl FileReader for GatedReader {
    async fn read(&self, file: &SelectedFile) -> Result<EncodedImage, FileReadError> {
        self.started.notify_one();
        self.gate.notified().await;
        let FileSource::Bytes(ref bytes) = file.source else {
            return Err(FileReadError::Empty { name: file.name.clone() });
        };
        Ok(EncodedImage::from_bytes(bytes, "image/jpeg"))
    }
}

fn gated_controller() -> (Arc<SessionController>, Arc<Notify>, Arc<Notify>) {
    let gate = Arc::new(Notify::new());
    let started = Arc::new(Notify::new());
    let reader = GatedReader { gate: gate.clone(), started: started.clone() };
    let controller = SessionController::new(Arc::new(MockRestorationService::default()))
        .with_reader(Arc::new(reader));
    (Arc::new(controller), gate, started)
}

#[tokio::test]
async fn test_reset_during_upload_discards_late_read() {
    let (controller, gate, started) = gated_controller();

    let upload = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.upload(grandma()).await })
    };
    started.notified().await;

    controller.reset();
    gate.notify_one();

    let err = upload.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::Superseded));
    assert_eq!(controller.snapshot(), SessionState::default());
}

#[tokio::test]
async fn test_second_upload_wins_over_slow_first_read() {
    let (controller, gate, started) = gated_controller();

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.upload(grandma()).await })
    };
    started.notified().await;

    let second = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller.upload(SelectedFile::from_bytes("grandpa.jpg", JPEG_BYTES.to_vec())).await
        })
    };
    started.notified().await;

    gate.notify_one();
    gate.notify_one();
    let (first, second) = (first.await.unwrap(), second.await.unwrap());

    assert!(matches!(first, Err(SessionError::Superseded)));
    second.unwrap();
    let state = controller.snapshot();
    assert_eq!(state.file_name.as_deref(), Some("grandpa.jpg"));
    assert_eq!(state.phase(), Phase::Ready);
}
