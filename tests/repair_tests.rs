use std::path::PathBuf;

use dormkeep::config::Config;
use dormkeep::db::{TicketFilter, TicketScope};
use dormkeep::domain::ticket::{TicketAction, TransitionPolicy};
use dormkeep::entities::repairs::RepairStatus;
use dormkeep::services::{ImageUpload, RepairError, SubmitTicket};
use dormkeep::state::SharedState;
use uuid::Uuid;

struct Fixture {
    state: SharedState,
    dir: PathBuf,
    student: i32,
    staff: i32,
}

impl Fixture {
    async fn new(policy: TransitionPolicy) -> Self {
        let dir = std::env::temp_dir().join(format!("dormkeep-repairs-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut config = Config::default();
        config.general.database_path = format!("sqlite:{}", dir.join("test.db").display());
        config.general.uploads_path = dir.join("uploads").display().to_string();
        config.repairs.transition_policy = policy;
        config.repairs.max_image_bytes = 1024;

        let state = SharedState::new(config)
            .await
            .expect("Failed to create state");

        let accounts = state.store.accounts();
        let student = accounts.get_by_username("student").await.unwrap().unwrap().id;
        let staff = accounts.get_by_username("staff1").await.unwrap().unwrap().id;

        Self {
            state,
            dir,
            student,
            staff,
        }
    }

    fn uploads(&self) -> PathBuf {
        self.dir.join("uploads")
    }

    fn staged_files(&self) -> usize {
        std::fs::read_dir(self.uploads().join(".staging"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn ticket(building: &str, room: &str) -> SubmitTicket {
    SubmitTicket {
        building: building.to_string(),
        room_number: room.to_string(),
        applicant_name: "张三".to_string(),
        contact_phone: Some("13800000000".to_string()),
        bed_number: Some(" ".to_string()),
        description: "水龙头漏水".to_string(),
    }
}

#[tokio::test]
async fn test_ticket_lifecycle_for_unknown_room() {
    let fx = Fixture::new(TransitionPolicy::Strict).await;
    let repairs = &fx.state.repair_service;

    let submitted = repairs
        .submit(fx.student, ticket("7号楼", "701"), None)
        .await
        .unwrap();
    assert!(submitted.dormitory_created);
    assert_eq!(submitted.ticket.status, RepairStatus::Pending);
    assert_eq!(submitted.ticket.dormitory, "7号楼-701");
    assert!(submitted.ticket.handler_id.is_none());
    assert!(submitted.ticket.handled_at.is_none());
    assert!(submitted.ticket.bed_number.is_none());
    assert_eq!(submitted.ticket.submitter.as_deref(), Some("student"));

    let id = submitted.ticket.id;

    let accepted = repairs.accept(fx.staff, id).await.unwrap();
    assert_eq!(accepted.status, RepairStatus::InProgress);
    assert_eq!(accepted.handler_number.as_deref(), Some("S2024001"));
    assert!(accepted.handled_at.is_some());

    let completed = repairs.complete(fx.staff, id).await.unwrap();
    assert_eq!(completed.status, RepairStatus::Completed);

    let err = repairs.accept(fx.staff, id).await.unwrap_err();
    assert!(matches!(
        err,
        RepairError::InvalidTransition(t) if t.from == RepairStatus::Completed
            && t.action == TicketAction::Accept
    ));
    let err = repairs.complete(fx.staff, id).await.unwrap_err();
    assert!(matches!(err, RepairError::InvalidTransition(_)));

    let unchanged = repairs.get(id).await.unwrap();
    assert_eq!(unchanged.status, RepairStatus::Completed);

    let again = repairs
        .submit(fx.student, ticket("7号楼", "701"), None)
        .await
        .unwrap();
    assert!(!again.dormitory_created);
    assert_eq!(again.ticket.dormitory_id, submitted.ticket.dormitory_id);
}

#[tokio::test]
async fn test_strict_policy_rejects_skipping_accept() {
    let fx = Fixture::new(TransitionPolicy::Strict).await;
    let repairs = &fx.state.repair_service;

    let id = repairs
        .submit(fx.student, ticket("1号楼", "101"), None)
        .await
        .unwrap()
        .ticket
        .id;

    let err = repairs.complete(fx.staff, id).await.unwrap_err();
    assert!(matches!(err, RepairError::InvalidTransition(_)));
    assert_eq!(repairs.get(id).await.unwrap().status, RepairStatus::Pending);

    let err = repairs.accept(fx.student, id).await.unwrap_err();
    assert!(matches!(err, RepairError::NotFound(_)));

    let err = repairs.accept(fx.staff, 9999).await.unwrap_err();
    assert!(matches!(err, RepairError::NotFound(_)));
}

#[tokio::test]
async fn test_permissive_policy_allows_any_staff_action() {
    let fx = Fixture::new(TransitionPolicy::Permissive).await;
    let repairs = &fx.state.repair_service;

    let id = repairs
        .submit(fx.student, ticket("1号楼", "101"), None)
        .await
        .unwrap()
        .ticket
        .id;

    let completed = repairs.complete(fx.staff, id).await.unwrap();
    assert_eq!(completed.status, RepairStatus::Completed);
    assert!(completed.handler_id.is_some());

    let reopened = repairs.accept(fx.staff, id).await.unwrap();
    assert_eq!(reopened.status, RepairStatus::InProgress);

    let err = repairs.cancel(fx.student, id).await.unwrap_err();
    assert!(matches!(err, RepairError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_cancel_only_while_pending() {
    let fx = Fixture::new(TransitionPolicy::Strict).await;
    let repairs = &fx.state.repair_service;

    let accepted_id = repairs
        .submit(fx.student, ticket("1号楼", "101"), None)
        .await
        .unwrap()
        .ticket
        .id;
    repairs.accept(fx.staff, accepted_id).await.unwrap();

    let err = repairs.cancel(fx.student, accepted_id).await.unwrap_err();
    assert!(matches!(
        err,
        RepairError::InvalidTransition(t) if t.from == RepairStatus::InProgress
    ));
    let still_there = repairs.get(accepted_id).await.unwrap();
    assert_eq!(still_there.status, RepairStatus::InProgress);

    let pending_id = repairs
        .submit(fx.student, ticket("1号楼", "101"), None)
        .await
        .unwrap()
        .ticket
        .id;

    let err = repairs.cancel(fx.staff, pending_id).await.unwrap_err();
    assert!(matches!(err, RepairError::NotFound(_)));

    repairs.cancel(fx.student, pending_id).await.unwrap();
    let err = repairs.get(pending_id).await.unwrap_err();
    assert!(matches!(err, RepairError::NotFound(_)));
}

#[tokio::test]
async fn test_listing_and_counts() {
    let fx = Fixture::new(TransitionPolicy::Strict).await;
    let repairs = &fx.state.repair_service;

    let first = repairs
        .submit(fx.student, ticket("1号楼", "101"), None)
        .await
        .unwrap()
        .ticket
        .id;
    let second = repairs
        .submit(fx.student, ticket("1号楼", "101"), None)
        .await
        .unwrap()
        .ticket
        .id;
    repairs.accept(fx.staff, first).await.unwrap();

    let pending = repairs
        .list(
            TicketFilter::Status(RepairStatus::Pending),
            TicketScope::All,
        )
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second);

    let mine = repairs
        .list(TicketFilter::All, TicketScope::Submitter(fx.student))
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].id, second);

    let theirs = repairs
        .list(TicketFilter::All, TicketScope::Submitter(fx.staff))
        .await
        .unwrap();
    assert!(theirs.is_empty());

    let counts = repairs.counts().await.unwrap();
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.in_progress, 1);
    assert_eq!(counts.completed, 0);
    assert_eq!(counts.total(), 2);
}

#[tokio::test]
async fn test_image_is_finalized_after_commit() {
    let fx = Fixture::new(TransitionPolicy::Strict).await;
    let repairs = &fx.state.repair_service;

    let submitted = repairs
        .submit(
            fx.student,
            ticket("1号楼", "101"),
            Some(ImageUpload {
                filename: "../leak photo.png".to_string(),
                bytes: b"\x89PNG fake".to_vec(),
            }),
        )
        .await
        .unwrap();

    let url = submitted.ticket.image_url.expect("image stored");
    let stored = url.trim_start_matches("/uploads/");
    assert!(stored.ends_with("_leak_photo.png"));
    assert!(fx.uploads().join(stored).exists());
    assert_eq!(fx.staged_files(), 0);

    repairs
        .cancel(fx.student, submitted.ticket.id)
        .await
        .unwrap();
    assert!(!fx.uploads().join(stored).exists());
}

#[tokio::test]
async fn test_rejected_submission_leaves_no_files() {
    let fx = Fixture::new(TransitionPolicy::Strict).await;
    let repairs = &fx.state.repair_service;

    let err = repairs
        .submit(
            fx.student,
            ticket("1号楼", "101"),
            Some(ImageUpload {
                filename: "notes.txt".to_string(),
                bytes: b"hello".to_vec(),
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepairError::Validation(_)));

    let err = repairs
        .submit(
            fx.student,
            ticket("1号楼", "101"),
            Some(ImageUpload {
                filename: "huge.jpg".to_string(),
                bytes: vec![0; 2048],
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepairError::Validation(_)));

    let mut missing = ticket("1号楼", "101");
    missing.description = "   ".to_string();
    let err = repairs
        .submit(
            fx.student,
            missing,
            Some(ImageUpload {
                filename: "sink.jpg".to_string(),
                bytes: b"jpeg".to_vec(),
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepairError::Validation(_)));
    assert_eq!(fx.staged_files(), 0);

    // Unknown submitter fails the foreign key after the image is staged
    let err = repairs
        .submit(
            9999,
            ticket("1号楼", "101"),
            Some(ImageUpload {
                filename: "sink.jpg".to_string(),
                bytes: b"jpeg".to_vec(),
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepairError::Database(_)));
    assert_eq!(fx.staged_files(), 0);

    let counts = repairs.counts().await.unwrap();
    assert_eq!(counts.total(), 0);
}

fn png(filename: &str) -> Option<ImageUpload> {
    Some(ImageUpload {
        filename: filename.to_string(),
        bytes: b"\x89PNG fake".to_vec(),
    })
}

#[tokio::test]
async fn test_cascading_deletes_remove_ticket_images() {
    let fx = Fixture::new(TransitionPolicy::Strict).await;
    let repairs = &fx.state.repair_service;
    let occupancy = &fx.state.occupancy_service;

    let in_empty_room = repairs
        .submit(fx.student, ticket("5号楼", "501"), png("window.png"))
        .await
        .unwrap();
    assert!(in_empty_room.dormitory_created);
    let url = in_empty_room.ticket.image_url.expect("image stored");
    let first = fx.uploads().join(url.trim_start_matches("/uploads/"));
    assert!(first.exists());

    occupancy
        .delete_dormitory(in_empty_room.ticket.dormitory_id)
        .await
        .unwrap();
    assert!(!first.exists());
    assert!(matches!(
        repairs.get(in_empty_room.ticket.id).await.unwrap_err(),
        RepairError::NotFound(_)
    ));

    let own_room = repairs
        .submit(fx.student, ticket("1号楼", "101"), png("door.png"))
        .await
        .unwrap();
    let url = own_room.ticket.image_url.expect("image stored");
    let second = fx.uploads().join(url.trim_start_matches("/uploads/"));
    assert!(second.exists());

    let student = fx
        .state
        .store
        .students()
        .get_by_account(fx.student)
        .await
        .unwrap()
        .unwrap();
    occupancy.delete_student(student.id).await.unwrap();
    assert!(!second.exists());
    assert!(matches!(
        repairs.get(own_room.ticket.id).await.unwrap_err(),
        RepairError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_image_is_detached_when_finalize_fails() {
    let fx = Fixture::new(TransitionPolicy::Strict).await;
    let repairs = &fx.state.repair_service;

    // Stages under a uuid, but the final `<uuid>_<name>` exceeds NAME_MAX.
    let long_name = format!("{}.png", "a".repeat(300));

    let submitted = repairs
        .submit(fx.student, ticket("1号楼", "101"), png(&long_name))
        .await
        .unwrap();
    assert!(submitted.ticket.image_url.is_none());
    assert_eq!(fx.staged_files(), 0);

    let stored = repairs.get(submitted.ticket.id).await.unwrap();
    assert!(stored.image_url.is_none());
    assert_eq!(stored.status, RepairStatus::Pending);
}
