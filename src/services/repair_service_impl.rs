//! `SeaORM` implementation of the `RepairService` trait.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::repositories::repair::{NewTicket, StatusCounts};
use crate::db::{DormitoryRepository, RepairRepository, Store, TicketFilter, TicketScope};
use crate::domain::ticket::{InvalidTransition, TicketAction, Transition, transition};
use crate::domain::{non_blank, normalize_location};
use crate::entities::repairs::{self, RepairStatus};
use crate::services::repair_service::{
    ImageUpload, RepairError, RepairService, SubmitTicket, Submitted, TicketView,
};
use crate::services::uploads::UploadStore;

/// Conditional updates retried when the status moves between read and write.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

pub struct SeaOrmRepairService {
    store: Store,
    config: Config,
    uploads: UploadStore,
}

impl SeaOrmRepairService {
    #[must_use]
    pub const fn new(store: Store, config: Config, uploads: UploadStore) -> Self {
        Self {
            store,
            config,
            uploads,
        }
    }

    async fn views(&self, tickets: Vec<repairs::Model>) -> Result<Vec<TicketView>, RepairError> {
        let dorm_ids: Vec<i32> = tickets.iter().map(|t| t.dormitory_id).collect();
        let account_ids: Vec<i32> = tickets.iter().map(|t| t.account_id).collect();
        let handler_ids: Vec<i32> = tickets.iter().filter_map(|t| t.handler_id).collect();

        let dorms: HashMap<i32, String> = self
            .store
            .dormitories()
            .get_many(&dorm_ids)
            .await?
            .into_iter()
            .map(|d| (d.id, format!("{}-{}", d.building, d.room_number)))
            .collect();
        let submitters: HashMap<i32, String> = self
            .store
            .accounts()
            .get_many(&account_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a.username))
            .collect();
        let handlers: HashMap<i32, String> = self
            .store
            .staff()
            .get_many(&handler_ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s.staff_number))
            .collect();

        Ok(tickets
            .into_iter()
            .map(|t| TicketView {
                id: t.id,
                dormitory_id: t.dormitory_id,
                dormitory: dorms.get(&t.dormitory_id).cloned().unwrap_or_default(),
                account_id: t.account_id,
                submitter: submitters.get(&t.account_id).cloned(),
                applicant_name: t.applicant_name,
                contact_phone: t.contact_phone,
                bed_number: t.bed_number,
                description: t.description,
                status: t.status,
                created_at: t.created_at,
                handled_at: t.handled_at,
                handler_id: t.handler_id,
                handler_number: t.handler_id.and_then(|id| handlers.get(&id).cloned()),
                image_url: t.image_path.map(|name| format!("/uploads/{name}")),
            })
            .collect())
    }

    async fn view(&self, ticket: repairs::Model) -> Result<TicketView, RepairError> {
        self.views(vec![ticket])
            .await?
            .pop()
            .ok_or(RepairError::NotFound("Ticket"))
    }

    /// Resolves the dormitory and inserts the ticket in one transaction.
    async fn create_ticket(
        &self,
        location: (String, String),
        ticket: NewTicket,
    ) -> Result<(repairs::Model, bool), RepairError> {
        let txn = self.store.begin().await?;

        let resolution = DormitoryRepository::new(&txn)
            .resolve(&location.0, &location.1, &self.config.housing.placeholder())
            .await?;

        let created = RepairRepository::new(&txn)
            .insert(NewTicket {
                dormitory_id: resolution.dormitory.id,
                ..ticket
            })
            .await?;

        txn.commit().await?;
        Ok((created, resolution.created))
    }

    async fn advance(
        &self,
        staff_account_id: i32,
        ticket_id: i32,
        action: TicketAction,
    ) -> Result<TicketView, RepairError> {
        let staff = self
            .store
            .staff()
            .get_by_account(staff_account_id)
            .await?
            .ok_or(RepairError::NotFound("Staff record"))?;

        let policy = self.config.repairs.transition_policy;
        let repairs = self.store.repairs();

        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let ticket = repairs
                .get(ticket_id)
                .await?
                .ok_or(RepairError::NotFound("Ticket"))?;

            let to = match transition(policy, ticket.status, action) {
                Ok(Transition::Advance(to)) => to,
                Ok(Transition::Withdraw) => {
                    return Err(RepairError::Internal(format!(
                        "{action} cannot withdraw a ticket"
                    )));
                }
                Err(e) => {
                    warn!(ticket_id, staff = %staff.staff_number, "{e}");
                    return Err(e.into());
                }
            };

            if repairs
                .advance(ticket_id, ticket.status, to, staff.id, Utc::now())
                .await?
            {
                metrics::counter!("repair_transitions_total", "action" => action.as_str())
                    .increment(1);
                info!(
                    ticket_id,
                    from = %ticket.status,
                    to = %to,
                    staff = %staff.staff_number,
                    "Ticket transitioned"
                );

                let updated = repairs
                    .get(ticket_id)
                    .await?
                    .ok_or(RepairError::NotFound("Ticket"))?;
                return self.view(updated).await;
            }
        }

        Err(RepairError::Internal(format!(
            "ticket {ticket_id} changed during {action}"
        )))
    }
}

#[async_trait]
impl RepairService for SeaOrmRepairService {
    async fn submit(
        &self,
        account_id: i32,
        ticket: SubmitTicket,
        image: Option<ImageUpload>,
    ) -> Result<Submitted, RepairError> {
        let location = normalize_location(&ticket.building, &ticket.room_number)
            .ok_or_else(|| RepairError::Validation("Building and room are required".into()))?;
        let applicant_name = non_blank(Some(ticket.applicant_name.as_str()))
            .ok_or_else(|| RepairError::Validation("Applicant name is required".into()))?;
        let description = non_blank(Some(ticket.description.as_str()))
            .ok_or_else(|| RepairError::Validation("Description is required".into()))?;

        let staged = match image {
            Some(upload) => Some(self.uploads.stage(&upload.filename, &upload.bytes).await?),
            None => None,
        };

        let new_ticket = NewTicket {
            dormitory_id: 0,
            account_id,
            applicant_name,
            contact_phone: non_blank(ticket.contact_phone.as_deref()),
            bed_number: non_blank(ticket.bed_number.as_deref()),
            description,
            image_path: staged.as_ref().map(|s| s.stored_name.clone()),
        };

        let (mut created, dormitory_created) = match self.create_ticket(location, new_ticket).await {
            Ok(result) => result,
            Err(e) => {
                if let Some(staged) = staged {
                    self.uploads.discard(staged).await;
                }
                return Err(e);
            }
        };

        if let Some(staged) = staged
            && self.uploads.finalize(staged).await.is_err()
        {
            warn!(ticket_id = created.id, "Image lost after commit, detaching it");
            self.store.repairs().clear_image(created.id).await?;
            created.image_path = None;
        }

        info!(
            ticket_id = created.id,
            account_id,
            dormitory_id = created.dormitory_id,
            dormitory_created,
            "Repair ticket submitted"
        );

        Ok(Submitted {
            ticket: self.view(created).await?,
            dormitory_created,
        })
    }

    async fn cancel(&self, account_id: i32, ticket_id: i32) -> Result<(), RepairError> {
        let repairs = self.store.repairs();
        let policy = self.config.repairs.transition_policy;

        let ticket = repairs
            .get_for_submitter(ticket_id, account_id)
            .await?
            .ok_or(RepairError::NotFound("Ticket"))?;

        if let Err(e) = transition(policy, ticket.status, TicketAction::Cancel) {
            warn!(ticket_id, account_id, "{e}");
            return Err(e.into());
        }

        if !repairs
            .delete_in_status(ticket_id, RepairStatus::Pending)
            .await?
        {
            let current = repairs
                .get_for_submitter(ticket_id, account_id)
                .await?
                .ok_or(RepairError::NotFound("Ticket"))?;
            return Err(InvalidTransition {
                from: current.status,
                action: TicketAction::Cancel,
            }
            .into());
        }

        if let Some(name) = &ticket.image_path {
            self.uploads.remove(name).await;
        }

        metrics::counter!("repair_transitions_total", "action" => TicketAction::Cancel.as_str())
            .increment(1);
        info!(ticket_id, account_id, "Repair ticket cancelled");
        Ok(())
    }

    async fn accept(
        &self,
        staff_account_id: i32,
        ticket_id: i32,
    ) -> Result<TicketView, RepairError> {
        self.advance(staff_account_id, ticket_id, TicketAction::Accept)
            .await
    }

    async fn complete(
        &self,
        staff_account_id: i32,
        ticket_id: i32,
    ) -> Result<TicketView, RepairError> {
        self.advance(staff_account_id, ticket_id, TicketAction::Complete)
            .await
    }

    async fn list(
        &self,
        filter: TicketFilter,
        scope: TicketScope,
    ) -> Result<Vec<TicketView>, RepairError> {
        let tickets = self.store.repairs().list(filter, scope).await?;
        self.views(tickets).await
    }

    async fn get(&self, ticket_id: i32) -> Result<TicketView, RepairError> {
        let ticket = self
            .store
            .repairs()
            .get(ticket_id)
            .await?
            .ok_or(RepairError::NotFound("Ticket"))?;

        self.view(ticket).await
    }

    async fn counts(&self) -> Result<StatusCounts, RepairError> {
        Ok(self.store.repairs().count_by_status().await?)
    }
}
