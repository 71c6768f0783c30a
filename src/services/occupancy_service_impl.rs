//! `SeaORM` implementation of the `OccupancyService` trait.

use async_trait::async_trait;
use rand::Rng;
use sea_orm::{ConnectionTrait, DbErr};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::repositories::account::{Account, NewAccount};
use crate::db::repositories::dormitory::DormitoryFields;
use crate::db::repositories::student::{Assignment, NewStudent};
use crate::db::{
    AccountRepository, DormitoryRepository, RepairRepository, Resolution, Store,
    StudentRepository, is_unique_violation,
};
use crate::domain::dormitory::{DormitoryDefaults, check_capacity};
use crate::domain::{non_blank, normalize_location};
use crate::entities::accounts::Role;
use crate::entities::{dormitories, repairs, students};
use crate::services::occupancy_service::{
    AssignOutcome, AssignRequest, CreatedStudent, DashboardStats, DormitoryInput, DormitoryRef,
    DormitoryView, EditStudentRequest, NewStudentRequest, OccupancyError, OccupancyService,
    ProfileUpdate, ProfileUpdated, StudentView,
};
use crate::services::uploads::UploadStore;

const MALE: &str = "男";
const FEMALE: &str = "女";

pub struct SeaOrmOccupancyService {
    store: Store,
    config: Config,
    uploads: UploadStore,
}

impl SeaOrmOccupancyService {
    #[must_use]
    pub const fn new(store: Store, config: Config, uploads: UploadStore) -> Self {
        Self {
            store,
            config,
            uploads,
        }
    }

    /// Deletes image files of tickets removed by a committed cascade.
    async fn remove_images(&self, names: &[String]) {
        for name in names {
            self.uploads.remove(name).await;
        }
    }

    async fn student_view(
        &self,
        student: students::Model,
    ) -> Result<StudentView, OccupancyError> {
        let account = self.store.accounts().get_by_id(student.account_id).await?;
        let dormitory = match student.dormitory_id {
            Some(id) => self.store.dormitories().get(id).await?,
            None => None,
        };

        Ok(build_view(student, account.as_ref(), dormitory))
    }
}

fn build_view(
    student: students::Model,
    account: Option<&Account>,
    dormitory: Option<dormitories::Model>,
) -> StudentView {
    StudentView {
        id: student.id,
        account_id: student.account_id,
        username: account.map(|a| a.username.clone()).unwrap_or_default(),
        name: account.map(|a| a.name.clone()).unwrap_or_default(),
        student_number: student.student_number,
        major: student.major,
        gender: student.gender,
        bed_number: student.bed_number,
        phone: student.phone,
        dormitory: dormitory.map(DormitoryRef::from),
    }
}

/// Trimmed location plus a capacity check against the room type.
fn validate_input(input: DormitoryInput) -> Result<DormitoryFields, OccupancyError> {
    let (building, room_number) = location(&input.building, &input.room_number)?;

    let room_type = input.room_type.trim().to_string();
    check_capacity(&room_type, input.capacity)?;

    Ok(DormitoryFields {
        building,
        room_number,
        room_type,
        capacity: input.capacity,
        status: input.status.trim().to_string(),
    })
}

fn location(building: &str, room_number: &str) -> Result<(String, String), OccupancyError> {
    normalize_location(building, room_number)
        .ok_or_else(|| OccupancyError::Validation("Building and room are required".to_string()))
}

fn duplicate_or(err: DbErr) -> OccupancyError {
    if is_unique_violation(&err) {
        OccupancyError::DuplicateDormitory
    } else {
        OccupancyError::from(err)
    }
}

fn required(value: &str, field: &str) -> Result<String, OccupancyError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(OccupancyError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Resolves the room (creating a placeholder when needed) and points the
/// student at it. Runs inside the caller's transaction.
async fn assign_within<C: ConnectionTrait>(
    conn: &C,
    defaults: &DormitoryDefaults,
    student_id: i32,
    (building, room_number): (&str, &str),
    bed_number: Option<String>,
    phone: Option<String>,
) -> Result<Resolution, OccupancyError> {
    let resolution = DormitoryRepository::new(conn)
        .resolve(building, room_number, defaults)
        .await?;

    let assigned = StudentRepository::new(conn)
        .set_assignment(
            student_id,
            Assignment {
                dormitory_id: Some(resolution.dormitory.id),
                bed_number,
                phone,
            },
        )
        .await?;

    if !assigned {
        return Err(OccupancyError::NotFound("Student"));
    }

    if resolution.created {
        info!(%building, room = %room_number, "Placeholder dormitory created");
    }

    Ok(resolution)
}

fn random_student_number() -> String {
    let digits: u32 = rand::rng().random_range(10_000_000..=99_999_999);
    format!("STU{digits}")
}

#[async_trait]
impl OccupancyService for SeaOrmOccupancyService {
    async fn list_dormitories(&self) -> Result<Vec<DormitoryView>, OccupancyError> {
        let rows = self.store.dormitories().list_with_occupants().await?;

        Ok(rows
            .into_iter()
            .map(|(dorm, occupants)| DormitoryView {
                id: dorm.id,
                building: dorm.building,
                room_number: dorm.room_number,
                room_type: dorm.room_type,
                capacity: dorm.capacity,
                status: dorm.status,
                occupant_count: occupants.len(),
                occupants: occupants.into_iter().map(|s| s.student_number).collect(),
            })
            .collect())
    }

    async fn add_dormitory(
        &self,
        input: DormitoryInput,
    ) -> Result<dormitories::Model, OccupancyError> {
        let fields = validate_input(input)?;

        let dormitory = self
            .store
            .dormitories()
            .insert(fields)
            .await
            .map_err(duplicate_or)?;

        info!(
            id = dormitory.id,
            building = %dormitory.building,
            room = %dormitory.room_number,
            "Dormitory added"
        );
        Ok(dormitory)
    }

    async fn edit_dormitory(
        &self,
        id: i32,
        input: DormitoryInput,
    ) -> Result<dormitories::Model, OccupancyError> {
        let fields = validate_input(input)?;

        let txn = self.store.begin().await?;
        let dormitories = DormitoryRepository::new(&txn);

        if !dormitories.lock(id).await? {
            return Err(OccupancyError::NotFound("Dormitory"));
        }

        let current = dormitories
            .get(id)
            .await?
            .ok_or(OccupancyError::NotFound("Dormitory"))?;

        if dormitories
            .find_conflicting(&fields.building, &fields.room_number, id)
            .await?
            .is_some()
        {
            return Err(OccupancyError::DuplicateDormitory);
        }

        let moves =
            current.building != fields.building || current.room_number != fields.room_number;
        if moves && dormitories.occupant_count(id).await? > 0 {
            return Err(OccupancyError::RoomOccupiedImmutable);
        }

        let updated = dormitories
            .update(current, fields)
            .await
            .map_err(duplicate_or)?;
        txn.commit().await?;

        info!(id, "Dormitory updated");
        Ok(updated)
    }

    async fn delete_dormitory(&self, id: i32) -> Result<(), OccupancyError> {
        let txn = self.store.begin().await?;
        let dormitories = DormitoryRepository::new(&txn);

        if !dormitories.lock(id).await? {
            return Err(OccupancyError::NotFound("Dormitory"));
        }

        let occupants = dormitories.occupant_count(id).await?;
        if occupants > 0 {
            warn!(id, occupants, "Refusing to delete occupied dormitory");
            return Err(OccupancyError::RoomOccupied);
        }

        let images = RepairRepository::new(&txn)
            .image_names(repairs::Column::DormitoryId, id)
            .await?;

        dormitories.delete(id).await?;
        txn.commit().await?;

        self.remove_images(&images).await;
        info!(id, "Dormitory deleted");
        Ok(())
    }

    async fn resolve(
        &self,
        building: &str,
        room_number: &str,
    ) -> Result<Resolution, OccupancyError> {
        let (building, room_number) = location(building, room_number)?;

        let resolution = self
            .store
            .dormitories()
            .resolve(&building, &room_number, &self.config.housing.placeholder())
            .await?;

        if resolution.created {
            info!(%building, room = %room_number, "Placeholder dormitory created");
        }
        Ok(resolution)
    }

    async fn assign_student(
        &self,
        student_id: i32,
        request: AssignRequest,
    ) -> Result<AssignOutcome, OccupancyError> {
        let (building, room_number) = location(&request.building, &request.room_number)?;

        let txn = self.store.begin().await?;
        let resolution = assign_within(
            &txn,
            &self.config.housing.placeholder(),
            student_id,
            (building.as_str(), room_number.as_str()),
            non_blank(request.bed_number.as_deref()),
            non_blank(request.phone.as_deref()),
        )
        .await?;
        txn.commit().await?;

        info!(
            student_id,
            dormitory_id = resolution.dormitory.id,
            created = resolution.created,
            "Student assigned"
        );

        Ok(AssignOutcome {
            student_id,
            resolution,
        })
    }

    async fn view_profile(&self, account_id: i32) -> Result<StudentView, OccupancyError> {
        let student = self
            .store
            .students()
            .get_by_account(account_id)
            .await?
            .ok_or(OccupancyError::NotFound("Student"))?;

        self.student_view(student).await
    }

    async fn update_profile(
        &self,
        account_id: i32,
        update: ProfileUpdate,
    ) -> Result<ProfileUpdated, OccupancyError> {
        let student_id = self
            .store
            .students()
            .get_by_account(account_id)
            .await?
            .ok_or(OccupancyError::NotFound("Student"))?
            .id;

        let location = match (update.building.as_deref(), update.room_number.as_deref()) {
            (Some(building), Some(room)) => normalize_location(building, room),
            _ => None,
        };

        let txn = self.store.begin().await?;
        let students = StudentRepository::new(&txn);

        if !students.lock(student_id).await? {
            return Err(OccupancyError::NotFound("Student"));
        }

        let current = students
            .get(student_id)
            .await?
            .ok_or(OccupancyError::NotFound("Student"))?;

        let bed_number = match update.bed_number.as_deref() {
            Some(bed) => non_blank(Some(bed)),
            None => current.bed_number.clone(),
        };
        let phone = match update.phone.as_deref() {
            Some(phone) => non_blank(Some(phone)),
            None => current.phone.clone(),
        };
        let dormitory_id = current.dormitory_id;

        let major = non_blank(update.major.as_deref()).unwrap_or_else(|| current.major.clone());
        let gender = non_blank(update.gender.as_deref()).unwrap_or_else(|| current.gender.clone());
        students.update_details(current, major, gender).await?;

        let resolution = match &location {
            Some((building, room)) => Some(
                assign_within(
                    &txn,
                    &self.config.housing.placeholder(),
                    student_id,
                    (building.as_str(), room.as_str()),
                    bed_number,
                    phone,
                )
                .await?,
            ),
            None => {
                students
                    .set_assignment(
                        student_id,
                        Assignment {
                            dormitory_id,
                            bed_number,
                            phone,
                        },
                    )
                    .await?;
                None
            }
        };
        txn.commit().await?;

        let dormitory_created = resolution.as_ref().is_some_and(|r| r.created);
        info!(student_id, dormitory_created, "Profile updated");

        let student = self
            .store
            .students()
            .get(student_id)
            .await?
            .ok_or(OccupancyError::NotFound("Student"))?;

        Ok(ProfileUpdated {
            profile: self.student_view(student).await?,
            dormitory_created,
        })
    }

    async fn list_students(&self) -> Result<Vec<StudentView>, OccupancyError> {
        let students = self.store.students().list().await?;

        let account_ids: Vec<i32> = students.iter().map(|s| s.account_id).collect();
        let dorm_ids: Vec<i32> = students.iter().filter_map(|s| s.dormitory_id).collect();

        let accounts: HashMap<i32, Account> = self
            .store
            .accounts()
            .get_many(&account_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        let dorms: HashMap<i32, dormitories::Model> = self
            .store
            .dormitories()
            .get_many(&dorm_ids)
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        Ok(students
            .into_iter()
            .map(|s| {
                let account = accounts.get(&s.account_id);
                let dorm = s.dormitory_id.and_then(|id| dorms.get(&id).cloned());
                build_view(s, account, dorm)
            })
            .collect())
    }

    async fn add_student(
        &self,
        request: NewStudentRequest,
    ) -> Result<CreatedStudent, OccupancyError> {
        let name = required(&request.name, "Name")?;
        let major = required(&request.major, "Major")?;
        let gender = required(&request.gender, "Gender")?;

        let txn = self.store.begin().await?;
        let accounts = AccountRepository::new(&txn);
        let students = StudentRepository::new(&txn);

        match request.dormitory_id {
            Some(dorm_id) => {
                if !DormitoryRepository::new(&txn).lock(dorm_id).await? {
                    return Err(OccupancyError::NotFound("Dormitory"));
                }
            }
            None => accounts.reserve_writes().await?,
        }

        let mut username = name.clone();
        let mut suffix = 1;
        while accounts.username_exists(&username).await? {
            username = format!("{name}{suffix}");
            suffix += 1;
        }

        let mut student_number = random_student_number();
        while students.number_taken(&student_number, None).await? {
            student_number = random_student_number();
        }

        let password = self.config.housing.admin_default_password.clone();
        let account = accounts
            .create(
                NewAccount {
                    username,
                    name,
                    password: &password,
                    role: Role::Student,
                },
                &self.config.security,
            )
            .await?;

        let student = students
            .insert(NewStudent {
                account_id: account.id,
                student_number,
                major,
                gender,
                dormitory_id: request.dormitory_id,
                bed_number: None,
                phone: None,
            })
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    OccupancyError::DuplicateStudentNumber
                } else {
                    OccupancyError::from(e)
                }
            })?;

        let dormitory = match student.dormitory_id {
            Some(id) => DormitoryRepository::new(&txn).get(id).await?,
            None => None,
        };

        txn.commit().await?;

        info!(
            username = %account.username,
            student_number = %student.student_number,
            "Student added"
        );

        Ok(CreatedStudent {
            student: build_view(student, Some(&account), dormitory),
            default_password: password,
        })
    }

    async fn edit_student(
        &self,
        id: i32,
        request: EditStudentRequest,
    ) -> Result<StudentView, OccupancyError> {
        let name = required(&request.name, "Name")?;
        let student_number = required(&request.student_number, "Student number")?;
        let major = required(&request.major, "Major")?;
        let gender = required(&request.gender, "Gender")?;

        let txn = self.store.begin().await?;
        let students = StudentRepository::new(&txn);

        if !students.lock(id).await? {
            return Err(OccupancyError::NotFound("Student"));
        }

        let current = students
            .get(id)
            .await?
            .ok_or(OccupancyError::NotFound("Student"))?;

        if students.number_taken(&student_number, Some(id)).await? {
            return Err(OccupancyError::DuplicateStudentNumber);
        }

        let dormitory = match request.dormitory_id {
            Some(dorm_id) => Some(
                DormitoryRepository::new(&txn)
                    .get(dorm_id)
                    .await?
                    .ok_or(OccupancyError::NotFound("Dormitory"))?,
            ),
            None => None,
        };

        let accounts = AccountRepository::new(&txn);
        accounts.update_name(current.account_id, &name).await?;

        let updated = students
            .update_record(current, student_number, major, gender, request.dormitory_id)
            .await?;
        let account = accounts.get_by_id(updated.account_id).await?;

        txn.commit().await?;

        info!(id, "Student updated");
        Ok(build_view(updated, account.as_ref(), dormitory))
    }

    async fn delete_student(&self, id: i32) -> Result<(), OccupancyError> {
        let txn = self.store.begin().await?;
        let students = StudentRepository::new(&txn);

        if !students.lock(id).await? {
            return Err(OccupancyError::NotFound("Student"));
        }

        let student = students
            .get(id)
            .await?
            .ok_or(OccupancyError::NotFound("Student"))?;

        let images = RepairRepository::new(&txn)
            .image_names(repairs::Column::AccountId, student.account_id)
            .await?;

        students.delete(id).await?;
        AccountRepository::new(&txn)
            .delete(student.account_id)
            .await?;
        txn.commit().await?;

        self.remove_images(&images).await;

        info!(id, number = %student.student_number, "Student deleted");
        Ok(())
    }

    async fn stats(&self) -> Result<DashboardStats, OccupancyError> {
        let students = self.store.students();

        Ok(DashboardStats {
            dormitories: self.store.dormitories().count().await?,
            students: students.count().await?,
            male_students: students.count_by_gender(MALE).await?,
            female_students: students.count_by_gender(FEMALE).await?,
            repairs: self.store.repairs().count_by_status().await?,
        })
    }
}
