use anyhow::{Context, Result};
use sea_orm::TransactionTrait;
use tracing::info;

use super::repositories::account::NewAccount;
use super::repositories::student::NewStudent;
use super::{AccountRepository, DormitoryRepository, StaffRepository, Store, StudentRepository};
use crate::config::Config;
use crate::domain::dormitory::DormitoryDefaults;
use crate::entities::accounts::Role;

/// Creates the configured seed dormitory and accounts on first boot.
///
/// First boot means the first configured seed username does not exist yet.
/// Everything is written in one transaction. Returns whether seeding ran.
pub async fn seed_if_empty(store: &Store, config: &Config) -> Result<bool> {
    let seed = &config.seed;

    if !seed.enabled {
        return Ok(false);
    }

    let Some(first) = seed.accounts.first() else {
        return Ok(false);
    };

    if store.accounts().username_exists(&first.username).await? {
        return Ok(false);
    }

    let txn = store.conn.begin().await?;

    let dormitory = DormitoryRepository::new(&txn)
        .resolve(
            &seed.dormitory.building,
            &seed.dormitory.room_number,
            &DormitoryDefaults {
                room_type: seed.dormitory.room_type.clone(),
                capacity: seed.dormitory.capacity,
                status: seed.dormitory.status.clone(),
            },
        )
        .await
        .context("Failed to create seed dormitory")?
        .dormitory;

    let accounts = AccountRepository::new(&txn);
    let students = StudentRepository::new(&txn);
    let staff = StaffRepository::new(&txn);

    for entry in &seed.accounts {
        let account = accounts
            .create(
                NewAccount {
                    username: entry.username.clone(),
                    name: entry.name.clone(),
                    password: &entry.password,
                    role: entry.role,
                },
                &config.security,
            )
            .await
            .with_context(|| format!("Failed to create seed account {}", entry.username))?;

        match entry.role {
            Role::Student => {
                students
                    .insert(NewStudent {
                        account_id: account.id,
                        student_number: entry
                            .student_number
                            .clone()
                            .unwrap_or_else(|| format!("S{:06}", account.id)),
                        major: entry
                            .major
                            .clone()
                            .unwrap_or_else(|| config.housing.default_major.clone()),
                        gender: entry
                            .gender
                            .clone()
                            .unwrap_or_else(|| config.housing.default_gender.clone()),
                        dormitory_id: entry.assign_seed_dormitory.then_some(dormitory.id),
                        bed_number: None,
                        phone: None,
                    })
                    .await?;
            }
            Role::Staff => {
                let number = entry
                    .staff_number
                    .clone()
                    .unwrap_or_else(|| format!("E{:06}", account.id));
                staff.insert(account.id, number).await?;
            }
            Role::Admin => {}
        }
    }

    txn.commit().await?;

    info!(
        accounts = seed.accounts.len(),
        dormitory = %format!("{}-{}", dormitory.building, dormitory.room_number),
        "Seed data created"
    );

    Ok(true)
}
