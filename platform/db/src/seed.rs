use entity::{account, permission, role};
use sea_orm::{sea_query::OnConflict, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use tracing::info;

use crate::{DbError, DbPool, DbResult};

/// Demo roles and the HTTP methods each one grants.
pub const DEMO_ROLES: &[(&str, &[&str])] = &[
    ("viewer", &["GET"]),
    ("editor", &["GET", "PUT", "DELETE"]),
];

/// Demo accounts as `(login, password, role)`.
pub const DEMO_ACCOUNTS: &[(&str, &str, &str)] = &[
    ("vi", "pass_vi", "viewer"),
    ("ed", "pass_ed", "editor"),
];

/// Insert the demo roles, grants and accounts. Safe to run repeatedly:
/// existing accounts get their password and role reset.
pub async fn seed_access_control(db: &DbPool) -> DbResult<()> {
    for (name, methods) in DEMO_ROLES {
        role::Entity::insert(role::ActiveModel {
            name: Set((*name).to_string()),
            ..Default::default()
        })
        .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;
        let role_id = role_id(db, name).await?;

        let grants = methods.iter().map(|method| permission::ActiveModel {
            role_id: Set(role_id),
            allowed_method: Set((*method).to_string()),
            ..Default::default()
        });
        permission::Entity::insert_many(grants)
            .on_conflict(
                OnConflict::columns([permission::Column::RoleId, permission::Column::AllowedMethod])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    for (login, password, role_name) in DEMO_ACCOUNTS {
        let role_id = role_id(db, role_name).await?;
        account::Entity::insert(account::ActiveModel {
            login: Set((*login).to_string()),
            password: Set((*password).to_string()),
            role_id: Set(role_id),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(account::Column::Login)
                .update_columns([account::Column::Password, account::Column::RoleId])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
        info!(login, role = role_name, "demo account seeded");
    }
    Ok(())
}

async fn role_id(db: &DbPool, name: &str) -> DbResult<i32> {
    role::Entity::find()
        .filter(role::Column::Name.eq(name))
        .one(db)
        .await?
        .map(|role| role.id)
        .ok_or(DbError::NotFound)
}
