use async_trait::async_trait;
use entity::{account, permission, role, vacancy};
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Statement,
};
use tracing::instrument;

use crate::{DbError, DbPool, DbResult};

/// Everything the HTTP layer needs from storage. Implementations own their
/// pooling and must be safe to call from concurrent requests.
#[async_trait]
pub trait VacancyStore: Send + Sync {
    /// HTTP methods granted to the credential pair. Unknown logins and wrong
    /// passwords both yield an empty list.
    async fn permissions(&self, login: &str, password: &str) -> DbResult<Vec<String>>;

    /// All vacancies ordered by name.
    async fn list(&self) -> DbResult<Vec<vacancy::Model>>;

    /// Fails with [`DbError::NotFound`] when no row has `id`.
    async fn get(&self, id: i64) -> DbResult<vacancy::Model>;

    /// Insert or fully replace the row keyed by `vacancy.id` in one statement.
    async fn upsert(&self, vacancy: vacancy::Model) -> DbResult<()>;

    /// Deleting an absent id is not an error.
    async fn delete(&self, id: i64) -> DbResult<()>;

    async fn ping(&self) -> DbResult<()>;
}

/// SeaORM-backed store. Works against any backend the pool was built for.
#[derive(Clone, Debug)]
pub struct SqlVacancyStore {
    db: DbPool,
}

impl SqlVacancyStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &DbPool {
        &self.db
    }
}

#[async_trait]
impl VacancyStore for SqlVacancyStore {
    #[instrument(name = "db.permissions", skip(self, password))]
    async fn permissions(&self, login: &str, password: &str) -> DbResult<Vec<String>> {
        let methods = permission::Entity::find()
            .select_only()
            .column(permission::Column::AllowedMethod)
            .join(JoinType::InnerJoin, permission::Relation::Role.def())
            .join(JoinType::InnerJoin, role::Relation::Account.def())
            .filter(account::Column::Login.eq(login))
            .filter(account::Column::Password.eq(password))
            .into_tuple::<String>()
            .all(&self.db)
            .await?;
        Ok(methods)
    }

    #[instrument(name = "db.vacancy.list", skip_all)]
    async fn list(&self) -> DbResult<Vec<vacancy::Model>> {
        let rows = vacancy::Entity::find()
            .order_by_asc(vacancy::Column::Name)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    #[instrument(name = "db.vacancy.get", skip(self))]
    async fn get(&self, id: i64) -> DbResult<vacancy::Model> {
        vacancy::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DbError::NotFound)
    }

    #[instrument(name = "db.vacancy.upsert", skip_all, fields(id = vacancy.id))]
    async fn upsert(&self, vacancy: vacancy::Model) -> DbResult<()> {
        let model = vacancy::ActiveModel {
            id: Set(vacancy.id),
            name: Set(vacancy.name),
            salary: Set(vacancy.salary),
            experience: Set(vacancy.experience),
            city: Set(vacancy.city),
        };
        vacancy::Entity::insert(model)
            .on_conflict(
                OnConflict::column(vacancy::Column::Id)
                    .update_columns([
                        vacancy::Column::Name,
                        vacancy::Column::Salary,
                        vacancy::Column::Experience,
                        vacancy::Column::City,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    #[instrument(name = "db.vacancy.delete", skip(self))]
    async fn delete(&self, id: i64) -> DbResult<()> {
        vacancy::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    async fn ping(&self) -> DbResult<()> {
        let backend = self.db.get_database_backend();
        self.db
            .execute(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }
}
