use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Vacancy { Table, Id, Name, Salary, Experience, City }

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Ids are assigned by clients, so no sequence backs the primary key.
        manager.create_table(
            Table::create()
                .table(Vacancy::Table)
                .if_not_exists()
                .col(ColumnDef::new(Vacancy::Id).big_integer().not_null().primary_key())
                .col(ColumnDef::new(Vacancy::Name).string_len(256).not_null())
                .col(ColumnDef::new(Vacancy::Salary).big_integer().not_null())
                .col(ColumnDef::new(Vacancy::Experience).string_len(256).not_null())
                .col(ColumnDef::new(Vacancy::City).string_len(128).not_null())
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_vacancy_name").table(Vacancy::Table).col(Vacancy::Name).to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Vacancy::Table).to_owned()).await?;
        Ok(())
    }
}
