use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Role { Table, Id, Name }

#[derive(DeriveIden)]
enum Account { Table, Id, Login, Password, RoleId }

#[derive(DeriveIden)]
enum Permission { Table, Id, RoleId, AllowedMethod }

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(Role::Table)
                .if_not_exists()
                .col(ColumnDef::new(Role::Id).integer().not_null().auto_increment().primary_key())
                .col(ColumnDef::new(Role::Name).string_len(64).not_null().unique_key())
                .to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(Account::Table)
                .if_not_exists()
                .col(ColumnDef::new(Account::Id).integer().not_null().auto_increment().primary_key())
                .col(ColumnDef::new(Account::Login).string_len(128).not_null().unique_key())
                .col(ColumnDef::new(Account::Password).string_len(256).not_null())
                .col(ColumnDef::new(Account::RoleId).integer().not_null())
                .foreign_key(ForeignKey::create()
                    .name("fk_account_role")
                    .from(Account::Table, Account::RoleId)
                    .to(Role::Table, Role::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .on_update(ForeignKeyAction::Cascade)
                )
                .to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(Permission::Table)
                .if_not_exists()
                .col(ColumnDef::new(Permission::Id).integer().not_null().auto_increment().primary_key())
                .col(ColumnDef::new(Permission::RoleId).integer().not_null())
                .col(ColumnDef::new(Permission::AllowedMethod).string_len(16).not_null())
                .foreign_key(ForeignKey::create()
                    .name("fk_permission_role")
                    .from(Permission::Table, Permission::RoleId)
                    .to(Role::Table, Role::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .on_update(ForeignKeyAction::Cascade)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .name("idx_permission_role_method")
                .table(Permission::Table)
                .col(Permission::RoleId)
                .col(Permission::AllowedMethod)
                .unique()
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Permission::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Account::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Role::Table).to_owned()).await?;
        Ok(())
    }
}
