use sea_orm_migration::prelude::*;

use crate::catalog::helpers;
use crate::schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        schema::create_objects(manager, &helpers::first_transaction_objects()).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        schema::drop_objects(manager, &helpers::first_transaction_objects()).await
    }
}
