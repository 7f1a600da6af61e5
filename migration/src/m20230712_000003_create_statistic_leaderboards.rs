use sea_orm_migration::prelude::*;

use crate::catalog::leaderboards;
use crate::schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        schema::create_objects(manager, &leaderboards::objects()).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        schema::drop_objects(manager, &leaderboards::objects()).await
    }
}
