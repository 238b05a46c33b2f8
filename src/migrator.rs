use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_tanks_table::Migration),
            Box::new(m20250101_000002_create_movements_table::Migration),
            Box::new(m20250301_000003_add_contractor_and_smt_columns::Migration),
        ]
    }
}

#[derive(DeriveIden)]
enum Tanks {
    Table,
    Serial,
    Status,
    LastMovementDate,
}

#[derive(DeriveIden)]
enum Movements {
    Table,
    Id,
    Serial,
    MovementType,
    MovementDate,
    Project,
    ResponsibleEngineer,
    ResponsibleContractor,
    SmtNumber,
    CreatedAt,
    UpdatedAt,
}

mod m20250101_000001_create_tanks_table {
    use super::Tanks;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_tanks_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Tanks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Tanks::Serial)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Tanks::Status)
                                .string_len(8)
                                .not_null()
                                .default("in"),
                        )
                        .col(ColumnDef::new(Tanks::LastMovementDate).date().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Tanks::Table).to_owned())
                .await
        }
    }
}

mod m20250101_000002_create_movements_table {
    use super::{Movements, Tanks};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Contractor and SMT columns arrive in a later migration so that
            // databases created before they existed upgrade the same way.
            manager
                .create_table(
                    Table::create()
                        .table(Movements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Movements::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Movements::Serial).string().not_null())
                        .col(
                            ColumnDef::new(Movements::MovementType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Movements::MovementDate).date().not_null())
                        .col(ColumnDef::new(Movements::Project).string().null())
                        .col(
                            ColumnDef::new(Movements::ResponsibleEngineer)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Movements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Movements::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_movements_serial")
                                .from(Movements::Table, Movements::Serial)
                                .to(Tanks::Table, Tanks::Serial)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_movements_serial_date")
                        .table(Movements::Table)
                        .col(Movements::Serial)
                        .col(Movements::MovementDate)
                        .col(Movements::Id)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Movements::Table).to_owned())
                .await
        }
    }
}

mod m20250301_000003_add_contractor_and_smt_columns {
    use super::Movements;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_add_contractor_and_smt_columns"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // SQLite accepts a single ADD COLUMN per ALTER TABLE.
            if !manager
                .has_column("movements", "responsible_contractor")
                .await?
            {
                manager
                    .alter_table(
                        Table::alter()
                            .table(Movements::Table)
                            .add_column(
                                ColumnDef::new(Movements::ResponsibleContractor)
                                    .string()
                                    .null(),
                            )
                            .to_owned(),
                    )
                    .await?;
            }

            if !manager.has_column("movements", "smt_number").await? {
                manager
                    .alter_table(
                        Table::alter()
                            .table(Movements::Table)
                            .add_column(ColumnDef::new(Movements::SmtNumber).string().null())
                            .to_owned(),
                    )
                    .await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .alter_table(
                    Table::alter()
                        .table(Movements::Table)
                        .drop_column(Movements::SmtNumber)
                        .to_owned(),
                )
                .await?;
            manager
                .alter_table(
                    Table::alter()
                        .table(Movements::Table)
                        .drop_column(Movements::ResponsibleContractor)
                        .to_owned(),
                )
                .await
        }
    }
}
