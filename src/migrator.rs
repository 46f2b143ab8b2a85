use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_products_table::Migration),
            Box::new(m20250301_000002_create_orders_table::Migration),
            Box::new(m20250301_000003_create_payment_anomalies_table::Migration),
        ]
    }
}

mod m20250301_000001_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Currency).string_len(3).not_null())
                        .col(ColumnDef::new(Products::Variants).json().not_null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Products {
        Table,
        Id,
        Name,
        Currency,
        Variants,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000002_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::BuyerId).string().not_null())
                        .col(ColumnDef::new(Orders::BuyerEmail).string().null())
                        .col(ColumnDef::new(Orders::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Orders::ProductName).string().not_null())
                        .col(ColumnDef::new(Orders::Variant).json().not_null())
                        .col(
                            ColumnDef::new(Orders::AmountMinorUnits)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::Currency).string_len(3).not_null())
                        .col(
                            ColumnDef::new(Orders::GatewayOrderId)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::GatewayPaymentId).string().null())
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Orders::NeedsReview)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Orders::ReviewReason).string().null())
                        .col(ColumnDef::new(Orders::DownloadUrl).string().null())
                        .col(ColumnDef::new(Orders::PreviewUrl).string().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_buyer_id")
                        .table(Orders::Table)
                        .col(Orders::BuyerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_needs_review")
                        .table(Orders::Table)
                        .col(Orders::NeedsReview)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        BuyerId,
        BuyerEmail,
        ProductId,
        ProductName,
        Variant,
        AmountMinorUnits,
        Currency,
        GatewayOrderId,
        GatewayPaymentId,
        Status,
        NeedsReview,
        ReviewReason,
        DownloadUrl,
        PreviewUrl,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000003_create_payment_anomalies_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_payment_anomalies_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PaymentAnomalies::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentAnomalies::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentAnomalies::Kind).string().not_null())
                        .col(ColumnDef::new(PaymentAnomalies::Event).string().null())
                        .col(
                            ColumnDef::new(PaymentAnomalies::GatewayOrderId)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentAnomalies::GatewayPaymentId)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(PaymentAnomalies::OrderId).uuid().null())
                        .col(
                            ColumnDef::new(PaymentAnomalies::ExpectedAmount)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentAnomalies::ReceivedAmount)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentAnomalies::ExpectedCurrency)
                                .string_len(3)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentAnomalies::ReceivedCurrency)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentAnomalies::RawPayload)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentAnomalies::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_anomalies_gateway_order_id")
                        .table(PaymentAnomalies::Table)
                        .col(PaymentAnomalies::GatewayOrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentAnomalies::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PaymentAnomalies {
        Table,
        Id,
        Kind,
        Event,
        GatewayOrderId,
        GatewayPaymentId,
        OrderId,
        ExpectedAmount,
        ReceivedAmount,
        ExpectedCurrency,
        ReceivedCurrency,
        RawPayload,
        CreatedAt,
    }
}
