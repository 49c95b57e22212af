use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_identity_tables::Migration),
            Box::new(m20240101_000002_create_hierarchy_tables::Migration),
            Box::new(m20240101_000003_create_element_type_tables::Migration),
            Box::new(m20240101_000004_create_production_tables::Migration),
            Box::new(m20240101_000005_create_billing_tables::Migration),
            Box::new(m20240101_000006_create_audit_tables::Migration),
        ]
    }
}

fn pk<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn money<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .decimal_len(16, 4)
        .not_null()
        .default(0)
        .to_owned()
}

fn stamp<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

mod m20240101_000001_create_identity_tables {
    use super::pk;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_identity_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Roles::Table)
                        .if_not_exists()
                        .col(pk(Roles::RoleId))
                        .col(
                            ColumnDef::new(Roles::RoleName)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(pk(Users::Id))
                        .col(ColumnDef::new(Users::FirstName).string().not_null())
                        .col(ColumnDef::new(Users::LastName).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::RoleId).integer().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sessions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Sessions::SessionId)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Sessions::UserId).integer().not_null())
                        .col(ColumnDef::new(Sessions::HostName).string().not_null())
                        .col(ColumnDef::new(Sessions::IpAddress).string().not_null())
                        .col(super::stamp(Sessions::CreatedAt))
                        .col(
                            ColumnDef::new(Sessions::ExpiresAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Client::Table)
                        .if_not_exists()
                        .col(pk(Client::ClientId))
                        .col(ColumnDef::new(Client::Name).string().not_null())
                        .col(ColumnDef::new(Client::UserId).integer().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(EndClient::Table)
                        .if_not_exists()
                        .col(pk(EndClient::Id))
                        .col(ColumnDef::new(EndClient::ClientId).integer().not_null())
                        .col(ColumnDef::new(EndClient::Name).string().not_null())
                        .col(ColumnDef::new(EndClient::UserId).integer().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Project::Table)
                        .if_not_exists()
                        .col(pk(Project::ProjectId))
                        .col(ColumnDef::new(Project::Name).string().not_null())
                        .col(ColumnDef::new(Project::ClientId).integer().not_null())
                        .col(super::stamp(Project::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProjectMembers::Table)
                        .if_not_exists()
                        .col(pk(ProjectMembers::Id))
                        .col(ColumnDef::new(ProjectMembers::ProjectId).integer().not_null())
                        .col(ColumnDef::new(ProjectMembers::UserId).integer().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_project_members_project_user")
                        .table(ProjectMembers::Table)
                        .col(ProjectMembers::ProjectId)
                        .col(ProjectMembers::UserId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProjectMembers::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Project::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(EndClient::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Client::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sessions::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Roles::Table).if_exists().to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Roles {
        Table,
        RoleId,
        RoleName,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        FirstName,
        LastName,
        Email,
        RoleId,
    }

    #[derive(DeriveIden)]
    enum Sessions {
        Table,
        SessionId,
        UserId,
        HostName,
        IpAddress,
        CreatedAt,
        ExpiresAt,
    }

    #[derive(DeriveIden)]
    enum Client {
        Table,
        ClientId,
        Name,
        UserId,
    }

    #[derive(DeriveIden)]
    enum EndClient {
        Table,
        Id,
        ClientId,
        Name,
        UserId,
    }

    #[derive(DeriveIden)]
    enum Project {
        Table,
        ProjectId,
        Name,
        ClientId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ProjectMembers {
        Table,
        Id,
        ProjectId,
        UserId,
    }
}

mod m20240101_000002_create_hierarchy_tables {
    use super::{pk, stamp};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_hierarchy_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Towers and floors as flat rows; floors point at their tower.
            manager
                .create_table(
                    Table::create()
                        .table(Precast::Table)
                        .if_not_exists()
                        .col(pk(Precast::Id))
                        .col(ColumnDef::new(Precast::ProjectId).integer().not_null())
                        .col(ColumnDef::new(Precast::ParentId).integer().null())
                        .col(ColumnDef::new(Precast::Name).string().not_null())
                        .col(ColumnDef::new(Precast::NamingConvention).string().null())
                        .col(stamp(Precast::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_precast_project_parent")
                        .table(Precast::Table)
                        .col(Precast::ProjectId)
                        .col(Precast::ParentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProjectStages::Table)
                        .if_not_exists()
                        .col(pk(ProjectStages::Id))
                        .col(ColumnDef::new(ProjectStages::ProjectId).integer().not_null())
                        .col(ColumnDef::new(ProjectStages::Name).string().not_null())
                        .col(ColumnDef::new(ProjectStages::AssignedTo).integer().null())
                        .col(ColumnDef::new(ProjectStages::QcId).integer().null())
                        .col(ColumnDef::new(ProjectStages::PaperId).integer().null())
                        .col(ColumnDef::new(ProjectStages::TaskId).integer().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProjectStages::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Precast::Table).if_exists().to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Precast {
        Table,
        Id,
        ProjectId,
        ParentId,
        Name,
        NamingConvention,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ProjectStages {
        Table,
        Id,
        ProjectId,
        Name,
        AssignedTo,
        QcId,
        PaperId,
        TaskId,
    }
}

mod m20240101_000003_create_element_type_tables {
    use super::{money, pk, stamp};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_element_type_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ElementType::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ElementType::ElementTypeId)
                                .integer()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ElementType::ProjectId).integer().not_null())
                        .col(ColumnDef::new(ElementType::ElementType).string().not_null())
                        .col(
                            ColumnDef::new(ElementType::ElementTypeName)
                                .string()
                                .not_null(),
                        )
                        .col(money(ElementType::Thickness))
                        .col(money(ElementType::Length))
                        .col(money(ElementType::Height))
                        .col(money(ElementType::Width))
                        .col(money(ElementType::Area))
                        .col(money(ElementType::Volume))
                        .col(money(ElementType::Mass))
                        .col(money(ElementType::Density))
                        .col(
                            ColumnDef::new(ElementType::ElementTypeVersion)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ElementType::TotalCountElement)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ElementType::StagePath).string().not_null())
                        .col(ColumnDef::new(ElementType::CreatedBy).integer().not_null())
                        .col(stamp(ElementType::CreatedAt))
                        .col(stamp(ElementType::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_element_type_project_code")
                        .table(ElementType::Table)
                        .col(ElementType::ProjectId)
                        .col(ElementType::ElementType)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ElementTypeHierarchyQuantity::Table)
                        .if_not_exists()
                        .col(pk(ElementTypeHierarchyQuantity::Id))
                        .col(
                            ColumnDef::new(ElementTypeHierarchyQuantity::ElementTypeId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ElementTypeHierarchyQuantity::ProjectId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ElementTypeHierarchyQuantity::HierarchyId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ElementTypeHierarchyQuantity::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ElementTypeHierarchyQuantity::NamingConvention)
                                .string()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_hierarchy_quantity_type_hierarchy")
                        .table(ElementTypeHierarchyQuantity::Table)
                        .col(ElementTypeHierarchyQuantity::ElementTypeId)
                        .col(ElementTypeHierarchyQuantity::HierarchyId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Drawings::Table)
                        .if_not_exists()
                        .col(pk(Drawings::DrawingId))
                        .col(ColumnDef::new(Drawings::ElementTypeId).integer().not_null())
                        .col(ColumnDef::new(Drawings::ProjectId).integer().not_null())
                        .col(ColumnDef::new(Drawings::DrawingTypeId).integer().not_null())
                        .col(
                            ColumnDef::new(Drawings::CurrentVersion)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Drawings::File).string().not_null())
                        .col(ColumnDef::new(Drawings::Comments).text().null())
                        .col(ColumnDef::new(Drawings::CreatedBy).integer().not_null())
                        .col(stamp(Drawings::CreatedAt))
                        .col(stamp(Drawings::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DrawingsRevision::Table)
                        .if_not_exists()
                        .col(pk(DrawingsRevision::DrawingRevisionId))
                        .col(
                            ColumnDef::new(DrawingsRevision::ParentDrawingId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DrawingsRevision::ElementTypeId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DrawingsRevision::DrawingTypeId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DrawingsRevision::Version).integer().not_null())
                        .col(ColumnDef::new(DrawingsRevision::File).string().not_null())
                        .col(ColumnDef::new(DrawingsRevision::Comments).text().null())
                        .col(ColumnDef::new(DrawingsRevision::CreatedBy).integer().not_null())
                        .col(stamp(DrawingsRevision::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_drawings_revision_parent_version")
                        .table(DrawingsRevision::Table)
                        .col(DrawingsRevision::ParentDrawingId)
                        .col(DrawingsRevision::Version)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ElementTypeBom::Table)
                        .if_not_exists()
                        .col(pk(ElementTypeBom::Id))
                        .col(
                            ColumnDef::new(ElementTypeBom::ElementTypeId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ElementTypeBom::ProjectId).integer().not_null())
                        .col(ColumnDef::new(ElementTypeBom::ProductId).integer().not_null())
                        .col(ColumnDef::new(ElementTypeBom::ProductName).string().not_null())
                        .col(money(ElementTypeBom::Quantity))
                        .col(ColumnDef::new(ElementTypeBom::Unit).string().not_null())
                        .col(money(ElementTypeBom::Rate))
                        .col(stamp(ElementTypeBom::CreatedAt))
                        .col(stamp(ElementTypeBom::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ElementTypeRevisionBom::Table)
                        .if_not_exists()
                        .col(pk(ElementTypeRevisionBom::Id))
                        .col(
                            ColumnDef::new(ElementTypeRevisionBom::SourceBomId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ElementTypeRevisionBom::ElementTypeId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ElementTypeRevisionBom::ProductId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ElementTypeRevisionBom::ProductName)
                                .string()
                                .not_null(),
                        )
                        .col(money(ElementTypeRevisionBom::Quantity))
                        .col(ColumnDef::new(ElementTypeRevisionBom::Unit).string().not_null())
                        .col(money(ElementTypeRevisionBom::Rate))
                        .col(stamp(ElementTypeRevisionBom::ChangedAt))
                        .col(
                            ColumnDef::new(ElementTypeRevisionBom::ChangedBy)
                                .integer()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ElementTypeRevisionBom::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ElementTypeBom::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DrawingsRevision::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Drawings::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ElementTypeHierarchyQuantity::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ElementType::Table).if_exists().to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum ElementType {
        Table,
        ElementTypeId,
        ProjectId,
        ElementType,
        ElementTypeName,
        Thickness,
        Length,
        Height,
        Width,
        Area,
        Volume,
        Mass,
        Density,
        ElementTypeVersion,
        TotalCountElement,
        StagePath,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ElementTypeHierarchyQuantity {
        Table,
        Id,
        ElementTypeId,
        ProjectId,
        HierarchyId,
        Quantity,
        NamingConvention,
    }

    #[derive(DeriveIden)]
    enum Drawings {
        Table,
        DrawingId,
        ElementTypeId,
        ProjectId,
        DrawingTypeId,
        CurrentVersion,
        File,
        Comments,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum DrawingsRevision {
        Table,
        DrawingRevisionId,
        ParentDrawingId,
        ElementTypeId,
        DrawingTypeId,
        Version,
        File,
        Comments,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ElementTypeBom {
        Table,
        Id,
        ElementTypeId,
        ProjectId,
        ProductId,
        ProductName,
        Quantity,
        Unit,
        Rate,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ElementTypeRevisionBom {
        Table,
        Id,
        SourceBomId,
        ElementTypeId,
        ProductId,
        ProductName,
        Quantity,
        Unit,
        Rate,
        ChangedAt,
        ChangedBy,
    }
}

mod m20240101_000004_create_production_tables {
    use super::{pk, stamp};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_production_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Element::Table)
                        .if_not_exists()
                        .col(pk(Element::Id))
                        .col(ColumnDef::new(Element::ElementTypeId).integer().not_null())
                        .col(ColumnDef::new(Element::ProjectId).integer().not_null())
                        .col(ColumnDef::new(Element::ElementName).string().not_null())
                        .col(ColumnDef::new(Element::TargetLocation).integer().not_null())
                        .col(
                            ColumnDef::new(Element::InStage)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Element::Disabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Element::ElementTypeVersion)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Element::DrawingRevisionId).integer().null())
                        .col(ColumnDef::new(Element::BomRevisionId).integer().null())
                        .col(ColumnDef::new(Element::CreatedBy).integer().not_null())
                        .col(stamp(Element::CreatedAt))
                        .col(stamp(Element::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_element_type_location")
                        .table(Element::Table)
                        .col(Element::ElementTypeId)
                        .col(Element::TargetLocation)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Activity::Table)
                        .if_not_exists()
                        .col(pk(Activity::Id))
                        .col(ColumnDef::new(Activity::ElementId).integer().not_null())
                        .col(ColumnDef::new(Activity::ProjectId).integer().not_null())
                        .col(ColumnDef::new(Activity::StageId).integer().not_null())
                        .col(ColumnDef::new(Activity::TaskId).integer().null())
                        .col(ColumnDef::new(Activity::AssignedTo).integer().null())
                        .col(ColumnDef::new(Activity::QcId).integer().null())
                        .col(ColumnDef::new(Activity::PaperId).integer().null())
                        .col(
                            ColumnDef::new(Activity::Completed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Activity::Status).string().not_null())
                        .col(ColumnDef::new(Activity::QcStatus).string().not_null())
                        .col(ColumnDef::new(Activity::MeshMoldStatus).string().not_null())
                        .col(
                            ColumnDef::new(Activity::ReinforcementStatus)
                                .string()
                                .not_null(),
                        )
                        .col(stamp(Activity::CreatedAt))
                        .col(stamp(Activity::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_activity_element")
                        .table(Activity::Table)
                        .col(Activity::ElementId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CompleteProduction::Table)
                        .if_not_exists()
                        .col(pk(CompleteProduction::Id))
                        .col(
                            ColumnDef::new(CompleteProduction::ElementId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CompleteProduction::ElementTypeId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CompleteProduction::ProjectId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CompleteProduction::StageId).integer().not_null())
                        .col(ColumnDef::new(CompleteProduction::UserId).integer().null())
                        .col(stamp(CompleteProduction::StartedAt))
                        .col(ColumnDef::new(CompleteProduction::Status).string().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_complete_production_element")
                        .table(CompleteProduction::Table)
                        .col(CompleteProduction::ElementId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PrecastStock::Table)
                        .if_not_exists()
                        .col(pk(PrecastStock::Id))
                        .col(
                            ColumnDef::new(PrecastStock::ElementId)
                                .integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PrecastStock::ElementTypeId).integer().not_null())
                        .col(ColumnDef::new(PrecastStock::ProjectId).integer().not_null())
                        .col(
                            ColumnDef::new(PrecastStock::Stockyard)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(PrecastStock::DispatchStatus)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(PrecastStock::DispatchStart)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PrecastStock::DispatchEnd)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PrecastStock::Erected)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(PrecastStock::OrderByErection)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(PrecastStock::ReceiveInErection)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(stamp(PrecastStock::CreatedAt))
                        .col(stamp(PrecastStock::UpdatedAt))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PrecastStock::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CompleteProduction::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Activity::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Element::Table).if_exists().to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Element {
        Table,
        Id,
        ElementTypeId,
        ProjectId,
        ElementName,
        TargetLocation,
        InStage,
        Disabled,
        ElementTypeVersion,
        DrawingRevisionId,
        BomRevisionId,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Activity {
        Table,
        Id,
        ElementId,
        ProjectId,
        StageId,
        TaskId,
        AssignedTo,
        QcId,
        PaperId,
        Completed,
        Status,
        QcStatus,
        MeshMoldStatus,
        ReinforcementStatus,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CompleteProduction {
        Table,
        Id,
        ElementId,
        ElementTypeId,
        ProjectId,
        StageId,
        UserId,
        StartedAt,
        Status,
    }

    #[derive(DeriveIden)]
    enum PrecastStock {
        Table,
        Id,
        ElementId,
        ElementTypeId,
        ProjectId,
        Stockyard,
        DispatchStatus,
        DispatchStart,
        DispatchEnd,
        Erected,
        OrderByErection,
        ReceiveInErection,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_billing_tables {
    use super::{money, pk, stamp};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_billing_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WorkOrder::Table)
                        .if_not_exists()
                        .col(pk(WorkOrder::Id))
                        .col(ColumnDef::new(WorkOrder::ProjectId).integer().not_null())
                        .col(
                            ColumnDef::new(WorkOrder::WoNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(money(WorkOrder::TotalValue))
                        .col(ColumnDef::new(WorkOrder::PaymentTerm).json_binary().null())
                        .col(stamp(WorkOrder::CreatedAt))
                        .col(stamp(WorkOrder::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WorkOrderMaterial::Table)
                        .if_not_exists()
                        .col(pk(WorkOrderMaterial::Id))
                        .col(
                            ColumnDef::new(WorkOrderMaterial::WorkOrderId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkOrderMaterial::ItemName).string().not_null())
                        .col(money(WorkOrderMaterial::UnitRate))
                        .col(money(WorkOrderMaterial::Tax))
                        .col(ColumnDef::new(WorkOrderMaterial::HsnCode).string().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Invoice::Table)
                        .if_not_exists()
                        .col(pk(Invoice::Id))
                        .col(ColumnDef::new(Invoice::WorkOrderId).integer().not_null())
                        .col(ColumnDef::new(Invoice::RevisionNo).integer().not_null())
                        .col(ColumnDef::new(Invoice::BillingAddress).text().null())
                        .col(ColumnDef::new(Invoice::ShippingAddress).text().null())
                        .col(money(Invoice::TotalAmount))
                        .col(money(Invoice::TotalPaid))
                        .col(
                            ColumnDef::new(Invoice::PaymentStatus)
                                .string()
                                .not_null()
                                .default("unpaid"),
                        )
                        .col(
                            ColumnDef::new(Invoice::InDraft)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Invoice::CreatedBy).integer().not_null())
                        .col(stamp(Invoice::CreatedAt))
                        .col(stamp(Invoice::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_invoice_work_order_revision")
                        .table(Invoice::Table)
                        .col(Invoice::WorkOrderId)
                        .col(Invoice::RevisionNo)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InvoiceItem::Table)
                        .if_not_exists()
                        .col(pk(InvoiceItem::Id))
                        .col(ColumnDef::new(InvoiceItem::InvoiceId).integer().not_null())
                        .col(ColumnDef::new(InvoiceItem::ItemName).string().not_null())
                        .col(ColumnDef::new(InvoiceItem::Stage).string().not_null())
                        .col(money(InvoiceItem::Volume))
                        .col(money(InvoiceItem::UnitRate))
                        .col(money(InvoiceItem::Tax))
                        .col(money(InvoiceItem::Amount))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InvoicePayment::Table)
                        .if_not_exists()
                        .col(pk(InvoicePayment::Id))
                        .col(ColumnDef::new(InvoicePayment::InvoiceId).integer().not_null())
                        .col(money(InvoicePayment::AmountPaid))
                        .col(ColumnDef::new(InvoicePayment::Reference).string().null())
                        .col(ColumnDef::new(InvoicePayment::RecordedBy).integer().not_null())
                        .col(stamp(InvoicePayment::PaidAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ElementInvoiceHistory::Table)
                        .if_not_exists()
                        .col(pk(ElementInvoiceHistory::Id))
                        .col(
                            ColumnDef::new(ElementInvoiceHistory::InvoiceId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ElementInvoiceHistory::ElementId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ElementInvoiceHistory::Stage).string().not_null())
                        .col(money(ElementInvoiceHistory::Volume))
                        .col(stamp(ElementInvoiceHistory::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_element_invoice_history_element_stage")
                        .table(ElementInvoiceHistory::Table)
                        .col(ElementInvoiceHistory::ElementId)
                        .col(ElementInvoiceHistory::Stage)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ElementInvoiceHistory::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InvoicePayment::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InvoiceItem::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Invoice::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WorkOrderMaterial::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WorkOrder::Table).if_exists().to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum WorkOrder {
        Table,
        Id,
        ProjectId,
        WoNumber,
        TotalValue,
        PaymentTerm,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum WorkOrderMaterial {
        Table,
        Id,
        WorkOrderId,
        ItemName,
        UnitRate,
        Tax,
        HsnCode,
    }

    #[derive(DeriveIden)]
    enum Invoice {
        Table,
        Id,
        WorkOrderId,
        RevisionNo,
        BillingAddress,
        ShippingAddress,
        TotalAmount,
        TotalPaid,
        PaymentStatus,
        InDraft,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum InvoiceItem {
        Table,
        Id,
        InvoiceId,
        ItemName,
        Stage,
        Volume,
        UnitRate,
        Tax,
        Amount,
    }

    #[derive(DeriveIden)]
    enum InvoicePayment {
        Table,
        Id,
        InvoiceId,
        AmountPaid,
        Reference,
        RecordedBy,
        PaidAt,
    }

    #[derive(DeriveIden)]
    enum ElementInvoiceHistory {
        Table,
        Id,
        InvoiceId,
        ElementId,
        Stage,
        Volume,
        CreatedAt,
    }
}

mod m20240101_000006_create_audit_tables {
    use super::{pk, stamp};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_audit_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ActivityLogs::Table)
                        .if_not_exists()
                        .col(pk(ActivityLogs::Id))
                        .col(ColumnDef::new(ActivityLogs::EventContext).string().not_null())
                        .col(ColumnDef::new(ActivityLogs::EventName).string().not_null())
                        .col(ColumnDef::new(ActivityLogs::Description).text().not_null())
                        .col(ColumnDef::new(ActivityLogs::UserName).string().not_null())
                        .col(ColumnDef::new(ActivityLogs::HostName).string().not_null())
                        .col(ColumnDef::new(ActivityLogs::IpAddress).string().not_null())
                        .col(ColumnDef::new(ActivityLogs::ProjectId).integer().null())
                        .col(stamp(ActivityLogs::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Notifications::Table)
                        .if_not_exists()
                        .col(pk(Notifications::Id))
                        .col(ColumnDef::new(Notifications::UserId).integer().not_null())
                        .col(ColumnDef::new(Notifications::Message).text().not_null())
                        .col(ColumnDef::new(Notifications::ProjectId).integer().null())
                        .col(
                            ColumnDef::new(Notifications::Read)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(stamp(Notifications::CreatedAt))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Notifications::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ActivityLogs::Table).if_exists().to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ActivityLogs {
        Table,
        Id,
        EventContext,
        EventName,
        Description,
        UserName,
        HostName,
        IpAddress,
        ProjectId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Notifications {
        Table,
        Id,
        UserId,
        Message,
        ProjectId,
        Read,
        CreatedAt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;
    use std::collections::HashSet;

    #[test]
    fn migration_names_are_distinct() {
        let names: Vec<String> = Migrator::migrations()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        let distinct: HashSet<&String> = names.iter().collect();
        assert_eq!(distinct.len(), names.len());
        assert_eq!(names[0], "m20240101_000001_create_identity_tables");
    }

    #[tokio::test]
    async fn schema_applies_on_sqlite_and_reruns_cleanly() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        assert!(Migrator::get_pending_migrations(&db).await.unwrap().is_empty());
        assert_eq!(
            Migrator::get_applied_migrations(&db).await.unwrap().len(),
            Migrator::migrations().len()
        );
        Migrator::up(&db, None).await.unwrap();
    }
}
