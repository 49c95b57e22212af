#![allow(dead_code)]

use chrono::{Duration, Utc};
use precast_api::{
    auth::Session,
    config::AppConfig,
    db::{establish_connection_from_app_config, run_migrations, DbPool},
    entities::{
        client, end_client, precast, project, project_member, project_stage, role, session, user,
        work_order, work_order_material,
    },
    events::{self, ActivityEvent},
    models::Geometry,
    services::element_types::{BomInput, CreateElementTypeInput, DrawingInput, HierarchyInput},
    AppState,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const PROJECT: i32 = 1;
pub const OTHER_PROJECT: i32 = 2;
pub const TOWER: i32 = 9;
pub const FLOOR_A: i32 = 10;
pub const FLOOR_B: i32 = 11;
pub const CASTING: i32 = 76;
pub const DISPATCH: i32 = 75;
pub const ERECTION: i32 = 74;
pub const HANDOVER: i32 = 73;
pub const FINISHING: i32 = 77;
pub const FULL_PATH: [i32; 5] = [CASTING, DISPATCH, ERECTION, HANDOVER, FINISHING];
pub const WORK_ORDER: i32 = 1;

pub const SUPERADMIN_TOKEN: &str = "tok-superadmin";
pub const ADMIN_TOKEN: &str = "tok-admin";
pub const PLANNER_TOKEN: &str = "tok-planner";
pub const OUTSIDER_TOKEN: &str = "tok-outsider";

/// A migrated in-memory database with one project, its hierarchy, stages,
/// work order and four callers.
pub struct TestApp {
    pub state: AppState,
    pub db: Arc<DbPool>,
    // held so the activity channel stays open
    _events: mpsc::Receiver<ActivityEvent>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Same fixture with engine settings adjusted before the services are
    /// wired.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        // one connection, one in-memory database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let db = establish_connection_from_app_config(&cfg)
            .await
            .expect("connect sqlite");
        run_migrations(&db).await.expect("migrate");
        seed(&db).await;

        let db = Arc::new(db);
        let (sender, rx) = events::channel(cfg.event_channel_capacity);
        let state = AppState::new(db.clone(), cfg, sender);
        Self {
            state,
            db,
            _events: rx,
        }
    }

    pub async fn session(&self, token: &str) -> Session {
        self.state
            .services
            .identity
            .resolve(token)
            .await
            .expect("seeded session resolves")
    }

    pub async fn admin(&self) -> Session {
        self.session(ADMIN_TOKEN).await
    }

    pub async fn planner(&self) -> Session {
        self.session(PLANNER_TOKEN).await
    }
}

async fn seed(db: &DbPool) {
    let now = Utc::now();

    for (id, name) in [(1, "superadmin"), (2, "admin"), (3, "planner")] {
        role::ActiveModel {
            role_id: Set(id),
            role_name: Set(name.to_string()),
        }
        .insert(db)
        .await
        .expect("role");
    }

    let users = [
        (1, "Sam", "Root", 1, SUPERADMIN_TOKEN),
        (2, "Ada", "Admin", 2, ADMIN_TOKEN),
        (3, "Pia", "Planner", 3, PLANNER_TOKEN),
        (4, "Otto", "Outsider", 3, OUTSIDER_TOKEN),
    ];
    for (id, first, last, role_id, token) in users {
        user::ActiveModel {
            id: Set(id),
            first_name: Set(first.to_string()),
            last_name: Set(last.to_string()),
            email: Set(format!("{}@example.com", first.to_lowercase())),
            role_id: Set(role_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("user");
        session::ActiveModel {
            session_id: Set(token.to_string()),
            user_id: Set(id),
            host_name: Set("test-host".to_string()),
            ip_address: Set("127.0.0.1".to_string()),
            created_at: Set(now),
            expires_at: Set(Some(now + Duration::hours(1))),
        }
        .insert(db)
        .await
        .expect("session");
    }

    session::ActiveModel {
        session_id: Set("tok-expired".to_string()),
        user_id: Set(2),
        host_name: Set("test-host".to_string()),
        ip_address: Set("127.0.0.1".to_string()),
        created_at: Set(now - Duration::hours(3)),
        expires_at: Set(Some(now - Duration::hours(1))),
    }
    .insert(db)
    .await
    .expect("expired session");

    client::ActiveModel {
        client_id: Set(1),
        name: Set("Acme Builders".to_string()),
        user_id: Set(2),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("client");
    client::ActiveModel {
        client_id: Set(2),
        name: Set("Elsewhere Ltd".to_string()),
        user_id: Set(1),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("client");

    for (id, client_id) in [(1, 1), (2, 2)] {
        end_client::ActiveModel {
            id: Set(id),
            client_id: Set(client_id),
            name: Set(format!("end client {}", id)),
            user_id: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("end client");
    }

    for (id, end_client_id) in [(PROJECT, 1), (OTHER_PROJECT, 2)] {
        project::ActiveModel {
            project_id: Set(id),
            name: Set(format!("project {}", id)),
            client_id: Set(end_client_id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("project");
    }

    project_member::ActiveModel {
        project_id: Set(PROJECT),
        user_id: Set(3),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("member");

    let nodes = [
        (TOWER, None, "T1", None),
        (FLOOR_A, Some(TOWER), "F1", Some("T1-F1-W")),
        (FLOOR_B, Some(TOWER), "F2", None),
    ];
    for (id, parent, name, naming) in nodes {
        precast::ActiveModel {
            id: Set(id),
            project_id: Set(PROJECT),
            parent_id: Set(parent),
            name: Set(name.to_string()),
            naming_convention: Set(naming.map(str::to_string)),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("precast node");
    }

    let stages = [
        (CASTING, "casted"),
        (DISPATCH, "dispatched"),
        (ERECTION, "erection"),
        (HANDOVER, "handover"),
        (FINISHING, "finishing"),
    ];
    for (id, name) in stages {
        project_stage::ActiveModel {
            id: Set(id),
            project_id: Set(PROJECT),
            name: Set(name.to_string()),
            assigned_to: Set(Some(3)),
            qc_id: Set(Some(2)),
            paper_id: Set(None),
            task_id: Set(Some(id * 10)),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("stage");
    }

    work_order::ActiveModel {
        id: Set(WORK_ORDER),
        project_id: Set(PROJECT),
        wo_number: Set("WO-001".to_string()),
        total_value: Set(dec!(100000)),
        payment_term: Set(Some(json!({
            "casted": 40,
            "dispatch": 20,
            "erection": 30,
            "handover": 10
        }))),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("work order");

    work_order_material::ActiveModel {
        work_order_id: Set(WORK_ORDER),
        item_name: Set("WALL".to_string()),
        unit_rate: Set(dec!(100)),
        tax: Set(dec!(18)),
        hsn_code: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("material");
}

pub fn hierarchy(hierarchy_id: i32, quantity: i32) -> HierarchyInput {
    HierarchyInput {
        hierarchy_id,
        quantity,
        naming_convention: None,
    }
}

pub fn bom_line(product_id: i32, quantity: Decimal) -> BomInput {
    BomInput {
        product_id,
        product_name: format!("product {}", product_id),
        quantity,
        unit: "kg".to_string(),
        rate: dec!(50),
    }
}

pub fn drawing(drawing_type_id: i32, file: &str) -> DrawingInput {
    DrawingInput {
        drawing_type_id,
        file: file.to_string(),
        comments: None,
    }
}

/// A WALL type with volume 2 on the given stage path.
pub fn wall(path: &[i32], hierarchy: Vec<HierarchyInput>) -> CreateElementTypeInput {
    CreateElementTypeInput {
        project_id: PROJECT,
        element_type: "WALL".to_string(),
        element_type_name: "Load bearing wall".to_string(),
        geometry: Geometry {
            thickness: dec!(0.2),
            length: dec!(5),
            height: dec!(2),
            width: dec!(0.2),
            area: dec!(10),
            volume: dec!(2),
            mass: dec!(4800),
        },
        stage_path: path.to_vec(),
        hierarchy,
        drawings: vec![drawing(1, "wall-r0.pdf")],
        bom: vec![bom_line(501, dec!(12.5)), bom_line(502, dec!(3))],
    }
}
