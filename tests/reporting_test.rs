mod common;

use common::{days_ago, TestApp};
use sea_orm::ConnectionTrait;
use tank_ledger::{
    entities::{MovementType, TankStatus},
    services::reports::{EngineerOutCount, NO_ENGINEER_LABEL},
};

fn row(engineer: &str, count: u64) -> EngineerOutCount {
    EngineerOutCount {
        responsible_engineer: engineer.to_string(),
        count,
    }
}

#[tokio::test]
async fn out_tanks_grouped_by_engineer() {
    let app = TestApp::new().await;
    app.seed(&["T1", "T2", "T3", "T4"]).await;

    app.dispatch("T1", days_ago(5), "Jane", "00001").await;
    app.dispatch("T2", days_ago(4), "Jane", "00002").await;
    app.dispatch("T3", days_ago(3), "Bob", "00003").await;

    let summary = app
        .services
        .reports
        .summary_current_out_by_engineer()
        .await
        .expect("summary");

    assert_eq!(summary, vec![row("Jane", 2), row("Bob", 1)]);
}

#[tokio::test]
async fn returned_tanks_leave_the_summary() {
    let app = TestApp::new().await;
    app.seed(&["T1", "T2"]).await;

    app.dispatch("T1", days_ago(5), "Jane", "00001").await;
    app.dispatch("T2", days_ago(4), "Bob", "00002").await;
    app.receipt("T1", days_ago(2), "00003").await;

    let summary = app
        .services
        .reports
        .summary_current_out_by_engineer()
        .await
        .expect("summary");

    assert_eq!(summary, vec![row("Bob", 1)]);
}

#[tokio::test]
async fn latest_dispatch_decides_the_engineer() {
    let app = TestApp::new().await;
    app.seed(&["T1"]).await;

    app.dispatch("T1", days_ago(10), "Jane", "00001").await;
    app.receipt("T1", days_ago(8), "00002").await;
    app.dispatch("T1", days_ago(6), "Bob", "00003").await;

    let summary = app
        .services
        .reports
        .summary_current_out_by_engineer()
        .await
        .expect("summary");

    assert_eq!(summary, vec![row("Bob", 1)]);
}

#[tokio::test]
async fn empty_ledger_gives_empty_summary() {
    let app = TestApp::new().await;
    app.seed(&["T1"]).await;

    let summary = app
        .services
        .reports
        .summary_current_out_by_engineer()
        .await
        .expect("summary");

    assert!(summary.is_empty());
}

#[tokio::test]
async fn dispatch_without_engineer_uses_placeholder() {
    let app = TestApp::new().await;
    app.seed(&["T1"]).await;

    app.insert_raw_movement("T1", MovementType::Dispatch, days_ago(3), None)
        .await;
    app.force_tank_state("T1", TankStatus::Out, Some(days_ago(3)))
        .await;

    let summary = app
        .services
        .reports
        .summary_current_out_by_engineer()
        .await
        .expect("summary");

    assert_eq!(summary, vec![row(NO_ENGINEER_LABEL, 1)]);
}

#[tokio::test]
async fn inconsistent_out_tanks_are_skipped() {
    let app = TestApp::new().await;
    app.seed(&["T1", "T2", "T3"]).await;

    app.dispatch("T1", days_ago(4), "Jane", "00001").await;
    // Out with no history at all.
    app.force_tank_state("T2", TankStatus::Out, None).await;
    // Out although its latest movement is a receipt.
    app.insert_raw_movement("T3", MovementType::Receipt, days_ago(2), Some("Bob"))
        .await;
    app.force_tank_state("T3", TankStatus::Out, Some(days_ago(2)))
        .await;

    let summary = app
        .services
        .reports
        .summary_current_out_by_engineer()
        .await
        .expect("summary");

    assert_eq!(summary, vec![row("Jane", 1)]);
}

#[tokio::test]
async fn movement_counts_include_idle_tanks() {
    let app = TestApp::new().await;
    app.seed(&["T1", "T2", "T3"]).await;

    app.dispatch("T1", days_ago(6), "Jane", "00001").await;
    app.receipt("T1", days_ago(5), "00002").await;
    app.dispatch("T1", days_ago(4), "Jane", "00003").await;
    app.dispatch("T2", days_ago(3), "Bob", "00004").await;

    let counts = app
        .services
        .reports
        .movement_counts_by_tank()
        .await
        .expect("counts");

    let summary: Vec<(&str, TankStatus, u64, u64, u64)> = counts
        .iter()
        .map(|c| {
            (
                c.serial.as_str(),
                c.status,
                c.dispatches,
                c.receipts,
                c.total,
            )
        })
        .collect();

    assert_eq!(
        summary,
        vec![
            ("T1", TankStatus::Out, 2, 1, 3),
            ("T2", TankStatus::Out, 1, 0, 1),
            ("T3", TankStatus::In, 0, 0, 0),
        ]
    );
}

#[tokio::test]
async fn summary_scales_past_the_sqlite_variable_limit() {
    let app = TestApp::new().await;
    app.db
        .execute_unprepared(
            "INSERT INTO tanks (serial, status, last_movement_date) \
             WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 33000) \
             SELECT printf('B%05d', i), 'out', '2024-05-01' FROM n",
        )
        .await
        .expect("bulk tanks");
    app.db
        .execute_unprepared(
            "INSERT INTO movements (serial, movement_type, movement_date, project, \
             responsible_engineer, responsible_contractor, smt_number, created_at, updated_at) \
             SELECT serial, 'dispatch', '2024-05-01', 'Atlas', 'Jane', 'ACME', '00001', \
             '2024-05-01T00:00:00+00:00', '2024-05-01T00:00:00+00:00' FROM tanks",
        )
        .await
        .expect("bulk movements");

    let summary = app
        .services
        .reports
        .summary_current_out_by_engineer()
        .await
        .expect("summary");

    assert_eq!(summary, vec![row("Jane", 33_000)]);
}
