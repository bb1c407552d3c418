use chrono::{Duration, TimeZone, Utc};
use orderdesk_types::{
    ActionType, ConversationRecord, ExecutedFunction, Role, TranscriptMessage,
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    delete_conversation, get_conversation, list_conversations, save_conversation, HistoryError,
};

fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .expect("should enable foreign keys");
    orderdesk_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn record(id: &str, minutes_after: i64) -> ConversationRecord {
    let start = Utc
        .with_ymd_and_hms(2025, 3, 1, 10, 0, 0)
        .single()
        .expect("valid timestamp")
        + Duration::minutes(minutes_after);
    ConversationRecord {
        conversation_id: id.to_string(),
        timestamp: start,
        end_time: Some(start + Duration::seconds(90)),
        action_types: vec![ActionType::Check, ActionType::Cancel],
        user_id: Some("67890".parse().expect("valid user id")),
        order_id: Some("01135".parse().expect("valid order id")),
        summary: Some("注文01135を確認しました".to_string()),
        conversation_history: vec![
            TranscriptMessage {
                role: Role::System,
                content: "system prompt".to_string(),
                timestamp: start,
            },
            TranscriptMessage {
                role: Role::Assistant,
                content: "こんにちは".to_string(),
                timestamp: start + Duration::seconds(1),
            },
            TranscriptMessage {
                role: Role::User,
                content: "注文をキャンセルしたい".to_string(),
                timestamp: start + Duration::seconds(5),
            },
        ],
        executed_functions: vec![
            ExecutedFunction {
                function: "check_order_details".to_string(),
                arguments: json!({"user_id": "67890", "order_id": "01135"}),
                timestamp: start + Duration::seconds(10),
            },
            ExecutedFunction {
                function: "cancel_order".to_string(),
                arguments: json!({"user_id": "67890", "order_id": "01135"}),
                timestamp: start + Duration::seconds(20),
            },
        ],
    }
}

#[test]
fn save_and_get_preserves_order_and_ids() {
    let mut conn = test_db();
    let rec = record("conv-1", 0);
    save_conversation(&mut conn, &rec).expect("save should succeed");

    let detail = get_conversation(&conn, "conv-1").expect("should load");
    assert_eq!(detail.summary.id, "conv-1");
    assert_eq!(detail.summary.timestamp, rec.timestamp);
    assert_eq!(detail.summary.end_time, rec.end_time);
    assert_eq!(
        detail.summary.action_types,
        vec![ActionType::Check, ActionType::Cancel]
    );
    assert_eq!(detail.summary.user_id.as_deref(), Some("67890"));
    assert_eq!(detail.summary.order_id.as_deref(), Some("01135"));
    assert_eq!(detail.summary.summary, rec.summary);

    let functions: Vec<_> = detail
        .executed_functions
        .iter()
        .map(|f| f.function.as_str())
        .collect();
    assert_eq!(functions, vec!["check_order_details", "cancel_order"]);
    assert_eq!(detail.executed_functions[1].arguments["order_id"], "01135");
    assert_eq!(detail.executed_functions[1].timestamp, rec.executed_functions[1].timestamp);
}

#[test]
fn system_messages_are_not_persisted() {
    let mut conn = test_db();
    save_conversation(&mut conn, &record("conv-1", 0)).expect("save should succeed");

    let detail = get_conversation(&conn, "conv-1").expect("should load");
    let roles: Vec<_> = detail
        .conversation_history
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(roles, vec![Role::Assistant, Role::User]);
    assert_eq!(detail.conversation_history[1].content, "注文をキャンセルしたい");
}

#[test]
fn list_is_newest_first() {
    let mut conn = test_db();
    save_conversation(&mut conn, &record("early", 0)).expect("save should succeed");
    save_conversation(&mut conn, &record("late", 30)).expect("save should succeed");
    save_conversation(&mut conn, &record("middle", 10)).expect("save should succeed");

    let ids: Vec<_> = list_conversations(&conn)
        .expect("list should succeed")
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec!["late", "middle", "early"]);
}

#[test]
fn list_on_empty_db_is_empty() {
    let conn = test_db();
    assert!(list_conversations(&conn)
        .expect("list should succeed")
        .is_empty());
}

#[test]
fn minimal_record_round_trips_with_empty_children() {
    let mut conn = test_db();
    let mut rec = record("bare", 0);
    rec.end_time = None;
    rec.action_types.clear();
    rec.user_id = None;
    rec.order_id = None;
    rec.summary = None;
    rec.conversation_history.clear();
    rec.executed_functions.clear();
    save_conversation(&mut conn, &rec).expect("save should succeed");

    let detail = get_conversation(&conn, "bare").expect("should load");
    assert!(detail.summary.end_time.is_none());
    assert!(detail.summary.action_types.is_empty());
    assert!(detail.summary.user_id.is_none());
    assert!(detail.conversation_history.is_empty());
    assert!(detail.executed_functions.is_empty());
}

#[test]
fn duplicate_id_is_a_conflict_and_leaves_original() {
    let mut conn = test_db();
    save_conversation(&mut conn, &record("conv-1", 0)).expect("save should succeed");

    let mut again = record("conv-1", 5);
    again.summary = Some("別の要約".to_string());
    let err = save_conversation(&mut conn, &again).expect_err("duplicate should fail");
    assert!(matches!(err, HistoryError::Conflict(ref id) if id == "conv-1"));

    let detail = get_conversation(&conn, "conv-1").expect("should load");
    assert_eq!(detail.summary.summary.as_deref(), Some("注文01135を確認しました"));
    assert_eq!(detail.executed_functions.len(), 2);
}

#[test]
fn get_unknown_is_not_found() {
    let conn = test_db();
    let err = get_conversation(&conn, "missing").expect_err("should fail");
    assert!(matches!(err, HistoryError::NotFound(ref id) if id == "missing"));
}

#[test]
fn delete_removes_conversation_and_children() {
    let mut conn = test_db();
    save_conversation(&mut conn, &record("conv-1", 0)).expect("save should succeed");
    save_conversation(&mut conn, &record("conv-2", 1)).expect("save should succeed");

    delete_conversation(&conn, "conv-1").expect("delete should succeed");

    assert!(matches!(
        get_conversation(&conn, "conv-1"),
        Err(HistoryError::NotFound(_))
    ));
    let orphans: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM messages WHERE conversation_id = 'conv-1')
                  + (SELECT COUNT(*) FROM action_types WHERE conversation_id = 'conv-1')
                  + (SELECT COUNT(*) FROM executed_functions WHERE conversation_id = 'conv-1')",
            [],
            |row| row.get(0),
        )
        .expect("should count");
    assert_eq!(orphans, 0);
    assert_eq!(
        get_conversation(&conn, "conv-2")
            .expect("other conversation should remain")
            .conversation_history
            .len(),
        2
    );

    let err = delete_conversation(&conn, "conv-1").expect_err("second delete should fail");
    assert!(matches!(err, HistoryError::NotFound(_)));
}

#[test]
fn random_ids_do_not_collide() {
    let mut conn = test_db();
    for minutes in 0..5 {
        let id = uuid::Uuid::new_v4().to_string();
        save_conversation(&mut conn, &record(&id, minutes)).expect("save should succeed");
    }
    assert_eq!(list_conversations(&conn).expect("list should succeed").len(), 5);
}

#[test]
fn corrupt_timestamp_is_reported() {
    let conn = test_db();
    conn.execute(
        "INSERT INTO conversations (id, timestamp) VALUES ('bad', 'yesterday')",
        [],
    )
    .expect("raw insert should succeed");

    let err = get_conversation(&conn, "bad").expect_err("should fail to parse");
    assert!(matches!(err, HistoryError::Corrupt(_)));
}
